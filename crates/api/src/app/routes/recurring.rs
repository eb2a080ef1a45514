use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_rules).post(create_rule))
        .route("/materialize", post(materialize))
}

pub async fn list_rules(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.recurring.list() {
        Ok(rules) => {
            let items = rules
                .into_iter()
                .map(dto::scheduled_rule_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_rule(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateRecurringRuleRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let input = match body.into_new_rule(services.today()) {
        Ok(i) => i,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.recurring.create(input) {
        Ok(scheduled) => {
            (StatusCode::CREATED, Json(dto::scheduled_rule_to_json(scheduled))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Issue the obligations of every rule whose next cycle falls inside the lead window.
pub async fn materialize(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<Json<dto::MaterializeRequest>>,
) -> axum::response::Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match services.recurring.materialize_due(body.reference_date) {
        Ok(report) => (
            StatusCode::OK,
            Json(dto::materialize_report_to_json(report, services.today())),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
