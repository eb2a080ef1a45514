use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use finops_matching::ExtractedReceipt;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/receipts", post(match_receipt))
        .route("/confirm", post(confirm_match))
        .route("/history", get(history))
}

/// Rank pending obligations against extracted receipt fields.
pub async fn match_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ExtractedReceipt>, JsonRejection>,
) -> axum::response::Response {
    let Json(receipt) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.reconciliation.match_receipt(&receipt) {
        Ok(candidates) => {
            let today = services.today();
            let items = candidates
                .iter()
                .map(|c| dto::candidate_to_json(c, today))
                .collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(json!({
                    "confirm_threshold": services.reconciliation.engine().config().confirm_threshold,
                    "items": items,
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn confirm_match(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ConfirmMatchRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let request = match body.into_confirm() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.reconciliation.confirm(request) {
        Ok(confirmed) => (
            StatusCode::CREATED,
            Json(dto::confirmed_match_to_json(confirmed, services.today())),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Recently confirmed receipts, newest first.
pub async fn history(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::HistoryQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.reconciliation.history(query.limit()) {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
