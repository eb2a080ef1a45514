use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use finops_core::{ExpectedVersion, ObligationId};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_obligations).post(create_obligation))
        .route("/overdue", get(list_overdue))
        .route("/summary", get(summary))
        .route("/categories", get(list_categories))
        .route("/:id", get(get_obligation))
        .route("/:id/payments", post(register_payment))
        .route("/:id/cancel", post(cancel_obligation))
}

pub async fn list_obligations(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListObligationsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.payables.list(&filter) {
        Ok(list) => (StatusCode::OK, Json(dto::obligation_list_to_json(list))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_overdue(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.payables.overdue() {
        Ok(list) => (StatusCode::OK, Json(dto::obligation_list_to_json(list))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn summary(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.payables.summary() {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_categories() -> axum::response::Response {
    (StatusCode::OK, Json(dto::categories_to_json())).into_response()
}

pub async fn create_obligation(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateObligationRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let input = match body.into_new_obligation() {
        Ok(i) => i,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.payables.create(input) {
        Ok(ob) => (
            StatusCode::CREATED,
            Json(dto::obligation_to_json(&ob, services.today())),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_obligation(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.payables.get(id) {
        Ok(ob) => (StatusCode::OK, Json(dto::obligation_to_json(&ob, services.today()))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn register_payment(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<dto::RegisterPaymentRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let today = services.today();
    let command = match body.into_command(id, today) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let payment = match services.payables.register_payment(command) {
        Ok(p) => p,
        Err(e) => return errors::service_error_to_response(e),
    };
    match services.payables.get(id) {
        Ok(ob) => (
            StatusCode::CREATED,
            Json(json!({
                "payment": payment,
                "obligation": dto::obligation_to_json(&ob, today),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_obligation(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<String>, PathRejection>,
    body: Option<Json<dto::CancelObligationRequest>>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match services.payables.cancel(
        id,
        body.reason,
        ExpectedVersion::from(body.expected_version),
    ) {
        Ok(ob) => (StatusCode::OK, Json(dto::obligation_to_json(&ob, services.today()))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_id(
    id: Result<Path<String>, PathRejection>,
) -> Result<ObligationId, axum::response::Response> {
    let Path(raw) = id.map_err(errors::rejection_to_response)?;
    raw.parse().map_err(errors::domain_error_to_response)
}
