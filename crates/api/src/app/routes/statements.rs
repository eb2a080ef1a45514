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

use finops_accounting::NewJournalEntry;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/comparative", get(comparative))
        .route("/sync", post(synchronize))
        .route("/accounts", get(list_accounts))
        .route("/entries", post(post_entry))
        .route("/:year/:month", get(monthly_statement))
        .route("/:year/:month/balances", get(account_balances))
}

pub async fn monthly_statement(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<(i32, u32)>, PathRejection>,
) -> axum::response::Response {
    let Path((year, month)) = match path {
        Ok(p) => p,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.statements.generate(year, month) {
        Ok(statement) => (StatusCode::OK, Json(statement)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Chart of accounts as a tree with the month's balances rolled up.
pub async fn account_balances(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<(i32, u32)>, PathRejection>,
) -> axum::response::Response {
    let Path((year, month)) = match path {
        Ok(p) => p,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.statements.balances(year, month) {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn comparative(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ComparativeQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.statements.comparative(query.year) {
        Ok(months) => (
            StatusCode::OK,
            Json(json!({ "year": query.year, "months": months })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn synchronize(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SyncRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.statements.synchronize(body.year, body.month) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.statements.accounts() {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_entry(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewJournalEntry>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.statements.post_entry(body) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
