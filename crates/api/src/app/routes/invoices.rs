use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use finops_core::InvoiceId;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(ingest_invoice))
        .route("/:id", get(get_invoice))
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListInvoicesQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.invoices.list(&filter) {
        Ok(list) => (StatusCode::OK, Json(dto::invoice_list_to_json(list))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Ingest an already-structured invoice; its obligation is created with it.
pub async fn ingest_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::IngestInvoiceRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let input = match body.into_new_invoice() {
        Ok(i) => i,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.invoices.ingest(input) {
        Ok(detail) => (
            StatusCode::CREATED,
            Json(dto::invoice_to_json(&detail, services.today())),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    id: Result<Path<String>, PathRejection>,
) -> axum::response::Response {
    let Path(raw) = match id {
        Ok(p) => p,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let id: InvoiceId = match raw.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.invoices.get(id) {
        Ok(detail) => (StatusCode::OK, Json(dto::invoice_to_json(&detail, services.today()))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
