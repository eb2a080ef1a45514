use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use finops_core::DomainError;
use finops_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "field": field,
                "message": message,
            })),
        )
            .into_response(),
        ServiceError::NotFound { entity, id } => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{entity} not found: {id}"),
        ),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        ServiceError::Collaborator(msg) => {
            tracing::error!(error = %msg, "collaborator failure");
            json_error(StatusCode::BAD_GATEWAY, "collaborator_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    service_error_to_response(err.into())
}

/// Body, query or path extraction failure.
pub fn rejection_to_response(rejection: impl Display) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
