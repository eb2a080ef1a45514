//! Service error: the one error type every application service returns.

use thiserror::Error;

use finops_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed or missing input; names the offending field.
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Input was well-formed but breaks a domain invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Already paid, already cancelled, stale version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store or another collaborator failed. Never retried here.
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation { field, message } => ServiceError::Validation { field, message },
            DomainError::InvalidId(msg) => ServiceError::validation("id", msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Collaborator(msg) => ServiceError::Collaborator(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => ServiceError::Collaborator(msg),
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Domain(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_surface_as_collaborator_errors() {
        let err: ServiceError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(err, ServiceError::Collaborator("connection refused".into()));
    }

    #[test]
    fn domain_errors_keep_their_kind_through_the_store() {
        let err: ServiceError =
            StoreError::Domain(DomainError::conflict("obligation is already paid")).into();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err: ServiceError = DomainError::validation("due_day", "out of range").into();
        assert_eq!(err.field(), Some("due_day"));

        let err: ServiceError = DomainError::invalid_id("not a uuid").into();
        assert_eq!(err.field(), Some("id"));
    }
}
