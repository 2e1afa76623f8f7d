use mongodb::error::{ErrorKind, WriteFailure};
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", entity))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        ServiceError::InvalidState(msg.into())
    }

    /// Translate a write failure, turning duplicate keys into a conflict.
    pub fn from_write(err: mongodb::error::Error, what: &str) -> Self {
        if is_duplicate_key(&err) {
            ServiceError::Conflict(format!("{} already exists", what))
        } else {
            ServiceError::Database(err)
        }
    }
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(e.into()),
            ServiceError::Serialization(e) => AppError::InternalError(e.into()),
            ServiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ServiceError::Validation(msg)
            | ServiceError::InvalidReference(msg)
            | ServiceError::InvalidState(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::AccessDenied(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            ServiceError::Gateway(msg) => AppError::BadGateway(msg),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn service_errors_map_to_http_statuses() {
        let cases = [
            (ServiceError::not_found("Tenant"), StatusCode::NOT_FOUND),
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                ServiceError::InvalidReference("Building not found".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::invalid_state("nope"), StatusCode::BAD_REQUEST),
            (
                ServiceError::Conflict("Unit already exists".into()),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::AccessDenied("Access denied".into()),
                StatusCode::FORBIDDEN,
            ),
            (ServiceError::Gateway("down".into()), StatusCode::BAD_GATEWAY),
            (
                ServiceError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn not_found_message_names_entity() {
        assert_eq!(ServiceError::not_found("Invoice").to_string(), "Invoice not found");
    }
}
