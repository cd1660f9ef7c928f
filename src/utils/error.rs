use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use mongodb::bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// State conflicts such as "already approved" or "email in use"; answered with 400
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("{0}")]
    Stripe(String),

    #[error("Upload failed: {0}")]
    Cloudinary(String),

    #[error("Document generation failed: {0}")]
    Document(String),

    #[error("{0}")]
    Internal(String),
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Password hashing error: {}", e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Document(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Bson(_)
            | AppError::Stripe(_)
            | AppError::Cloudinary(_)
            | AppError::Document(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.to_string()
        }))
    }
}

/// Parses a hex ObjectId from a path or body, `kind` names it in the error
pub fn parse_object_id(id: &str, kind: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id.trim()).map_err(|_| AppError::Validation(format!("Invalid {} ID", kind)))
}

/// True when a write failed on a unique index (E11000)
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Stripe("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "project").unwrap(), id);

        let err = parse_object_id("not-an-id", "project").unwrap_err();
        assert_eq!(err.to_string(), "Invalid project ID");
    }
}
