//! Error types for the application

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not a member: {0}")]
    NotAMember(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not a descendant: {0}")]
    NotADescendant(String),

    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    #[error("Forbidden transition: {0}")]
    ForbiddenTransition(String),

    #[error("Extension already pending: {0}")]
    ExtensionAlreadyPending(String),

    #[error("Already reviewed: {0}")]
    AlreadyReviewed(String),

    #[error("Template set not found: {0}")]
    TemplateSetNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, paired with the human-readable reason
    /// in HTTP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::NotAMember(_) => "not_a_member",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotADescendant(_) => "not_a_descendant",
            AppError::CycleDetected(_) => "cycle_detected",
            AppError::ForbiddenTransition(_) => "forbidden_transition",
            AppError::ExtensionAlreadyPending(_) => "extension_already_pending",
            AppError::AlreadyReviewed(_) => "already_reviewed",
            AppError::TemplateSetNotFound(_) => "template_set_not_found",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::CycleDetected(e) => {
                // Persisted corruption upstream; the engine cannot self-heal
                // this, so it gets its own loud log line.
                tracing::error!("Workspace hierarchy corruption: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotAMember(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotADescendant(_)
            | AppError::InvalidAmount(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ForbiddenTransition(_)
            | AppError::ExtensionAlreadyPending(_)
            | AppError::AlreadyReviewed(_) => StatusCode::CONFLICT,
            AppError::TemplateSetNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.kind(),
            "reason": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotAMember("user has no role in workspace".to_string());
        assert_eq!(
            format!("{}", err),
            "Not a member: user has no role in workspace"
        );

        let err = AppError::Forbidden("role lacks assign_tasks".to_string());
        assert_eq!(format!("{}", err), "Forbidden: role lacks assign_tasks");

        let err = AppError::AlreadyReviewed("request decided".to_string());
        assert_eq!(format!("{}", err), "Already reviewed: request decided");

        let err = AppError::InvalidAmount("amount must be positive".to_string());
        assert_eq!(format!("{}", err), "Invalid amount: amount must be positive");
    }

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(AppError::NotAMember(String::new()).kind(), "not_a_member");
        assert_eq!(AppError::Forbidden(String::new()).kind(), "forbidden");
        assert_eq!(
            AppError::NotADescendant(String::new()).kind(),
            "not_a_descendant"
        );
        assert_eq!(AppError::CycleDetected(String::new()).kind(), "cycle_detected");
        assert_eq!(
            AppError::ForbiddenTransition(String::new()).kind(),
            "forbidden_transition"
        );
        assert_eq!(
            AppError::ExtensionAlreadyPending(String::new()).kind(),
            "extension_already_pending"
        );
        assert_eq!(
            AppError::AlreadyReviewed(String::new()).kind(),
            "already_reviewed"
        );
        assert_eq!(
            AppError::TemplateSetNotFound(String::new()).kind(),
            "template_set_not_found"
        );
        assert_eq!(AppError::InvalidAmount(String::new()).kind(), "invalid_amount");
    }

    #[test]
    fn test_authorization_failures_map_to_403() {
        let response = AppError::NotAMember("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AppError::Forbidden("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_guard_failures_map_to_409() {
        let response = AppError::ForbiddenTransition("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::AlreadyReviewed("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::ExtensionAlreadyPending("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_into_response() {
        let response = AppError::TemplateSetNotFound("conference".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::NotFound("workspace".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cycle_detected_is_server_fault() {
        let response = AppError::CycleDetected("w1 -> w2 -> w1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_database_error_from_sqlx() {
        let sqlx_err = sqlx::Error::Configuration("test".into());
        let app_err: AppError = sqlx_err.into();
        assert!(matches!(app_err, AppError::Database(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn test_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(test_fn().unwrap(), 42);
    }
}
