// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eventdesk_common::{ModerationAction, QuestionStatus, Role};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    /// Identity check failed. Deliberately generic: it never says whether
    /// the email was unknown or the registration code mismatched.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No active Q/A session")]
    InactiveEvent,

    #[error("Action {action} by {role} is not permitted from status {status}")]
    InvalidTransition {
        status: QuestionStatus,
        action: ModerationAction,
        role: Role,
    },

    #[error("Question {question_id} changed since it was read; refresh and retry")]
    StaleState { question_id: eventdesk_common::QuestionId },

    #[error("Push channel unavailable")]
    ChannelUnavailable,

    #[error("Dedicated window could not be opened")]
    PopupBlocked,

    #[error("Question not found")]
    QuestionNotFound,

    #[error("Event not found")]
    EventNotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InactiveEvent
            | AppError::QuestionNotFound
            | AppError::EventNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StaleState { .. } => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::ChannelUnavailable | AppError::PopupBlocked => {
                StatusCode::SERVICE_UNAVAILABLE
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Forbidden => "AUTH_002",
            AppError::InactiveEvent => "GATE_001",
            AppError::InvalidTransition { .. } => "MOD_001",
            AppError::StaleState { .. } => "MOD_002",
            AppError::ChannelUnavailable => "PUSH_001",
            AppError::PopupBlocked => "WIN_001",
            AppError::QuestionNotFound => "NF_001",
            AppError::EventNotFound => "NF_002",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::RateLimitExceeded => "RATE_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use.
    ///
    /// Validation and transition errors surface verbatim (the acting user
    /// needs them); infrastructure errors are collapsed.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidCredentials
            | AppError::Forbidden
            | AppError::InactiveEvent
            | AppError::InvalidTransition { .. }
            | AppError::StaleState { .. }
            | AppError::QuestionNotFound
            | AppError::EventNotFound
            | AppError::InvalidInput(_)
            | AppError::RateLimitExceeded
            | AppError::ChannelUnavailable
            | AppError::PopupBlocked => self.to_string(),
            AppError::Io(_) | AppError::Json(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }

    /// Whether the failure degrades to a slower mode instead of reaching
    /// the acting user (poll fallback, inline rendering).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::ChannelUnavailable | AppError::PopupBlocked)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AppError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AppError::Internal("Failed to send message".to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use uuid::Uuid;

    #[test]
    fn test_app_error_display() {
        let invalid = AppError::InvalidCredentials;
        assert_eq!(invalid.to_string(), "Invalid credentials");

        let transition = AppError::InvalidTransition {
            status: QuestionStatus::Answered,
            action: ModerationAction::Approve,
            role: Role::Manager,
        };
        assert_eq!(
            transition.to_string(),
            "Action approve by manager is not permitted from status answered"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::InactiveEvent.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::StaleState { question_id: Uuid::new_v4() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidTransition {
                status: QuestionStatus::Pending,
                action: ModerationAction::Clear,
                role: Role::Presenter,
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(AppError::InvalidCredentials.error_code(), "AUTH_001");
        assert_eq!(AppError::InactiveEvent.error_code(), "GATE_001");
        assert_eq!(AppError::ChannelUnavailable.error_code(), "PUSH_001");
        assert_eq!(AppError::PopupBlocked.error_code(), "WIN_001");
        assert_eq!(
            AppError::Internal("test".to_string()).error_code(),
            "INT_001"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::ChannelUnavailable.is_recoverable());
        assert!(AppError::PopupBlocked.is_recoverable());
        assert!(!AppError::InvalidCredentials.is_recoverable());
        assert!(!AppError::StaleState { question_id: Uuid::new_v4() }.is_recoverable());
    }

    #[test]
    fn test_app_error_into_response() {
        let error = AppError::QuestionNotFound;
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response_headers = response.headers();
        assert!(response_headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
    }

    #[test]
    fn test_credential_errors_do_not_leak_cause() {
        // Email-not-found and code-mismatch must be indistinguishable.
        let err = AppError::InvalidCredentials;
        assert_eq!(err.sanitized_message(), "Invalid credentials");
        assert!(!err.sanitized_message().contains("email"));
        assert!(!err.sanitized_message().contains("code"));
    }
}
