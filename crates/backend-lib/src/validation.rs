// ============================
// crates/backend-lib/src/validation.rs
// ============================
//! Input shape validation.
use regex::Regex;
use std::sync::LazyLock;

use crate::error::AppError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MIN_REGISTRATION_ID_LENGTH: usize = 3;
const MAX_REGISTRATION_ID_LENGTH: usize = 64;
const MAX_QUESTION_LENGTH: usize = 2000;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static REGISTRATION_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

/// Validate an attendee email address
pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }
    Ok(())
}

/// Validate a registration code's shape
pub fn validate_registration_id(registration_id: &str) -> Result<(), AppError> {
    let len = registration_id.len();
    if !(MIN_REGISTRATION_ID_LENGTH..=MAX_REGISTRATION_ID_LENGTH).contains(&len) {
        return Err(AppError::InvalidInput(
            "Invalid registration code".to_string(),
        ));
    }
    if !REGISTRATION_ID_REGEX.is_match(registration_id) {
        return Err(AppError::InvalidInput(
            "Invalid registration code".to_string(),
        ));
    }
    Ok(())
}

/// Validate question text: non-blank, bounded
pub fn validate_question_text(text: &str) -> Result<(), AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Question is empty".to_string()));
    }
    if trimmed.len() > MAX_QUESTION_LENGTH {
        return Err(AppError::InvalidInput("Question is too long".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada.lovelace+qa@sub.example.co").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["", "not-an-email", "a@b", "@example.com", "ada@"] {
            assert!(validate_email(bad).is_err(), "accepted: {bad}");
        }
        let oversized = format!("{}@example.com", "a".repeat(260));
        assert!(validate_email(&oversized).is_err());
    }

    #[test]
    fn registration_id_shape() {
        assert!(validate_registration_id("REG-001").is_ok());
        assert!(validate_registration_id("ab").is_err());
        assert!(validate_registration_id("has spaces").is_err());
        assert!(validate_registration_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn question_text_bounds() {
        assert!(validate_question_text("What is the keynote time?").is_ok());
        assert!(validate_question_text("   ").is_err());
        assert!(validate_question_text(&"q".repeat(2001)).is_err());
    }
}
