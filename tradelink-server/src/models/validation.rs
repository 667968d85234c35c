//! Validation error types

use std::fmt;

/// Maximum length for free-form text fields (64KB).
const MAX_TEXT_LEN: usize = 65536;

/// Validation error for request models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Value doesn't satisfy a structural rule
    InvalidFormat { field: &'static str, reason: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a required free-form text field (description, resolution).
pub fn non_empty_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong { field, max: MAX_TEXT_LEN });
    }
    Ok(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong { field: "title", max: 256 };
        assert_eq!(
            err.to_string(),
            "title exceeds maximum length of 256 characters"
        );
    }

    #[test]
    fn rejects_blank_text() {
        assert!(non_empty_text("description", "   ").is_err());
        assert!(non_empty_text("description", "late delivery").is_ok());
    }

    #[test]
    fn rejects_oversized_text() {
        let big = "a".repeat(MAX_TEXT_LEN + 1);
        let err = non_empty_text("description", &big).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { .. }));
    }
}
