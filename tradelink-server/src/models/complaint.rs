//! Complaint field validation

use super::ValidationError;

/// Maximum length for a complaint title.
const MAX_TITLE_LEN: usize = 256;

/// Validated complaint title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintTitle(String);

impl ComplaintTitle {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }
        if trimmed.len() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong { field: "title", max: MAX_TITLE_LEN });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ComplaintTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts() {
        let title = ComplaintTitle::new("  Late delivery ").unwrap();
        assert_eq!(title.as_str(), "Late delivery");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            ComplaintTitle::new("   "),
            Err(ValidationError::Empty { field: "title" })
        ));
    }

    #[test]
    fn rejects_oversized() {
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            ComplaintTitle::new(&long),
            Err(ValidationError::TooLong { max: MAX_TITLE_LEN, .. })
        ));
    }
}
