//! Incident field validation

use super::ValidationError;

const MAX_TITLE_LEN: usize = 256;

/// Validated incident title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentTitle(String);

impl IncidentTitle {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(IncidentTitle::new("").is_err());
        assert!(IncidentTitle::new("cold chain broken").is_ok());
    }
}
