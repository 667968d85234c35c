//! Complaint lifecycle types

use serde::{Deserialize, Serialize};

/// Status of a consumer complaint.
///
/// `Escalated` marks the level bump to manager visibility; the complaint
/// can still progress to `Resolved` afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Open,
    InProgress,
    Resolved,
    Escalated,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }
}

/// Visibility tier of a complaint.
///
/// Every complaint starts at `Sales`; a sales rep may escalate it to
/// `Manager` exactly once. Owners see both tiers, so no owner tier is
/// modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ComplaintLevel {
    Sales,
    Manager,
}

impl ComplaintLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Manager => "manager",
        }
    }
}

impl std::fmt::Display for ComplaintLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_is_monotonic() {
        assert!(ComplaintLevel::Sales < ComplaintLevel::Manager);
    }

    #[test]
    fn status_strings() {
        assert_eq!(ComplaintStatus::InProgress.as_str(), "in_progress");
        assert_eq!(ComplaintStatus::Escalated.as_str(), "escalated");
    }
}
