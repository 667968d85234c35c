//! Link status state machine

use serde::{Deserialize, Serialize};

/// Status of a supplier-consumer link.
///
/// A link is created `Pending` and is answered by supplier staff. Only an
/// `Accepted` link carries orders, messages, and complaints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LinkStatus {
    Pending,
    Accepted,
    Removed,
    Blocked,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Removed => "removed",
            Self::Blocked => "blocked",
        }
    }

    /// Whether supplier staff may move a link from `self` to `to`.
    ///
    /// Allowed: Pending -> Accepted, Pending -> Removed (reject),
    /// Accepted -> Removed, and any non-Blocked state -> Blocked.
    pub fn can_transition(self, to: LinkStatus) -> bool {
        use LinkStatus::*;
        match (self, to) {
            (Pending, Accepted) | (Pending, Removed) | (Accepted, Removed) => true,
            (from, Blocked) => from != Blocked,
            _ => false,
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::LinkStatus::*;

    #[test]
    fn pending_can_be_answered() {
        assert!(Pending.can_transition(Accepted));
        assert!(Pending.can_transition(Removed));
        assert!(Pending.can_transition(Blocked));
    }

    #[test]
    fn accepted_can_be_removed_or_blocked() {
        assert!(Accepted.can_transition(Removed));
        assert!(Accepted.can_transition(Blocked));
        assert!(!Accepted.can_transition(Pending));
    }

    #[test]
    fn removed_can_only_be_blocked() {
        assert!(Removed.can_transition(Blocked));
        assert!(!Removed.can_transition(Accepted));
        assert!(!Removed.can_transition(Pending));
    }

    #[test]
    fn blocked_is_terminal() {
        assert!(!Blocked.can_transition(Pending));
        assert!(!Blocked.can_transition(Accepted));
        assert!(!Blocked.can_transition(Removed));
        assert!(!Blocked.can_transition(Blocked));
    }
}
