//! Error taxonomy for the scoring engine.
//!
//! Every engine operation returns these as typed results. A vacant striker or
//! bowler slot is not an error in itself; it only becomes
//! [`ScoringError::PreconditionFailed`] when a ball is recorded against it.

use crate::ids::MatchId;
use crate::state_machine::MatchStatus;
use crate::store::StoreError;
use thiserror::Error;

/// Errors returned by scoring operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    /// A command's preconditions do not hold (missing striker/bowler, wrong status, ...).
    #[error("Precondition failed: {reason}")]
    PreconditionFailed {
        /// Human-readable explanation, suitable for a corrective prompt.
        reason: String,
    },

    /// The requested state-machine edge does not exist from the current state.
    #[error("Invalid state transition: cannot {action} while match is {from}")]
    InvalidStateTransition {
        /// Status the match was in when the command arrived.
        from: MatchStatus,
        /// The attempted transition.
        action: &'static str,
    },

    /// An append raced with another writer or used a stale sequence number.
    #[error("Invalid sequencing: expected sequence {expected}, got {actual}")]
    InvalidSequencing {
        /// The sequence number (or store version) the log expected.
        expected: u64,
        /// The sequence number (or store version) that was supplied.
        actual: u64,
    },

    /// Undo was requested but the match has no non-voided actions.
    #[error("No actions to undo for match {match_id}")]
    NoActionsToUndo {
        /// The match that was targeted.
        match_id: MatchId,
    },

    /// A single delivery was marked as both a wide and a no-ball.
    #[error("A delivery cannot be both a wide and a no-ball")]
    AmbiguousExtras,

    /// No match record exists for the identifier.
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// A match with this identifier already exists.
    #[error("Match already exists: {0}")]
    MatchAlreadyExists(MatchId),

    /// The durable store failed for a reason other than a version conflict.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ScoringError {
    /// Shorthand for [`ScoringError::PreconditionFailed`].
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            reason: reason.into(),
        }
    }

    /// True when the caller may re-read the latest state and reissue the command.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::InvalidSequencing { .. })
    }

    /// Stable label used for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::InvalidSequencing { .. } => "invalid_sequencing",
            Self::NoActionsToUndo { .. } => "no_actions_to_undo",
            Self::AmbiguousExtras => "ambiguous_extras",
            Self::MatchNotFound(_) => "match_not_found",
            Self::MatchAlreadyExists(_) => "match_already_exists",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for ScoringError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { expected, actual, .. } => {
                Self::InvalidSequencing { expected, actual }
            },
            StoreError::NotFound(id) => Self::MatchNotFound(id),
            StoreError::AlreadyExists(id) => Self::MatchAlreadyExists(id),
            other => Self::Store(other),
        }
    }
}

/// Result alias for scoring operations.
pub type Result<T> = std::result::Result<T, ScoringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_maps_to_invalid_sequencing() {
        let err: ScoringError = StoreError::VersionConflict {
            match_id: MatchId::new("m1"),
            expected: 4,
            actual: 5,
        }
        .into();
        assert_eq!(
            err,
            ScoringError::InvalidSequencing {
                expected: 4,
                actual: 5
            }
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn transition_error_display_names_status() {
        let err = ScoringError::InvalidStateTransition {
            from: MatchStatus::Scheduled,
            action: "end innings",
        };
        let display = err.to_string();
        assert!(display.contains("end innings"));
        assert!(display.contains("scheduled"));
    }
}
