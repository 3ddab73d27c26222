//! The per-match action log: the system of record.
//!
//! Append-mostly. Records are never removed or renumbered; undo only sets the
//! voided flag on the most recent live record.

use crate::action::ScoringAction;
use crate::error::ScoringError;
use crate::ids::{ActionId, MatchId};
use serde::{Deserialize, Serialize};

/// What `void_last` undid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoidedAction {
    /// The record as it is now (with `is_voided` set).
    pub action: ScoringAction,
    /// Runs the record had contributed to the team total.
    pub undone_runs: u32,
}

/// Ordered log of every delivery recorded for one match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    match_id: MatchId,
    actions: Vec<ScoringAction>,
}

impl ActionLog {
    /// An empty log for `match_id`.
    #[must_use]
    pub const fn new(match_id: MatchId) -> Self {
        Self {
            match_id,
            actions: Vec::new(),
        }
    }

    /// Rebuild a log from stored records, validating the sequencing invariant.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidSequencing`] if the records are not numbered
    /// 1, 2, 3, ... in order.
    pub fn from_records(
        match_id: MatchId,
        records: Vec<ScoringAction>,
    ) -> Result<Self, ScoringError> {
        let mut log = Self::new(match_id);
        for record in records {
            log.append(record)?;
        }
        Ok(log)
    }

    /// Match this log belongs to.
    #[must_use]
    pub const fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    /// Highest sequence number ever appended (voided records included).
    #[must_use]
    pub fn max_sequence(&self) -> u64 {
        self.actions.last().map_or(0, |action| action.sequence_number)
    }

    /// Sequence number the next append must carry.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.max_sequence() + 1
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidSequencing`] unless `action.sequence_number` is
    /// exactly one greater than the current maximum for the match.
    /// [`ScoringError::PreconditionFailed`] if the record belongs to another match.
    pub fn append(&mut self, action: ScoringAction) -> Result<ActionId, ScoringError> {
        if action.match_id != self.match_id {
            return Err(ScoringError::precondition(format!(
                "action for match {} appended to log of match {}",
                action.match_id, self.match_id
            )));
        }
        let expected = self.next_sequence();
        if action.sequence_number != expected {
            return Err(ScoringError::InvalidSequencing {
                expected,
                actual: action.sequence_number,
            });
        }
        let id = action.id;
        self.actions.push(action);
        Ok(id)
    }

    /// Non-voided records in sequence order, optionally restricted to one innings.
    pub fn list_non_voided(&self, innings: Option<u8>) -> impl Iterator<Item = &ScoringAction> {
        self.actions.iter().filter(move |action| {
            !action.is_voided && innings.is_none_or(|number| action.innings_number == number)
        })
    }

    /// The most recent non-voided record.
    #[must_use]
    pub fn last_non_voided(&self) -> Option<&ScoringAction> {
        self.actions.iter().rev().find(|action| !action.is_voided)
    }

    /// Void the most recent non-voided record.
    ///
    /// # Errors
    ///
    /// [`ScoringError::NoActionsToUndo`] if every record is already voided.
    pub fn void_last(&mut self, reason: &str) -> Result<VoidedAction, ScoringError> {
        let Some(action) = self.actions.iter_mut().rev().find(|action| !action.is_voided) else {
            return Err(ScoringError::NoActionsToUndo {
                match_id: self.match_id.clone(),
            });
        };
        action.void(reason);
        Ok(VoidedAction {
            undone_runs: action.computed_total(),
            action: action.clone(),
        })
    }

    /// Every record, voided ones included.
    #[must_use]
    pub fn records(&self) -> &[ScoringAction] {
        &self.actions
    }

    /// Number of records, voided ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::action::{ActionSource, Extras};
    use crate::ids::PlayerId;
    use chrono::Utc;

    fn record(sequence_number: u64, runs: u32) -> ScoringAction {
        let now = Utc::now();
        ScoringAction {
            id: ActionId::new(),
            match_id: MatchId::new("m1"),
            innings_number: 1,
            over_number: 0,
            ball_in_over: 1,
            sequence_number,
            striker_id: PlayerId::new("s"),
            non_striker_id: Some(PlayerId::new("n")),
            bowler_id: PlayerId::new("b"),
            bowling_angle: None,
            runs_off_bat: runs,
            extras: Extras::none(),
            total_runs: runs,
            is_legal_delivery: true,
            wicket: None,
            shot: None,
            is_voided: false,
            void_reason: None,
            timestamp: now,
            source: ActionSource::Live,
            created_at: now,
        }
    }

    #[test]
    fn append_requires_next_sequence() {
        let mut log = ActionLog::new(MatchId::new("m1"));
        log.append(record(1, 0)).unwrap();
        let err = log.append(record(3, 0)).unwrap_err();
        assert_eq!(
            err,
            ScoringError::InvalidSequencing {
                expected: 2,
                actual: 3
            }
        );
        let err = log.append(record(1, 0)).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn append_rejects_foreign_match() {
        let mut log = ActionLog::new(MatchId::new("other"));
        assert!(matches!(
            log.append(record(1, 0)),
            Err(ScoringError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn void_last_targets_most_recent_live_record() {
        let mut log = ActionLog::new(MatchId::new("m1"));
        log.append(record(1, 1)).unwrap();
        log.append(record(2, 4)).unwrap();

        let voided = log.void_last("wrong batter").unwrap();
        assert_eq!(voided.action.sequence_number, 2);
        assert_eq!(voided.undone_runs, 4);

        let voided = log.void_last("again").unwrap();
        assert_eq!(voided.action.sequence_number, 1);

        assert_eq!(
            log.void_last("nothing left"),
            Err(ScoringError::NoActionsToUndo {
                match_id: MatchId::new("m1")
            })
        );
        assert_eq!(log.match_id(), &MatchId::new("m1"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.list_non_voided(None).count(), 0);
    }

    #[test]
    fn undo_does_not_renumber() {
        let mut log = ActionLog::new(MatchId::new("m1"));
        log.append(record(1, 0)).unwrap();
        log.void_last("oops").unwrap();
        assert_eq!(log.next_sequence(), 2);
        log.append(record(2, 0)).unwrap();
        let live: Vec<u64> = log.list_non_voided(Some(1)).map(|a| a.sequence_number).collect();
        assert_eq!(live, vec![2]);
    }
}
