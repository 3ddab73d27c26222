//! Offline replay of exported matches.
//!
//! A legacy importer exports each match as one JSON document:
//!
//! ```json
//! { "match": { ...MatchState... }, "actions": [ { ...ScoringAction... }, ... ] }
//! ```
//!
//! [`replay_document`] projects it once, the same way the live service
//! would after recording every ball. The `crease-replay` binary is a thin
//! wrapper around it.

use crease_core::state_machine::MatchState;
use crease_core::{LiveScoreProjection, ScoringAction, ScoringError, ScoringPolicy, Scorebook};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from replaying an exported match.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("Malformed match document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The records do not form a valid log for the match.
    #[error("Invalid match log: {0}")]
    Scoring(#[from] ScoringError),
}

/// An exported match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDocument {
    /// The match record.
    #[serde(rename = "match")]
    pub state: MatchState,
    /// Every delivery, voided ones included.
    pub actions: Vec<ScoringAction>,
}

impl MatchDocument {
    /// Export a scorebook.
    #[must_use]
    pub fn from_scorebook(book: &Scorebook) -> Self {
        Self {
            state: book.state.clone(),
            actions: book.log.records().to_vec(),
        }
    }
}

/// Project an exported match.
///
/// # Errors
///
/// [`ReplayError::Parse`] for malformed JSON, [`ReplayError::Scoring`] for a
/// log with gaps, foreign records or ambiguous extras.
pub fn replay_document(
    json: &str,
    policy: &ScoringPolicy,
) -> Result<LiveScoreProjection, ReplayError> {
    let document: MatchDocument = serde_json::from_str(json)?;
    let actions = document.actions.len();
    let transition = Scorebook::import(document.state, document.actions, policy)?;
    tracing::debug!(
        match_id = %transition.projection.match_id,
        actions,
        "Match replayed"
    );
    Ok(transition.projection)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crease_core::ids::ActionId;
    use crease_core::{
        MatchFormat, MatchId, PlayerId, RecordBall, RecordContext, SelectPlayers, TeamId,
        TossDecision,
    };

    fn scorebook_with_balls() -> Scorebook {
        let policy = ScoringPolicy::default();
        let mut book = Scorebook::create(
            MatchId::new("legacy-7"),
            TeamId::new("reds"),
            TeamId::new("blues"),
            MatchFormat::limited(50),
            &policy,
        )
        .unwrap()
        .scorebook;
        book = book
            .record_toss(TeamId::new("blues"), TossDecision::Bowl, &policy)
            .unwrap()
            .scorebook;
        book = book
            .select_players(
                SelectPlayers::opening(
                    PlayerId::new("r1"),
                    PlayerId::new("r2"),
                    PlayerId::new("b9"),
                ),
                &policy,
            )
            .unwrap()
            .scorebook;
        for runs in [1, 0, 4, 2] {
            let context = RecordContext {
                action_id: ActionId::new(),
                now: crease_core::Utc::now(),
            };
            book = book.record_ball(RecordBall::runs(runs), context, &policy).unwrap().scorebook;
        }
        book
    }

    #[test]
    fn exported_document_replays_to_the_live_projection() {
        let book = scorebook_with_balls();
        let live = book.project(ScoringPolicy::default().projection);
        let json = serde_json::to_string(&MatchDocument::from_scorebook(&book)).unwrap();
        assert!(json.contains("\"match\""));

        let replayed = replay_document(&json, &ScoringPolicy::default()).unwrap();
        assert_eq!(replayed, live);
        assert_eq!(replayed.current_innings.runs, 7);
        assert_eq!(replayed.batting_team_id, Some(TeamId::new("reds")));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = replay_document("{\"match\": 3}", &ScoringPolicy::default()).unwrap_err();
        assert!(matches!(err, ReplayError::Parse(_)));
    }
}
