//! Innings and match lifecycle.
//!
//! ```text
//! SCHEDULED → TOSS_RECORDED → LIVE(1) → INNINGS_BREAK → LIVE(2) → COMPLETED
//!      └──────────┴─────────────┴────────────┴─────────────┴──→ CANCELLED / POSTPONED
//! ```
//!
//! [`MatchState`] is the match record that sits next to the action log. Every
//! transition validates first and mutates only on success, so a rejected
//! command leaves the record untouched.

use crate::action::BowlingAngle;
use crate::error::ScoringError;
use crate::ids::{MatchId, PlayerId, TeamId};
use crate::rules::{self, WICKETS_PER_INNINGS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "innings")]
pub enum MatchStatus {
    /// Created, toss not yet taken.
    Scheduled,
    /// Toss recorded, first ball not yet bowled.
    TossRecorded,
    /// An innings is in progress.
    Live(u8),
    /// Between the first and second innings.
    InningsBreak,
    /// Result decided.
    Completed,
    /// Called off.
    Cancelled,
    /// Suspended, may resume later.
    Postponed,
}

impl MatchStatus {
    /// True for `Completed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// True while balls may be recorded.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live(_))
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => f.write_str("scheduled"),
            Self::TossRecorded => f.write_str("toss recorded"),
            Self::Live(innings) => write!(f, "live (innings {innings})"),
            Self::InningsBreak => f.write_str("innings break"),
            Self::Completed => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Postponed => f.write_str("postponed"),
        }
    }
}

/// What the toss winner chose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TossDecision {
    /// Bat first.
    Bat,
    /// Bowl first.
    Bowl,
}

/// Toss outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    /// Team that won the toss.
    pub winner_id: TeamId,
    /// Their choice.
    pub decision: TossDecision,
}

/// Playing conditions that affect scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFormat {
    /// Overs per innings; `None` for unlimited-overs cricket.
    pub overs: Option<u32>,
}

impl MatchFormat {
    /// A limited-overs match.
    #[must_use]
    pub const fn limited(overs: u32) -> Self {
        Self { overs: Some(overs) }
    }

    /// A match with no overs limit.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self { overs: None }
    }

    /// Twenty overs a side.
    #[must_use]
    pub const fn t20() -> Self {
        Self::limited(20)
    }
}

/// How an innings was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InningsClosure {
    /// All out or overs exhausted.
    Completed,
    /// Declared by the batting captain.
    Declared,
    /// Stopped when the match ended (result reached or abandoned).
    MatchEnded,
}

/// Teams and closure for one innings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsRecord {
    /// 1 or 2.
    pub number: u8,
    /// Side batting.
    pub batting_team_id: TeamId,
    /// Side bowling.
    pub bowling_team_id: TeamId,
    /// Set once the innings is over.
    pub closure: Option<InningsClosure>,
}

/// Players chosen for the current situation, pinned to the point in the log
/// where the choice was made.
///
/// A selection only applies while no later delivery exists in its innings;
/// recording a ball supersedes it and undoing that ball brings it back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSelection {
    /// Innings the selection belongs to.
    pub innings: u8,
    /// Highest sequence number in the log when the selection was made.
    pub after_sequence: u64,
    /// On-strike batter.
    pub striker_id: Option<PlayerId>,
    /// Non-striking batter.
    pub non_striker_id: Option<PlayerId>,
    /// Bowler for the next delivery.
    pub bowler_id: Option<PlayerId>,
    /// Bowler's angle.
    pub bowling_angle: Option<BowlingAngle>,
}

/// Why a batter left the crease without being dismissed by a delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetirementKind {
    /// Retired hurt: not out, may resume.
    Hurt,
    /// Retired out: counts as a wicket.
    Out,
}

/// A retirement, replayed after the delivery it followed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retirement {
    /// Innings it happened in.
    pub innings: u8,
    /// Highest sequence number in the log when the batter retired.
    pub after_sequence: u64,
    /// The retiring batter.
    pub player_id: PlayerId,
    /// Hurt or out.
    pub kind: RetirementKind,
}

/// Margin of a decided match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum WinMargin {
    /// Side batting first won by this many runs.
    Runs(u32),
    /// Side chasing won with this many wickets in hand.
    Wickets(u32),
    /// Scores level.
    Tie,
    /// No result (weather, abandonment).
    NoResult,
}

impl fmt::Display for WinMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runs(1) => f.write_str("by 1 run"),
            Self::Runs(n) => write!(f, "by {n} runs"),
            Self::Wickets(1) => f.write_str("by 1 wicket"),
            Self::Wickets(n) => write!(f, "by {n} wickets"),
            Self::Tie => f.write_str("match tied"),
            Self::NoResult => f.write_str("no result"),
        }
    }
}

/// Final result of a match, computed or supplied by an official.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winning side, if any.
    pub winner_id: Option<TeamId>,
    /// Margin.
    pub margin: WinMargin,
}

/// Score of one innings as the state machine needs it for its guards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreLine {
    /// Runs scored.
    pub runs: u32,
    /// Wickets fallen.
    pub wickets: u32,
    /// Legal balls bowled.
    pub legal_balls: u32,
}

/// The match record: lifecycle status plus everything scored outside the
/// delivery log (toss, innings sides, selections, retirements, result).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Match identifier.
    pub match_id: MatchId,
    /// Home side.
    pub home_team_id: TeamId,
    /// Away side.
    pub away_team_id: TeamId,
    /// Playing conditions.
    pub format: MatchFormat,
    /// Current status.
    pub status: MatchStatus,
    /// Status to return to when a postponed match resumes.
    pub suspended_from: Option<MatchStatus>,
    /// Toss outcome.
    pub toss: Option<Toss>,
    /// One entry per innings started (or about to start).
    pub innings: Vec<InningsRecord>,
    /// Selection history, oldest first.
    pub selections: Vec<PlayerSelection>,
    /// Retirements, oldest first.
    pub retirements: Vec<Retirement>,
    /// Final result.
    pub result: Option<MatchResult>,
}

impl MatchState {
    /// A newly scheduled match.
    #[must_use]
    pub const fn new(
        match_id: MatchId,
        home_team_id: TeamId,
        away_team_id: TeamId,
        format: MatchFormat,
    ) -> Self {
        Self {
            match_id,
            home_team_id,
            away_team_id,
            format,
            status: MatchStatus::Scheduled,
            suspended_from: None,
            toss: None,
            innings: Vec::new(),
            selections: Vec::new(),
            retirements: Vec::new(),
            result: None,
        }
    }

    /// The innings currently in play, or the last one played.
    #[must_use]
    pub fn current_innings(&self) -> Option<&InningsRecord> {
        self.innings.last()
    }

    /// Number of the innings currently in play (1 before the match starts).
    #[must_use]
    pub fn current_innings_number(&self) -> u8 {
        self.current_innings().map_or(1, |innings| innings.number)
    }

    /// The record for innings `number`.
    #[must_use]
    pub fn innings(&self, number: u8) -> Option<&InningsRecord> {
        self.innings.iter().find(|innings| innings.number == number)
    }

    fn invalid(&self, action: &'static str) -> ScoringError {
        ScoringError::InvalidStateTransition {
            from: self.status,
            action,
        }
    }

    fn opponent_of(&self, team: &TeamId) -> Option<TeamId> {
        if *team == self.home_team_id {
            Some(self.away_team_id.clone())
        } else if *team == self.away_team_id {
            Some(self.home_team_id.clone())
        } else {
            None
        }
    }

    /// `SCHEDULED → TOSS_RECORDED`. Fixes the batting and bowling sides for innings 1.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] unless scheduled;
    /// [`ScoringError::PreconditionFailed`] if the winner is not one of the two sides.
    pub fn record_toss(
        &mut self,
        winner_id: TeamId,
        decision: TossDecision,
    ) -> Result<(), ScoringError> {
        if self.status != MatchStatus::Scheduled {
            return Err(self.invalid("record toss"));
        }
        let Some(loser_id) = self.opponent_of(&winner_id) else {
            return Err(ScoringError::precondition(format!(
                "{winner_id} is not playing in match {}",
                self.match_id
            )));
        };
        let (batting_team_id, bowling_team_id) = match decision {
            TossDecision::Bat => (winner_id.clone(), loser_id),
            TossDecision::Bowl => (loser_id, winner_id.clone()),
        };
        self.innings = vec![InningsRecord {
            number: 1,
            batting_team_id,
            bowling_team_id,
            closure: None,
        }];
        self.toss = Some(Toss { winner_id, decision });
        self.status = MatchStatus::TossRecorded;
        Ok(())
    }

    /// `TOSS_RECORDED → LIVE(1)`.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] unless the toss has just been recorded.
    pub fn start_first_innings(&mut self) -> Result<(), ScoringError> {
        if self.status != MatchStatus::TossRecorded {
            return Err(self.invalid("start first innings"));
        }
        self.status = MatchStatus::Live(1);
        Ok(())
    }

    /// `LIVE(1) → INNINGS_BREAK`.
    ///
    /// A completed innings must be all out or have used its overs; a
    /// declaration may happen at any point.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] unless in the first innings;
    /// [`ScoringError::PreconditionFailed`] if a completed innings still has
    /// wickets and overs left.
    pub fn end_innings(
        &mut self,
        closure: InningsClosure,
        score: ScoreLine,
    ) -> Result<(), ScoringError> {
        if self.status != MatchStatus::Live(1) {
            return Err(self.invalid("end innings"));
        }
        match closure {
            InningsClosure::Completed => {
                if !rules::innings_exhausted(score.wickets, score.legal_balls, self.format.overs) {
                    return Err(ScoringError::precondition(format!(
                        "innings is not complete: {}/{} after {} overs",
                        score.runs,
                        score.wickets,
                        rules::overs_display(score.legal_balls)
                    )));
                }
            },
            InningsClosure::Declared => {},
            InningsClosure::MatchEnded => return Err(self.invalid("end innings as match ended")),
        }
        if let Some(innings) = self.innings.last_mut() {
            innings.closure = Some(closure);
        }
        self.status = MatchStatus::InningsBreak;
        Ok(())
    }

    /// `INNINGS_BREAK → LIVE(2)`. The sides swap.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] unless at the innings break.
    pub fn start_second_innings(&mut self) -> Result<(), ScoringError> {
        if self.status != MatchStatus::InningsBreak {
            return Err(self.invalid("start second innings"));
        }
        let Some(first) = self.innings.first() else {
            return Err(self.invalid("start second innings"));
        };
        let second = InningsRecord {
            number: 2,
            batting_team_id: first.bowling_team_id.clone(),
            bowling_team_id: first.batting_team_id.clone(),
            closure: None,
        };
        self.innings.push(second);
        self.status = MatchStatus::Live(2);
        Ok(())
    }

    /// `LIVE(2) → COMPLETED`, or an abandonment from an earlier live state.
    ///
    /// Without a manual result the chase must be decided (target reached,
    /// all out or overs used) and the outcome is computed from the scores.
    /// A manual result always wins and is required before the second innings.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] from a state that cannot end;
    /// [`ScoringError::PreconditionFailed`] if no result can be determined.
    pub fn end_match(
        &mut self,
        manual: Option<MatchResult>,
        first: ScoreLine,
        second: Option<ScoreLine>,
    ) -> Result<MatchResult, ScoringError> {
        let result = match (self.status, manual) {
            (MatchStatus::Live(_) | MatchStatus::InningsBreak, Some(result)) => result,
            (MatchStatus::Live(2), None) => {
                let second = second.unwrap_or_default();
                self.computed_result(first, second)?
            },
            (MatchStatus::Live(_) | MatchStatus::InningsBreak, None) => {
                return Err(ScoringError::precondition(
                    "a manual result is required to end the match before the second innings",
                ));
            },
            _ => return Err(self.invalid("end match")),
        };
        if let Some(innings) = self.innings.last_mut() {
            if innings.closure.is_none() {
                innings.closure = Some(InningsClosure::MatchEnded);
            }
        }
        self.result = Some(result.clone());
        self.status = MatchStatus::Completed;
        Ok(result)
    }

    fn computed_result(
        &self,
        first: ScoreLine,
        second: ScoreLine,
    ) -> Result<MatchResult, ScoringError> {
        let (Some(first_innings), Some(second_innings)) = (self.innings(1), self.innings(2)) else {
            return Err(self.invalid("end match"));
        };
        let target = first.runs.saturating_add(1);
        if second.runs >= target {
            return Ok(MatchResult {
                winner_id: Some(second_innings.batting_team_id.clone()),
                margin: WinMargin::Wickets(WICKETS_PER_INNINGS.saturating_sub(second.wickets)),
            });
        }
        if !rules::innings_exhausted(second.wickets, second.legal_balls, self.format.overs) {
            return Err(ScoringError::precondition(format!(
                "chase is still in progress: {} needed",
                target - second.runs
            )));
        }
        if second.runs == first.runs {
            return Ok(MatchResult {
                winner_id: None,
                margin: WinMargin::Tie,
            });
        }
        Ok(MatchResult {
            winner_id: Some(first_innings.batting_team_id.clone()),
            margin: WinMargin::Runs(first.runs - second.runs),
        })
    }

    /// Any pre-completion state `→ CANCELLED`.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] if already completed or cancelled.
    pub fn cancel(&mut self) -> Result<(), ScoringError> {
        if self.status.is_terminal() {
            return Err(self.invalid("cancel"));
        }
        self.status = MatchStatus::Cancelled;
        self.suspended_from = None;
        Ok(())
    }

    /// Any pre-completion state `→ POSTPONED`.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] if terminal or already postponed.
    pub fn postpone(&mut self) -> Result<(), ScoringError> {
        if self.status.is_terminal() || self.status == MatchStatus::Postponed {
            return Err(self.invalid("postpone"));
        }
        self.suspended_from = Some(self.status);
        self.status = MatchStatus::Postponed;
        Ok(())
    }

    /// `POSTPONED →` the state it was postponed from.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidStateTransition`] unless postponed.
    pub fn resume(&mut self) -> Result<(), ScoringError> {
        match (self.status, self.suspended_from) {
            (MatchStatus::Postponed, Some(previous)) => {
                self.status = previous;
                self.suspended_from = None;
                Ok(())
            },
            _ => Err(self.invalid("resume")),
        }
    }

    /// Add a selection, replacing any earlier one pinned to the same point.
    pub fn push_selection(&mut self, selection: PlayerSelection) {
        self.selections.retain(|existing| {
            existing.innings != selection.innings
                || existing.after_sequence != selection.after_sequence
        });
        self.selections.push(selection);
    }

    /// The selection in force for `innings` given its last delivery.
    #[must_use]
    pub fn active_selection(&self, innings: u8, last_sequence: u64) -> Option<&PlayerSelection> {
        self.selections
            .iter()
            .rev()
            .find(|selection| {
                selection.innings == innings && selection.after_sequence >= last_sequence
            })
    }

    /// Drop selections and retirements made at or after `sequence`.
    ///
    /// Called when the delivery with that sequence number is undone, since
    /// those choices were made in response to it.
    pub fn discard_after(&mut self, sequence: u64) {
        self.selections.retain(|selection| selection.after_sequence < sequence);
        self.retirements.retain(|retirement| retirement.after_sequence < sequence);
    }
}
