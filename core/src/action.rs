//! The scoring action: one delivery, legal or not.
//!
//! A [`ScoringAction`] is immutable once created except for its voided flag.
//! Voided actions stay in the log for audit but never reach the projection.
//!
//! Actions are stored in the durable log using `bincode`, the same compact
//! binary format the rest of the system uses for append-only records.

use crate::error::ScoringError;
use crate::ids::{ActionId, MatchId, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from encoding or decoding a log record.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Failed to serialize the record to bytes.
    #[error("Failed to serialize action: {0}")]
    Serialization(String),

    /// Failed to deserialize the record from bytes.
    #[error("Failed to deserialize action: {0}")]
    Deserialization(String),
}

/// Runs not credited to the batter, broken down by type.
///
/// `wide` and `no_ball` include the one-run penalty for the illegal delivery
/// plus anything run or hit to the boundary off it. At most one of them may
/// be non-zero for a single delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extras {
    /// Wide runs.
    pub wide: u32,
    /// No-ball runs (the penalty run; bat runs off a no-ball go to `runs_off_bat`).
    pub no_ball: u32,
    /// Byes.
    pub bye: u32,
    /// Leg-byes.
    pub leg_bye: u32,
    /// Penalty runs awarded to the batting side.
    pub penalty: u32,
}

impl Extras {
    /// No extras.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            wide: 0,
            no_ball: 0,
            bye: 0,
            leg_bye: 0,
            penalty: 0,
        }
    }

    /// A wide worth `runs` in total.
    #[must_use]
    pub const fn wide(runs: u32) -> Self {
        Self {
            wide: runs,
            ..Self::none()
        }
    }

    /// A no-ball worth `runs` in extras.
    #[must_use]
    pub const fn no_ball(runs: u32) -> Self {
        Self {
            no_ball: runs,
            ..Self::none()
        }
    }

    /// `runs` byes off a legal delivery.
    #[must_use]
    pub const fn bye(runs: u32) -> Self {
        Self {
            bye: runs,
            ..Self::none()
        }
    }

    /// `runs` leg-byes off a legal delivery.
    #[must_use]
    pub const fn leg_bye(runs: u32) -> Self {
        Self {
            leg_bye: runs,
            ..Self::none()
        }
    }

    /// `runs` penalty runs.
    #[must_use]
    pub const fn penalty(runs: u32) -> Self {
        Self {
            penalty: runs,
            ..Self::none()
        }
    }

    /// Sum of every extras component.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.wide
            .saturating_add(self.no_ball)
            .saturating_add(self.bye)
            .saturating_add(self.leg_bye)
            .saturating_add(self.penalty)
    }

    /// Byes plus leg-byes: runs that are neither the batter's nor the bowler's.
    #[must_use]
    pub const fn unattributed(&self) -> u32 {
        self.bye.saturating_add(self.leg_bye)
    }

    /// True if this delivery was a wide.
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        self.wide > 0
    }

    /// True if this delivery was a no-ball.
    #[must_use]
    pub const fn is_no_ball(&self) -> bool {
        self.no_ball > 0
    }

    /// A delivery is legal unless it was a wide or a no-ball.
    #[must_use]
    pub const fn is_legal_delivery(&self) -> bool {
        !self.is_wide() && !self.is_no_ball()
    }

    /// Reject a delivery that claims to be both a wide and a no-ball.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::AmbiguousExtras`] when both are non-zero.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.is_wide() && self.is_no_ball() {
            return Err(ScoringError::AmbiguousExtras);
        }
        Ok(())
    }
}

/// How a batter was dismissed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalType {
    /// Bowled.
    Bowled,
    /// Caught by a fielder.
    Caught,
    /// Caught by the bowler.
    CaughtAndBowled,
    /// Leg before wicket.
    Lbw,
    /// Stumped by the keeper.
    Stumped,
    /// Hit wicket.
    HitWicket,
    /// Run out.
    RunOut,
    /// Obstructing the field.
    ObstructingTheField,
    /// Hit the ball twice.
    HitTheBallTwice,
    /// Timed out.
    TimedOut,
    /// Retired out.
    RetiredOut,
}

impl DismissalType {
    /// Whether the bowler is credited with this wicket.
    #[must_use]
    pub const fn credited_to_bowler(self) -> bool {
        matches!(
            self,
            Self::Bowled
                | Self::Caught
                | Self::CaughtAndBowled
                | Self::Lbw
                | Self::Stumped
                | Self::HitWicket
        )
    }

    /// Short scorecard label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bowled => "b",
            Self::Caught => "c",
            Self::CaughtAndBowled => "c&b",
            Self::Lbw => "lbw",
            Self::Stumped => "st",
            Self::HitWicket => "hit wkt",
            Self::RunOut => "run out",
            Self::ObstructingTheField => "obstructing",
            Self::HitTheBallTwice => "hit twice",
            Self::TimedOut => "timed out",
            Self::RetiredOut => "retired out",
        }
    }
}

impl fmt::Display for DismissalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dismissal detail attached to a wicket-taking delivery.
///
/// `dismissed_player_id` is taken exactly as supplied by the scorer; the engine
/// does not infer which end a run-out happened at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wicket {
    /// Mode of dismissal.
    pub kind: DismissalType,
    /// The batter who is out.
    pub dismissed_player_id: PlayerId,
    /// Fielders involved (catcher, thrower, keeper).
    pub fielder_ids: Vec<PlayerId>,
}

impl Wicket {
    /// A wicket with no fielders involved.
    #[must_use]
    pub fn new(kind: DismissalType, dismissed_player_id: PlayerId) -> Self {
        Self {
            kind,
            dismissed_player_id,
            fielder_ids: Vec::new(),
        }
    }

    /// Add a fielder to the dismissal.
    #[must_use]
    pub fn with_fielder(mut self, fielder: PlayerId) -> Self {
        self.fielder_ids.push(fielder);
        self
    }
}

/// Where an action came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSource {
    /// Recorded by a scorer during the match.
    #[default]
    Live,
    /// Imported from legacy per-ball records.
    Migration,
    /// Re-entered after an undo.
    Correction,
}

/// Which side of the wicket the bowler is delivering from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BowlingAngle {
    /// Over the wicket.
    OverTheWicket,
    /// Round the wicket.
    RoundTheWicket,
}

/// Where the ball went, in pitch-map units. Passed through to ball history untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShotCoordinates {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

/// One delivery in the action log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringAction {
    /// Unique record id.
    pub id: ActionId,
    /// Match this delivery belongs to.
    pub match_id: MatchId,
    /// 1 or 2.
    pub innings_number: u8,
    /// 0-based over number (display only).
    pub over_number: u32,
    /// Position within the over (display only, ambiguous around extras).
    pub ball_in_over: u32,
    /// Global ordering key, monotonic and gapless per match.
    pub sequence_number: u64,
    /// Batter on strike.
    pub striker_id: PlayerId,
    /// Batter at the other end, if one is in.
    pub non_striker_id: Option<PlayerId>,
    /// Bowler.
    pub bowler_id: PlayerId,
    /// Bowler's angle of approach, if recorded.
    pub bowling_angle: Option<BowlingAngle>,
    /// Runs credited to the striker.
    pub runs_off_bat: u32,
    /// Extras breakdown.
    pub extras: Extras,
    /// Stored total for audit. Never trusted by the projection.
    pub total_runs: u32,
    /// False for wides and no-balls.
    pub is_legal_delivery: bool,
    /// Dismissal, if a wicket fell.
    pub wicket: Option<Wicket>,
    /// Shot placement for the wagon wheel.
    pub shot: Option<ShotCoordinates>,
    /// Logically undone.
    pub is_voided: bool,
    /// Why the action was voided.
    pub void_reason: Option<String>,
    /// When the delivery was bowled.
    pub timestamp: DateTime<Utc>,
    /// Provenance.
    pub source: ActionSource,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl ScoringAction {
    /// Runs this delivery adds to the team total, recomputed from its parts.
    #[must_use]
    pub const fn computed_total(&self) -> u32 {
        self.runs_off_bat.saturating_add(self.extras.total())
    }

    /// Whether a wicket fell on this delivery.
    #[must_use]
    pub const fn is_wicket(&self) -> bool {
        self.wicket.is_some()
    }

    /// Legality derived from the extras, ignoring the stored flag.
    #[must_use]
    pub const fn derived_is_legal(&self) -> bool {
        self.extras.is_legal_delivery()
    }

    /// Wides never count as a ball faced; legal deliveries and no-balls do.
    #[must_use]
    pub const fn counts_as_ball_faced(&self) -> bool {
        !self.extras.is_wide()
    }

    /// Runs charged against the bowler's figures.
    #[must_use]
    pub const fn runs_conceded_by_bowler(&self) -> u32 {
        self.computed_total().saturating_sub(self.extras.unattributed())
    }

    /// Runs the batters physically ran or hit, which decide strike rotation.
    ///
    /// Off-bat runs and byes/leg-byes count. Wide and no-ball runs count only
    /// above the one-run penalty, so a plain wide or no-ball never rotates.
    #[must_use]
    pub const fn runs_between_wickets(&self) -> u32 {
        let ran_on_illegal = self.extras.wide.saturating_add(self.extras.no_ball).saturating_sub(1);
        self.runs_off_bat
            .saturating_add(self.extras.unattributed())
            .saturating_add(ran_on_illegal)
    }

    /// Mark this action as undone. Voiding is idempotent.
    pub fn void(&mut self, reason: impl Into<String>) {
        if !self.is_voided {
            self.is_voided = true;
            self.void_reason = Some(reason.into());
        }
    }

    /// Encode the record for a durable store.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        bincode::serialize(self).map_err(|e| RecordError::Serialization(e.to_string()))
    }

    /// Decode a record written by [`ScoringAction::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Deserialization`] if the bytes are corrupt or
    /// were written with an incompatible schema.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        bincode::deserialize(bytes).map_err(|e| RecordError::Deserialization(e.to_string()))
    }
}

impl fmt::Display for ScoringAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}.{} {} to {}: {} run(s)",
            self.sequence_number,
            self.over_number,
            self.ball_in_over,
            self.bowler_id,
            self.striker_id,
            self.computed_total()
        )?;
        if let Some(wicket) = &self.wicket {
            write!(f, ", {} {}", wicket.dismissed_player_id, wicket.kind)?;
        }
        if self.is_voided {
            f.write_str(" [voided]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn delivery(runs_off_bat: u32, extras: Extras) -> ScoringAction {
        let now = Utc::now();
        ScoringAction {
            id: ActionId::new(),
            match_id: MatchId::new("m1"),
            innings_number: 1,
            over_number: 0,
            ball_in_over: 1,
            sequence_number: 1,
            striker_id: PlayerId::new("s"),
            non_striker_id: Some(PlayerId::new("n")),
            bowler_id: PlayerId::new("b"),
            bowling_angle: None,
            runs_off_bat,
            extras,
            total_runs: runs_off_bat + extras.total(),
            is_legal_delivery: extras.is_legal_delivery(),
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
    fn wide_and_no_ball_together_is_ambiguous() {
        let extras = Extras {
            wide: 1,
            no_ball: 1,
            ..Extras::none()
        };
        assert_eq!(extras.validate(), Err(ScoringError::AmbiguousExtras));
        assert!(Extras::wide(2).validate().is_ok());
    }

    #[test]
    fn byes_keep_the_delivery_legal() {
        assert!(Extras::bye(2).is_legal_delivery());
        assert!(Extras::leg_bye(1).is_legal_delivery());
        assert!(!Extras::wide(1).is_legal_delivery());
        assert!(!Extras::no_ball(1).is_legal_delivery());
    }

    #[test]
    fn stored_total_is_ignored() {
        let mut action = delivery(4, Extras::no_ball(1));
        action.total_runs = 99;
        assert_eq!(action.computed_total(), 5);
    }

    #[test]
    fn bowler_is_not_charged_for_byes() {
        assert_eq!(delivery(0, Extras::bye(4)).runs_conceded_by_bowler(), 0);
        assert_eq!(delivery(0, Extras::wide(3)).runs_conceded_by_bowler(), 3);
        assert_eq!(delivery(2, Extras::no_ball(1)).runs_conceded_by_bowler(), 3);
    }

    #[test]
    fn penalty_run_on_illegal_delivery_does_not_count_as_running() {
        assert_eq!(delivery(0, Extras::wide(1)).runs_between_wickets(), 0);
        assert_eq!(delivery(0, Extras::wide(2)).runs_between_wickets(), 1);
        assert_eq!(delivery(1, Extras::no_ball(1)).runs_between_wickets(), 1);
        assert_eq!(delivery(0, Extras::leg_bye(3)).runs_between_wickets(), 3);
    }

    #[test]
    fn wides_are_not_balls_faced() {
        assert!(!delivery(0, Extras::wide(1)).counts_as_ball_faced());
        assert!(delivery(0, Extras::no_ball(1)).counts_as_ball_faced());
        assert!(delivery(0, Extras::none()).counts_as_ball_faced());
    }

    #[test]
    fn void_keeps_the_first_reason() {
        let mut action = delivery(1, Extras::none());
        action.void("misclick");
        action.void("second attempt");
        assert!(action.is_voided);
        assert_eq!(action.void_reason.as_deref(), Some("misclick"));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn record_survives_binary_encoding() {
        let mut action = delivery(2, Extras::leg_bye(1));
        action.wicket = Some(
            Wicket::new(DismissalType::RunOut, PlayerId::new("n"))
                .with_fielder(PlayerId::new("f1")),
        );
        let bytes = action.to_bytes().expect("encode");
        let decoded = ScoringAction::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, action);
    }
}
