//! The caller-facing verbs as pure workflows.
//!
//! A [`Scorebook`] is the match record plus its action log. Each workflow
//! borrows the current scorebook, validates the command against the current
//! projection, and returns a [`Transition`]: the next scorebook, its freshly
//! derived projection, and whatever the verb reports back. Nothing is mutated
//! in place, so a rejected command leaves the caller's copy untouched and the
//! runtime can commit the whole transition or drop it.

use crate::action::{
    ActionSource, BowlingAngle, DismissalType, Extras, ScoringAction, ShotCoordinates, Wicket,
};
use crate::error::{Result, ScoringError};
use crate::ids::{ActionId, MatchId, PlayerId, TeamId};
use crate::log::ActionLog;
use crate::projection::{self, LiveScoreProjection, ProjectionOptions};
use crate::rules;
use crate::state_machine::{
    InningsClosure, MatchFormat, MatchResult, MatchState, MatchStatus, PlayerSelection, Retirement,
    RetirementKind, ScoreLine, TossDecision,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings that shape workflow validation and projection output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringPolicy {
    /// Reject a selection that gives a new over to the previous over's bowler.
    pub enforce_bowler_rotation: bool,
    /// Options passed to the projection engine.
    pub projection: ProjectionOptions,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            enforce_bowler_rotation: true,
            projection: ProjectionOptions::default(),
        }
    }
}

/// Players to put in. `None` keeps whoever currently holds the slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectPlayers {
    /// New striker.
    pub striker_id: Option<PlayerId>,
    /// New non-striker.
    pub non_striker_id: Option<PlayerId>,
    /// New bowler.
    pub bowler_id: Option<PlayerId>,
    /// Bowler's angle.
    pub bowling_angle: Option<BowlingAngle>,
}

impl SelectPlayers {
    /// Opening selection: both batters and the bowler.
    #[must_use]
    pub fn opening(striker_id: PlayerId, non_striker_id: PlayerId, bowler_id: PlayerId) -> Self {
        Self {
            striker_id: Some(striker_id),
            non_striker_id: Some(non_striker_id),
            bowler_id: Some(bowler_id),
            bowling_angle: None,
        }
    }

    /// Only a striker (the usual selection after a wicket).
    #[must_use]
    pub fn striker(striker_id: PlayerId) -> Self {
        Self {
            striker_id: Some(striker_id),
            ..Self::default()
        }
    }

    /// Only a non-striker.
    #[must_use]
    pub fn non_striker(non_striker_id: PlayerId) -> Self {
        Self {
            non_striker_id: Some(non_striker_id),
            ..Self::default()
        }
    }

    /// Only a bowler (the usual selection at the end of an over).
    #[must_use]
    pub fn bowler(bowler_id: PlayerId) -> Self {
        Self {
            bowler_id: Some(bowler_id),
            ..Self::default()
        }
    }

    /// Set the bowler's angle.
    #[must_use]
    pub const fn with_angle(mut self, angle: BowlingAngle) -> Self {
        self.bowling_angle = Some(angle);
        self
    }
}

/// What happened on a delivery, as entered by the scorer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBall {
    /// Runs credited to the striker.
    pub runs_off_bat: u32,
    /// Extras breakdown.
    pub extras: Extras,
    /// Dismissal, if any.
    pub wicket: Option<Wicket>,
    /// Shot placement, passed through to ball history.
    pub shot: Option<ShotCoordinates>,
    /// Provenance of the record.
    pub source: ActionSource,
}

impl RecordBall {
    /// `runs` off the bat, no extras.
    #[must_use]
    pub fn runs(runs_off_bat: u32) -> Self {
        Self {
            runs_off_bat,
            ..Self::default()
        }
    }

    /// A dot ball.
    #[must_use]
    pub fn dot() -> Self {
        Self::runs(0)
    }

    /// A delivery with only extras.
    #[must_use]
    pub fn extras(extras: Extras) -> Self {
        Self {
            extras,
            ..Self::default()
        }
    }

    /// A wicket-taking dot ball.
    #[must_use]
    pub fn wicket(kind: DismissalType, dismissed_player_id: PlayerId) -> Self {
        Self {
            wicket: Some(Wicket::new(kind, dismissed_player_id)),
            ..Self::default()
        }
    }

    /// Attach a dismissal.
    #[must_use]
    pub fn with_wicket(mut self, wicket: Wicket) -> Self {
        self.wicket = Some(wicket);
        self
    }

    /// Attach extras.
    #[must_use]
    pub const fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }

    /// Attach shot coordinates.
    #[must_use]
    pub const fn with_shot(mut self, x: i32, y: i32) -> Self {
        self.shot = Some(ShotCoordinates { x, y });
        self
    }

    /// Set the provenance.
    #[must_use]
    pub const fn with_source(mut self, source: ActionSource) -> Self {
        self.source = source;
        self
    }
}

/// Identity and time for a new log record, supplied by the environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordContext {
    /// Identifier for the new action.
    pub action_id: ActionId,
    /// Wall-clock time of recording.
    pub now: DateTime<Utc>,
}

/// Something worth telling the scorer about after a delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum NotableEvent {
    /// A batter was dismissed.
    Wicket {
        /// The batter out.
        player_id: PlayerId,
        /// How.
        kind: DismissalType,
    },
    /// Four or six off the bat.
    Boundary {
        /// The striker.
        player_id: PlayerId,
        /// 4 or 6.
        runs: u32,
    },
    /// A batter reached a multiple of fifty.
    Milestone {
        /// The batter.
        player_id: PlayerId,
        /// 50, 100, 150, ...
        runs: u32,
    },
    /// The delivery completed an over.
    OverComplete {
        /// 0-based number of the over just finished.
        over_number: u32,
        /// Who bowled it.
        bowler_id: PlayerId,
    },
    /// The over just finished conceded nothing.
    MaidenOver {
        /// Who bowled it.
        bowler_id: PlayerId,
    },
    /// All out or overs exhausted; the innings can take no more balls.
    InningsComplete,
    /// The chasing side has passed the target.
    TargetReached,
}

/// What `record_ball` reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BallOutcome {
    /// The appended record.
    pub action: ScoringAction,
    /// Notable events, in the order a scorer would announce them.
    pub events: Vec<NotableEvent>,
}

/// What `undo_last_ball` reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoOutcome {
    /// The record as now stored, voided.
    pub voided_action: ScoringAction,
    /// Runs the record had added to the total.
    pub undone_runs: u32,
}

/// Result of a successful workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<T> {
    /// The scorebook to commit.
    pub scorebook: Scorebook,
    /// Its projection.
    pub projection: LiveScoreProjection,
    /// Verb-specific output.
    pub outcome: T,
}

/// The match record and its action log, the inputs every workflow runs on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorebook {
    /// Lifecycle, sides, overlays, result.
    pub state: MatchState,
    /// Deliveries.
    pub log: ActionLog,
}

impl Scorebook {
    /// Pair a match record with its log.
    #[must_use]
    pub const fn new(state: MatchState, log: ActionLog) -> Self {
        Self { state, log }
    }

    /// Match identifier.
    #[must_use]
    pub const fn match_id(&self) -> &MatchId {
        &self.state.match_id
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> MatchStatus {
        self.state.status
    }

    /// Derive the live projection.
    #[must_use]
    pub fn project(&self, options: ProjectionOptions) -> LiveScoreProjection {
        projection::project(&self.state, self.log.records(), options)
    }

    fn finish<T>(self, policy: &ScoringPolicy, outcome: T) -> Transition<T> {
        let projection = self.project(policy.projection);
        Transition {
            scorebook: self,
            projection,
            outcome,
        }
    }

    /// Schedule a new match.
    ///
    /// # Errors
    ///
    /// [`ScoringError::PreconditionFailed`] if a side is drawn against itself.
    pub fn create(
        match_id: MatchId,
        home_team_id: TeamId,
        away_team_id: TeamId,
        format: MatchFormat,
        policy: &ScoringPolicy,
    ) -> Result<Transition<()>> {
        if home_team_id == away_team_id {
            return Err(ScoringError::precondition(format!(
                "{home_team_id} cannot play itself"
            )));
        }
        if format.overs == Some(0) {
            return Err(ScoringError::precondition("a limited-overs match needs at least one over"));
        }
        let log = ActionLog::new(match_id.clone());
        let state = MatchState::new(match_id, home_team_id, away_team_id, format);
        Ok(Self::new(state, log).finish(policy, ()))
    }

    /// Materialise a scorebook from legacy records in one pass.
    ///
    /// The records must be numbered 1, 2, 3, ... and the match state must
    /// already describe the innings they belong to. The projection equals
    /// what recording the same balls one by one would have produced.
    ///
    /// # Errors
    ///
    /// [`ScoringError::InvalidSequencing`] for gaps or reordering,
    /// [`ScoringError::AmbiguousExtras`] for a wide no-ball, and
    /// [`ScoringError::PreconditionFailed`] for a record of another match, of
    /// an innings the match state does not know, or with more runs than one
    /// delivery can produce.
    pub fn import(
        state: MatchState,
        mut records: Vec<ScoringAction>,
        policy: &ScoringPolicy,
    ) -> Result<Transition<usize>> {
        records.sort_by_key(|action| action.sequence_number);
        for action in &records {
            action.extras.validate()?;
            rules::check_delivery_runs(action.runs_off_bat, &action.extras)?;
            if state.innings(action.innings_number).is_none() {
                return Err(ScoringError::precondition(format!(
                    "action #{} belongs to innings {} which has not started",
                    action.sequence_number, action.innings_number
                )));
            }
        }
        let imported = records.len();
        let log = ActionLog::from_records(state.match_id.clone(), records)?;
        Ok(Self::new(state, log).finish(policy, imported))
    }

    /// `recordToss`.
    ///
    /// # Errors
    ///
    /// See [`MatchState::record_toss`].
    pub fn record_toss(
        &self,
        winner_id: TeamId,
        decision: TossDecision,
        policy: &ScoringPolicy,
    ) -> Result<Transition<()>> {
        let mut next = self.clone();
        next.state.record_toss(winner_id, decision)?;
        Ok(next.finish(policy, ()))
    }

    /// `selectPlayers`: fill or change the striker, non-striker and bowler.
    ///
    /// The first selection after the toss starts the first innings. A
    /// selection only lasts until the next delivery, which carries the
    /// players forward itself.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::InvalidStateTransition`] unless the toss is recorded or an innings is live
    /// - [`ScoringError::PreconditionFailed`] if both ends name the same batter,
    ///   a dismissed batter is sent back in, or the bowler bowled the previous over
    pub fn select_players(
        &self,
        selection: SelectPlayers,
        policy: &ScoringPolicy,
    ) -> Result<Transition<()>> {
        let mut next = self.clone();
        match self.status() {
            MatchStatus::TossRecorded => next.state.start_first_innings()?,
            MatchStatus::Live(_) => {},
            from => {
                return Err(ScoringError::InvalidStateTransition {
                    from,
                    action: "select players",
                });
            },
        }

        let current = next.project(ProjectionOptions::default());
        let players = current.current_players.clone();
        let striker_id = selection.striker_id.clone().or(players.striker_id);
        let non_striker_id = selection.non_striker_id.clone().or(players.non_striker_id);
        let bowler_id = selection.bowler_id.clone().or(players.bowler_id);
        let bowling_angle = if selection.bowler_id.is_some() {
            selection.bowling_angle
        } else {
            selection.bowling_angle.or(players.bowling_angle)
        };

        if striker_id.is_some() && striker_id == non_striker_id {
            return Err(ScoringError::precondition(
                "striker and non-striker must be different players",
            ));
        }
        for batter in [&selection.striker_id, &selection.non_striker_id].into_iter().flatten() {
            if current.batter(batter).is_some_and(|figures| figures.is_out) {
                return Err(ScoringError::precondition(format!("{batter} is already out")));
            }
            if bowler_id.as_ref() == Some(batter) {
                return Err(ScoringError::precondition(format!(
                    "{batter} cannot bat and bowl at once"
                )));
            }
        }
        if policy.enforce_bowler_rotation {
            if let Some(bowler) = &selection.bowler_id {
                rules::check_bowler_eligible(
                    bowler,
                    current.last_over_bowler.as_ref(),
                    current.current_innings.balls,
                )?;
            }
        }

        next.state.push_selection(PlayerSelection {
            innings: current.innings_number,
            after_sequence: next.log.max_sequence(),
            striker_id,
            non_striker_id,
            bowler_id,
            bowling_angle,
        });
        Ok(next.finish(policy, ()))
    }

    /// `recordBall`: append one delivery and report what it brought about.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::AmbiguousExtras`] for a delivery that is both wide and no-ball
    /// - [`ScoringError::PreconditionFailed`] unless the match is live with a
    ///   striker and a bowler in place, the innings can still take balls, and
    ///   a dismissed player is one of the two batters
    /// - [`ScoringError::PreconditionFailed`] when the runs off the bat or an
    ///   extras component exceeds [`rules::MAX_RUNS_PER_COMPONENT`]
    pub fn record_ball(
        &self,
        ball: RecordBall,
        context: RecordContext,
        policy: &ScoringPolicy,
    ) -> Result<Transition<BallOutcome>> {
        ball.extras.validate()?;
        rules::check_delivery_runs(ball.runs_off_bat, &ball.extras)?;
        let MatchStatus::Live(innings_number) = self.status() else {
            return Err(ScoringError::precondition(format!(
                "balls can only be recorded while the match is live; it is {}",
                self.status()
            )));
        };

        let before = self.project(ProjectionOptions::default());
        let score = before.current_innings;
        if rules::innings_exhausted(score.wickets, score.legal_balls(), self.state.format.overs) {
            return Err(ScoringError::precondition(format!(
                "innings {innings_number} is complete at {}/{} ({} overs)",
                score.runs,
                score.wickets,
                score.overs_display()
            )));
        }
        if score.runs_required() == Some(0) {
            return Err(ScoringError::precondition("the target has already been reached"));
        }
        let players = &before.current_players;
        let Some(striker_id) = players.striker_id.clone() else {
            return Err(ScoringError::precondition(
                "select a new batter before recording the next ball",
            ));
        };
        let Some(bowler_id) = players.bowler_id.clone() else {
            return Err(ScoringError::precondition(
                "select a bowler before recording the next ball",
            ));
        };
        if let Some(wicket) = &ball.wicket {
            if !players.is_batting(&wicket.dismissed_player_id) {
                return Err(ScoringError::precondition(format!(
                    "{} is not at the crease",
                    wicket.dismissed_player_id
                )));
            }
        }

        let action = ScoringAction {
            id: context.action_id,
            match_id: self.match_id().clone(),
            innings_number,
            over_number: score.overs,
            ball_in_over: score.balls + 1,
            sequence_number: self.log.next_sequence(),
            striker_id,
            non_striker_id: players.non_striker_id.clone(),
            bowler_id,
            bowling_angle: players.bowling_angle,
            runs_off_bat: ball.runs_off_bat,
            extras: ball.extras,
            total_runs: ball.runs_off_bat.saturating_add(ball.extras.total()),
            is_legal_delivery: ball.extras.is_legal_delivery(),
            wicket: ball.wicket,
            shot: ball.shot,
            is_voided: false,
            void_reason: None,
            timestamp: context.now,
            source: ball.source,
            created_at: context.now,
        };

        let mut next = self.clone();
        next.log.append(action.clone())?;
        let transition = next.finish(policy, ());
        let events = notable_events(&before, &transition.projection, &action, self.state.format);
        Ok(Transition {
            scorebook: transition.scorebook,
            projection: transition.projection,
            outcome: BallOutcome { action, events },
        })
    }

    /// `undoLastBall`: void the most recent delivery and re-derive.
    ///
    /// Selections and retirements made after the undone delivery go with it.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::NoActionsToUndo`] if nothing is left to undo
    /// - [`ScoringError::PreconditionFailed`] unless an innings is live and the
    ///   delivery belongs to it
    pub fn undo_last_ball(
        &self,
        reason: &str,
        policy: &ScoringPolicy,
    ) -> Result<Transition<UndoOutcome>> {
        let Some(last) = self.log.last_non_voided() else {
            return Err(ScoringError::NoActionsToUndo {
                match_id: self.match_id().clone(),
            });
        };
        match self.status() {
            MatchStatus::Live(innings) if innings == last.innings_number => {},
            MatchStatus::Live(innings) => {
                return Err(ScoringError::precondition(format!(
                    "the last ball belongs to innings {}, not the current innings {innings}",
                    last.innings_number
                )));
            },
            status => {
                return Err(ScoringError::precondition(format!(
                    "balls can only be undone while the match is live; it is {status}"
                )));
            },
        }

        let mut next = self.clone();
        let voided = next.log.void_last(reason)?;
        next.state.discard_after(voided.action.sequence_number);
        Ok(next.finish(
            policy,
            UndoOutcome {
                voided_action: voided.action,
                undone_runs: voided.undone_runs,
            },
        ))
    }

    /// `retireBatter`: take a batter off without a delivery.
    ///
    /// # Errors
    ///
    /// [`ScoringError::PreconditionFailed`] unless an innings is live and the
    /// player is at the crease.
    pub fn retire_batter(
        &self,
        player_id: PlayerId,
        kind: RetirementKind,
        policy: &ScoringPolicy,
    ) -> Result<Transition<()>> {
        let MatchStatus::Live(innings) = self.status() else {
            return Err(ScoringError::precondition(format!(
                "batters can only retire while the match is live; it is {}",
                self.status()
            )));
        };
        let current = self.project(ProjectionOptions::default());
        if !current.current_players.is_batting(&player_id) {
            return Err(ScoringError::precondition(format!("{player_id} is not at the crease")));
        }

        let mut next = self.clone();
        let after_sequence = next.log.max_sequence();
        let mut players = current.current_players;
        if players.striker_id.as_ref() == Some(&player_id) {
            players.striker_id = None;
        } else {
            players.non_striker_id = None;
        }
        next.state.retirements.push(Retirement {
            innings,
            after_sequence,
            player_id,
            kind,
        });
        next.state.push_selection(PlayerSelection {
            innings,
            after_sequence,
            striker_id: players.striker_id,
            non_striker_id: players.non_striker_id,
            bowler_id: players.bowler_id,
            bowling_angle: players.bowling_angle,
        });
        Ok(next.finish(policy, ()))
    }

    /// `endInnings`: close the first innings, completed or declared.
    ///
    /// # Errors
    ///
    /// See [`MatchState::end_innings`].
    pub fn end_innings(
        &self,
        closure: InningsClosure,
        policy: &ScoringPolicy,
    ) -> Result<Transition<()>> {
        let current = self.project(ProjectionOptions::default());
        let mut next = self.clone();
        next.state.end_innings(closure, current.current_innings.score_line())?;
        Ok(next.finish(policy, ()))
    }

    /// `startSecondInnings`.
    ///
    /// # Errors
    ///
    /// See [`MatchState::start_second_innings`].
    pub fn start_second_innings(&self, policy: &ScoringPolicy) -> Result<Transition<()>> {
        let mut next = self.clone();
        next.state.start_second_innings()?;
        Ok(next.finish(policy, ()))
    }

    /// `endMatch`: decide the result from the scores, or accept a manual one.
    ///
    /// # Errors
    ///
    /// See [`MatchState::end_match`].
    pub fn end_match(
        &self,
        manual: Option<MatchResult>,
        policy: &ScoringPolicy,
    ) -> Result<Transition<MatchResult>> {
        let current = self.project(ProjectionOptions::default());
        let (first, second) = innings_lines(&current);
        let mut next = self.clone();
        let result = next.state.end_match(manual, first, second)?;
        Ok(next.finish(policy, result))
    }

    /// Call the match off.
    ///
    /// # Errors
    ///
    /// See [`MatchState::cancel`].
    pub fn cancel(&self, policy: &ScoringPolicy) -> Result<Transition<()>> {
        let mut next = self.clone();
        next.state.cancel()?;
        Ok(next.finish(policy, ()))
    }

    /// Suspend the match.
    ///
    /// # Errors
    ///
    /// See [`MatchState::postpone`].
    pub fn postpone(&self, policy: &ScoringPolicy) -> Result<Transition<()>> {
        let mut next = self.clone();
        next.state.postpone()?;
        Ok(next.finish(policy, ()))
    }

    /// Resume a postponed match where it left off.
    ///
    /// # Errors
    ///
    /// See [`MatchState::resume`].
    pub fn resume(&self, policy: &ScoringPolicy) -> Result<Transition<()>> {
        let mut next = self.clone();
        next.state.resume()?;
        Ok(next.finish(policy, ()))
    }
}

fn innings_lines(projection: &LiveScoreProjection) -> (ScoreLine, Option<ScoreLine>) {
    let current = projection.current_innings.score_line();
    if projection.innings_number == 1 {
        return (current, None);
    }
    let first = projection
        .innings1
        .as_ref()
        .map(|summary| summary.score.score_line())
        .unwrap_or_default();
    let second = projection
        .innings2
        .as_ref()
        .map_or(current, |summary| summary.score.score_line());
    (first, Some(second))
}

fn notable_events(
    before: &LiveScoreProjection,
    after: &LiveScoreProjection,
    action: &ScoringAction,
    format: MatchFormat,
) -> Vec<NotableEvent> {
    let mut events = Vec::new();

    if let Some(wicket) = &action.wicket {
        events.push(NotableEvent::Wicket {
            player_id: wicket.dismissed_player_id.clone(),
            kind: wicket.kind,
        });
    }
    if matches!(action.runs_off_bat, 4 | 6) {
        events.push(NotableEvent::Boundary {
            player_id: action.striker_id.clone(),
            runs: action.runs_off_bat,
        });
    }

    let runs_before = before.batter(&action.striker_id).map_or(0, |figures| figures.runs);
    let runs_after = after.batter(&action.striker_id).map_or(0, |figures| figures.runs);
    for milestone in rules::milestones_crossed(runs_before, runs_after) {
        events.push(NotableEvent::Milestone {
            player_id: action.striker_id.clone(),
            runs: milestone,
        });
    }

    let score = after.current_innings;
    if action.derived_is_legal() && rules::completes_over(score.legal_balls()) {
        events.push(NotableEvent::OverComplete {
            over_number: action.over_number,
            bowler_id: action.bowler_id.clone(),
        });
        let maidens_before = before.bowler(&action.bowler_id).map_or(0, |figures| figures.maidens);
        let maidens_after = after.bowler(&action.bowler_id).map_or(0, |figures| figures.maidens);
        if maidens_after > maidens_before {
            events.push(NotableEvent::MaidenOver {
                bowler_id: action.bowler_id.clone(),
            });
        }
    }

    if score.runs_required() == Some(0) {
        events.push(NotableEvent::TargetReached);
    } else if rules::innings_exhausted(score.wickets, score.legal_balls(), format.overs) {
        events.push(NotableEvent::InningsComplete);
    }
    events
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx() -> RecordContext {
        RecordContext {
            action_id: ActionId::new(),
            now: Utc::now(),
        }
    }

    fn live(format: MatchFormat) -> Scorebook {
        let policy = ScoringPolicy::default();
        let book = Scorebook::create(
            MatchId::new("m1"),
            TeamId::new("a"),
            TeamId::new("b"),
            format,
            &policy,
        )
        .unwrap()
        .scorebook;
        let book = book
            .record_toss(TeamId::new("a"), TossDecision::Bat, &policy)
            .unwrap()
            .scorebook;
        book.select_players(
            SelectPlayers::opening(PlayerId::new("s"), PlayerId::new("n"), PlayerId::new("b1")),
            &policy,
        )
        .unwrap()
        .scorebook
    }

    fn bowl(book: &Scorebook, ball: RecordBall) -> Transition<BallOutcome> {
        book.record_ball(ball, ctx(), &ScoringPolicy::default()).unwrap()
    }

    #[test]
    fn first_selection_starts_the_innings() {
        let book = live(MatchFormat::t20());
        assert_eq!(book.status(), MatchStatus::Live(1));
        let projection = book.project(ProjectionOptions::default());
        assert_eq!(projection.current_players.striker_id, Some(PlayerId::new("s")));
        assert_eq!(projection.current_players.bowler_id, Some(PlayerId::new("b1")));
        assert_eq!(projection.bowlers.len(), 1);
    }

    #[test]
    fn recording_requires_live_match() {
        let policy = ScoringPolicy::default();
        let book = Scorebook::create(
            MatchId::new("m1"),
            TeamId::new("a"),
            TeamId::new("b"),
            MatchFormat::t20(),
            &policy,
        )
        .unwrap()
        .scorebook;
        let err = book.record_ball(RecordBall::dot(), ctx(), &policy).unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));
    }

    #[test]
    fn wide_no_ball_is_rejected_before_anything_else() {
        let book = live(MatchFormat::t20());
        let extras = Extras {
            wide: 1,
            no_ball: 1,
            ..Extras::none()
        };
        let err = book
            .record_ball(RecordBall::extras(extras), ctx(), &ScoringPolicy::default())
            .unwrap_err();
        assert_eq!(err, ScoringError::AmbiguousExtras);
    }

    #[test]
    fn wicket_vacates_striker_and_blocks_next_ball() {
        let book = live(MatchFormat::t20());
        let step = bowl(&book, RecordBall::wicket(DismissalType::Bowled, PlayerId::new("s")));
        assert_eq!(step.projection.current_innings.wickets, 1);
        assert_eq!(step.projection.current_players.striker_id, None);
        assert!(step.outcome.events.contains(&NotableEvent::Wicket {
            player_id: PlayerId::new("s"),
            kind: DismissalType::Bowled,
        }));
        let err = step
            .scorebook
            .record_ball(RecordBall::dot(), ctx(), &ScoringPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));
    }

    #[test]
    fn undo_after_wicket_restores_batter() {
        let book = live(MatchFormat::t20());
        let before = book.project(ProjectionOptions::default());
        let step = bowl(&book, RecordBall::wicket(DismissalType::Bowled, PlayerId::new("s")));
        let undone = step
            .scorebook
            .undo_last_ball("wrong button", &ScoringPolicy::default())
            .unwrap();
        assert_eq!(undone.projection.current_innings.wickets, 0);
        assert_eq!(undone.projection.current_players.striker_id, Some(PlayerId::new("s")));
        assert!(!undone.projection.batter(&PlayerId::new("s")).unwrap().is_out);
        assert_eq!(undone.outcome.undone_runs, 0);
        assert_eq!(undone.projection, before);
    }

    #[test]
    fn undo_with_nothing_recorded() {
        let book = live(MatchFormat::t20());
        let err = book.undo_last_ball("nothing", &ScoringPolicy::default()).unwrap_err();
        assert!(matches!(err, ScoringError::NoActionsToUndo { .. }));
    }

    #[test]
    fn selection_after_wicket_is_discarded_by_undo() {
        let policy = ScoringPolicy::default();
        let book = live(MatchFormat::t20());
        let step = bowl(&book, RecordBall::wicket(DismissalType::Caught, PlayerId::new("s")));
        let book = step
            .scorebook
            .select_players(SelectPlayers::striker(PlayerId::new("new")), &policy)
            .unwrap()
            .scorebook;
        let undone = book.undo_last_ball("not out on review", &policy).unwrap();
        assert_eq!(undone.projection.current_players.striker_id, Some(PlayerId::new("s")));
        assert!(undone.projection.batter(&PlayerId::new("new")).is_none());
    }

    #[test]
    fn over_completion_reports_maiden_and_requires_new_bowler() {
        let policy = ScoringPolicy::default();
        let mut book = live(MatchFormat::t20());
        let mut last = None;
        for _ in 0..6 {
            let step = bowl(&book, RecordBall::dot());
            book = step.scorebook;
            last = Some(step.outcome);
        }
        let events = last.unwrap().events;
        assert!(events.contains(&NotableEvent::OverComplete {
            over_number: 0,
            bowler_id: PlayerId::new("b1"),
        }));
        assert!(events.contains(&NotableEvent::MaidenOver {
            bowler_id: PlayerId::new("b1"),
        }));

        let err = book
            .select_players(SelectPlayers::bowler(PlayerId::new("b1")), &policy)
            .unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));

        let relaxed = ScoringPolicy {
            enforce_bowler_rotation: false,
            ..policy
        };
        assert!(book
            .select_players(SelectPlayers::bowler(PlayerId::new("b1")), &relaxed)
            .is_ok());

        let step = book
            .select_players(SelectPlayers::bowler(PlayerId::new("b2")), &policy)
            .unwrap();
        assert_eq!(step.projection.current_players.striker_id, Some(PlayerId::new("n")));
        assert_eq!(step.projection.last_over_bowler, Some(PlayerId::new("b1")));
    }

    #[test]
    fn milestone_reported_once() {
        let mut book = live(MatchFormat::unlimited());
        let mut milestones = Vec::new();
        // 4s keep the strike; switch bowlers each over.
        for ball in 0..26 {
            if ball > 0 && ball % 6 == 0 {
                let bowler = if (ball / 6) % 2 == 0 { "b1" } else { "b2" };
                book = book
                    .select_players(
                        SelectPlayers::bowler(PlayerId::new(bowler)),
                        &ScoringPolicy::default(),
                    )
                    .unwrap()
                    .scorebook;
                // The end-of-over swap put "n" on strike; swap back.
                book = book
                    .select_players(
                        SelectPlayers {
                            striker_id: Some(PlayerId::new("s")),
                            non_striker_id: Some(PlayerId::new("n")),
                            ..SelectPlayers::default()
                        },
                        &ScoringPolicy::default(),
                    )
                    .unwrap()
                    .scorebook;
            }
            let step = bowl(&book, RecordBall::runs(4));
            milestones.extend(
                step.outcome
                    .events
                    .iter()
                    .filter(|event| matches!(event, NotableEvent::Milestone { .. }))
                    .cloned(),
            );
            book = step.scorebook;
        }
        assert_eq!(
            milestones,
            vec![
                NotableEvent::Milestone {
                    player_id: PlayerId::new("s"),
                    runs: 50
                },
                NotableEvent::Milestone {
                    player_id: PlayerId::new("s"),
                    runs: 100
                },
            ]
        );
    }

    #[test]
    fn retired_out_counts_as_wicket_but_not_for_bowler() {
        let policy = ScoringPolicy::default();
        let book = live(MatchFormat::t20());
        let book = bowl(&book, RecordBall::runs(2)).scorebook;
        let step = book
            .retire_batter(PlayerId::new("s"), RetirementKind::Out, &policy)
            .unwrap();
        assert_eq!(step.projection.current_innings.wickets, 1);
        assert_eq!(step.projection.current_players.striker_id, None);
        assert_eq!(step.projection.bowler(&PlayerId::new("b1")).unwrap().wickets, 0);

        let step = book
            .retire_batter(PlayerId::new("n"), RetirementKind::Hurt, &policy)
            .unwrap();
        assert_eq!(step.projection.current_innings.wickets, 0);
        assert!(step.projection.batter(&PlayerId::new("n")).unwrap().retired_hurt);
        assert_eq!(step.projection.current_players.non_striker_id, None);

        let resumed = step
            .scorebook
            .select_players(SelectPlayers::non_striker(PlayerId::new("n")), &policy)
            .unwrap();
        assert!(!resumed.projection.batter(&PlayerId::new("n")).unwrap().retired_hurt);
    }

    #[test]
    fn dismissed_batter_cannot_return() {
        let policy = ScoringPolicy::default();
        let book = live(MatchFormat::t20());
        let book =
            bowl(&book, RecordBall::wicket(DismissalType::Lbw, PlayerId::new("s"))).scorebook;
        let err = book
            .select_players(SelectPlayers::striker(PlayerId::new("s")), &policy)
            .unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));
    }

    #[test]
    fn chase_reaching_target_wins_by_wickets() {
        let policy = ScoringPolicy::default();
        let mut book = live(MatchFormat::limited(1));
        for runs in [6, 6, 0, 0, 0, 1] {
            book = bowl(&book, RecordBall::runs(runs)).scorebook;
        }
        let err = book.record_ball(RecordBall::dot(), ctx(), &policy).unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));

        let book = book.end_innings(InningsClosure::Completed, &policy).unwrap().scorebook;
        let step = book.start_second_innings(&policy).unwrap();
        assert_eq!(step.projection.current_innings.target, Some(14));
        let book = step
            .scorebook
            .select_players(
                SelectPlayers::opening(PlayerId::new("x"), PlayerId::new("y"), PlayerId::new("z")),
                &policy,
            )
            .unwrap()
            .scorebook;
        let book = bowl(&book, RecordBall::runs(6)).scorebook;
        let step = bowl(&book, RecordBall::runs(6));
        assert!(!step.outcome.events.contains(&NotableEvent::TargetReached));
        let step = bowl(&step.scorebook, RecordBall::runs(2));
        assert!(step.outcome.events.contains(&NotableEvent::TargetReached));

        let done = step.scorebook.end_match(None, &policy).unwrap();
        assert_eq!(done.outcome.winner_id, Some(TeamId::new("b")));
        assert_eq!(done.outcome.margin, crate::state_machine::WinMargin::Wickets(10));
        assert_eq!(done.projection.status, MatchStatus::Completed);
        assert_eq!(done.projection.winner_id, Some(TeamId::new("b")));
        assert_eq!(done.projection.innings2.as_ref().unwrap().score.runs, 14);
    }

    #[test]
    fn undo_cannot_reach_into_previous_innings() {
        let policy = ScoringPolicy::default();
        let book = live(MatchFormat::limited(1));
        let book = bowl(&book, RecordBall::runs(1)).scorebook;
        let book = book.end_innings(InningsClosure::Declared, &policy).unwrap().scorebook;
        let book = book.start_second_innings(&policy).unwrap().scorebook;
        let err = book.undo_last_ball("too late", &policy).unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));
    }

    #[test]
    fn import_matches_incremental_recording() {
        let mut book = live(MatchFormat::t20());
        for ball in [
            RecordBall::runs(1),
            RecordBall::extras(Extras::wide(1)),
            RecordBall::runs(4),
            RecordBall::extras(Extras::leg_bye(1)),
        ] {
            book = bowl(&book, ball).scorebook;
        }
        let incremental = book.project(ProjectionOptions::default());

        let mut state = book.state.clone();
        state.selections.clear();
        let imported =
            Scorebook::import(state, book.log.records().to_vec(), &ScoringPolicy::default())
                .unwrap();
        assert_eq!(imported.outcome, 4);
        assert_eq!(imported.projection, incremental);
    }

    #[test]
    fn import_rejects_gaps() {
        let book = live(MatchFormat::t20());
        let step = bowl(&book, RecordBall::dot());
        let mut records = step.scorebook.log.records().to_vec();
        records[0].sequence_number = 2;
        let err = Scorebook::import(book.state, records, &ScoringPolicy::default()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn implausible_runs_are_rejected_before_recording() {
        let book = live(MatchFormat::t20());
        let policy = ScoringPolicy::default();
        for ball in [
            RecordBall::runs(u32::MAX).with_extras(Extras::bye(1)),
            RecordBall::extras(Extras::penalty(rules::MAX_RUNS_PER_COMPONENT + 1)),
        ] {
            let err = book.record_ball(ball, ctx(), &policy).unwrap_err();
            assert!(matches!(err, ScoringError::PreconditionFailed { .. }));
        }
        assert!(book.log.is_empty());
    }

    #[test]
    fn import_rejects_implausible_runs() {
        let book = live(MatchFormat::t20());
        let step = bowl(&book, RecordBall::dot());
        let mut records = step.scorebook.log.records().to_vec();
        records[0].runs_off_bat = u32::MAX;
        records[0].extras = Extras::bye(1);
        let err = Scorebook::import(book.state, records, &ScoringPolicy::default()).unwrap_err();
        assert!(matches!(err, ScoringError::PreconditionFailed { .. }));
    }

    #[test]
    fn replaying_corrupt_runs_saturates() {
        let book = live(MatchFormat::t20());
        let step = bowl(&book, RecordBall::dot());
        let mut records = step.scorebook.log.records().to_vec();
        records[0].runs_off_bat = u32::MAX;
        records[0].extras = Extras::bye(1);
        let projection = projection::project(&book.state, &records, ProjectionOptions::default());
        assert_eq!(projection.current_innings.runs, u32::MAX);
        assert_eq!(projection.bowlers[0].runs_conceded, u32::MAX - 1);
    }

    #[test]
    fn unbounded_overs_limit_still_records() {
        let book = live(MatchFormat::limited(u32::MAX));
        let step = bowl(&book, RecordBall::dot());
        assert_eq!(step.projection.current_innings.balls, 1);
    }
}
