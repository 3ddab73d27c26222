//! # Crease Runtime
//!
//! The imperative shell around `crease-core`.
//!
//! [`ScoringService`] is the only place where I/O happens. Every command
//! follows the same cycle:
//!
//! 1. load the match record from the injected [`MatchStore`]
//! 2. run the pure workflow from `crease-core` against it
//! 3. commit the new state, log and projection together, naming the version
//!    that was loaded
//!
//! If another writer committed in between, step 3 fails and the command
//! surfaces [`ScoringError::InvalidSequencing`]. The service never retries on
//! its own; see [`retry::retry_on_conflict`].
//!
//! ## Example
//!
//! ```ignore
//! use crease_runtime::{ScoringEnvironment, ScoringService};
//! use crease_runtime::config::ScoringConfig;
//!
//! let service =
//!     ScoringService::new(store, ScoringEnvironment::production(), ScoringConfig::from_env());
//! service.create_match(&match_id, home, away, None).await?;
//! service.record_toss(&match_id, home, TossDecision::Bat).await?;
//! service.select_players(&match_id, SelectPlayers::opening(s, n, b)).await?;
//! let output = service.record_ball(&match_id, RecordBall::runs(4)).await?;
//! println!("{}", output.projection.current_innings.runs);
//! ```

use crease_core::environment::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crease_core::state_machine::MatchState;
use crease_core::{
    BallOutcome, InningsClosure, LiveScoreProjection, MatchFormat, MatchId, MatchRecord,
    MatchResult, MatchStore, PlayerId, RecordBall, RecordContext, RetirementKind, ScoringAction,
    ScoringError, ScoringPolicy, Scorebook, SelectPlayers, TeamId, TossDecision, Transition,
    UndoOutcome,
};
use std::sync::Arc;
use std::time::Instant;

pub mod config;
pub mod metrics;
pub mod replay;
pub mod retry;

use crate::config::ScoringConfig;
use crate::metrics::ScoringMetrics;

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, ScoringError>;

/// Injected dependencies for the service.
#[derive(Clone)]
pub struct ScoringEnvironment {
    /// Timestamps for new log records.
    pub clock: Arc<dyn Clock>,
    /// Identifiers for new log records.
    pub ids: Arc<dyn IdGenerator>,
}

impl ScoringEnvironment {
    /// Wall-clock time and random identifiers.
    #[must_use]
    pub fn production() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Custom clock and id generator.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }
}

impl std::fmt::Debug for ScoringEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEnvironment").finish_non_exhaustive()
    }
}

/// What a committed command returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput<T> {
    /// Projection as committed.
    pub projection: LiveScoreProjection,
    /// Command-specific result.
    pub outcome: T,
    /// Store version after the commit.
    pub version: u64,
}

/// Caller-facing scoring operations over a durable store.
#[derive(Clone)]
pub struct ScoringService {
    store: Arc<dyn MatchStore>,
    env: ScoringEnvironment,
    config: ScoringConfig,
    policy: ScoringPolicy,
}

impl std::fmt::Debug for ScoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScoringService {
    /// Wire the service to a store.
    #[must_use]
    pub fn new(store: Arc<dyn MatchStore>, env: ScoringEnvironment, config: ScoringConfig) -> Self {
        let policy = config.policy();
        Self {
            store,
            env,
            config,
            policy,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Load, run `workflow`, commit.
    async fn execute<T, F>(
        &self,
        match_id: &MatchId,
        command: &'static str,
        workflow: F,
    ) -> Result<CommandOutput<T>>
    where
        F: FnOnce(&Scorebook, &ScoringPolicy) -> Result<Transition<T>>,
    {
        let record = self.store.load(match_id.clone()).await?;
        let expected_version = record.version;
        let book = Scorebook::new(record.state, record.log);

        let started = Instant::now();
        let transition = workflow(&book, &self.policy).map_err(|err| {
            ScoringMetrics::record_rejection(command, err.kind());
            tracing::warn!(command, error = %err, "Command rejected");
            err
        })?;
        ScoringMetrics::record_projection(started.elapsed());
        tracing::debug!(
            command,
            elapsed_us = started.elapsed().as_micros(),
            actions = transition.scorebook.log.len(),
            "Projection recomputed"
        );

        let Transition {
            scorebook,
            projection,
            outcome,
        } = transition;
        let version = self
            .store
            .commit(MatchRecord {
                state: scorebook.state,
                log: scorebook.log,
                projection: projection.clone(),
                version: expected_version,
            })
            .await
            .map_err(|err| {
                let err = ScoringError::from(err);
                if err.is_conflict() {
                    ScoringMetrics::record_conflict();
                    tracing::warn!(command, expected_version, "Commit lost a version race");
                }
                err
            })?;

        Ok(CommandOutput {
            projection,
            outcome,
            version,
        })
    }

    async fn transition(
        &self,
        match_id: &MatchId,
        command: &'static str,
        workflow: impl FnOnce(&Scorebook, &ScoringPolicy) -> Result<Transition<()>>,
    ) -> Result<LiveScoreProjection> {
        let output = self.execute(match_id, command, workflow).await?;
        ScoringMetrics::record_transition(command);
        tracing::info!(command, status = %output.projection.status, "Match updated");
        Ok(output.projection)
    }

    /// `createMatch`: schedule a match. Uses the configured default format
    /// when `format` is `None`.
    ///
    /// # Errors
    ///
    /// `MatchAlreadyExists` if the id is taken; `PreconditionFailed` if a side
    /// is drawn against itself.
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn create_match(
        &self,
        match_id: &MatchId,
        home_team_id: TeamId,
        away_team_id: TeamId,
        format: Option<MatchFormat>,
    ) -> Result<LiveScoreProjection> {
        let format = format.unwrap_or_else(|| self.config.default_format());
        let transition = Scorebook::create(
            match_id.clone(),
            home_team_id,
            away_team_id,
            format,
            &self.policy,
        )?;
        self.store
            .create(MatchRecord {
                state: transition.scorebook.state,
                log: transition.scorebook.log,
                projection: transition.projection.clone(),
                version: 0,
            })
            .await?;
        ScoringMetrics::record_transition("create_match");
        tracing::info!(overs = ?format.overs, "Match created");
        Ok(transition.projection)
    }

    /// Bulk-load a legacy match and materialise its projection in one pass.
    ///
    /// # Errors
    ///
    /// `MatchAlreadyExists` if the id is taken; see
    /// [`Scorebook::import`] for validation failures.
    #[tracing::instrument(skip_all, fields(match_id = %state.match_id, actions = actions.len()))]
    pub async fn import_match(
        &self,
        state: MatchState,
        actions: Vec<ScoringAction>,
    ) -> Result<CommandOutput<usize>> {
        let transition = Scorebook::import(state, actions, &self.policy)?;
        let version = self
            .store
            .create(MatchRecord {
                state: transition.scorebook.state,
                log: transition.scorebook.log,
                projection: transition.projection.clone(),
                version: 0,
            })
            .await?;
        tracing::info!(imported = transition.outcome, "Match imported");
        Ok(CommandOutput {
            projection: transition.projection,
            outcome: transition.outcome,
            version,
        })
    }

    /// `recordToss`.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless scheduled; `PreconditionFailed` for a
    /// team not in the match.
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn record_toss(
        &self,
        match_id: &MatchId,
        winner_id: TeamId,
        decision: TossDecision,
    ) -> Result<LiveScoreProjection> {
        self.transition(match_id, "record_toss", |book, policy| {
            book.record_toss(winner_id, decision, policy)
        })
        .await
    }

    /// `selectPlayers`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::select_players`].
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn select_players(
        &self,
        match_id: &MatchId,
        selection: SelectPlayers,
    ) -> Result<LiveScoreProjection> {
        self.transition(match_id, "select_players", |book, policy| {
            book.select_players(selection, policy)
        })
        .await
    }

    /// `recordBall`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::record_ball`]; `InvalidSequencing` if another writer
    /// committed first.
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn record_ball(
        &self,
        match_id: &MatchId,
        ball: RecordBall,
    ) -> Result<CommandOutput<BallOutcome>> {
        let context = RecordContext {
            action_id: self.env.ids.next_action_id(),
            now: self.env.clock.now(),
        };
        let output = self
            .execute(match_id, "record_ball", |book, policy| {
                book.record_ball(ball, context, policy)
            })
            .await?;
        ScoringMetrics::record_ball();
        tracing::info!(
            sequence = output.outcome.action.sequence_number,
            runs = output.projection.current_innings.runs,
            wickets = output.projection.current_innings.wickets,
            overs = %output.projection.current_innings.overs_display(),
            events = output.outcome.events.len(),
            "Ball recorded"
        );
        Ok(output)
    }

    /// `undoLastBall`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::undo_last_ball`].
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn undo_last_ball(
        &self,
        match_id: &MatchId,
        reason: &str,
    ) -> Result<CommandOutput<UndoOutcome>> {
        let output = self
            .execute(match_id, "undo_last_ball", |book, policy| {
                book.undo_last_ball(reason, policy)
            })
            .await?;
        ScoringMetrics::record_undo();
        tracing::info!(
            sequence = output.outcome.voided_action.sequence_number,
            undone_runs = output.outcome.undone_runs,
            "Ball undone"
        );
        Ok(output)
    }

    /// `retireBatter`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::retire_batter`].
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn retire_batter(
        &self,
        match_id: &MatchId,
        player_id: PlayerId,
        kind: RetirementKind,
    ) -> Result<LiveScoreProjection> {
        self.transition(match_id, "retire_batter", |book, policy| {
            book.retire_batter(player_id, kind, policy)
        })
        .await
    }

    /// `endInnings`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::end_innings`].
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn end_innings(
        &self,
        match_id: &MatchId,
        closure: InningsClosure,
    ) -> Result<LiveScoreProjection> {
        self.transition(match_id, "end_innings", |book, policy| book.end_innings(closure, policy))
            .await
    }

    /// `startSecondInnings`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::start_second_innings`].
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn start_second_innings(&self, match_id: &MatchId) -> Result<LiveScoreProjection> {
        self.transition(match_id, "start_second_innings", |book, policy| {
            book.start_second_innings(policy)
        })
        .await
    }

    /// `endMatch`.
    ///
    /// # Errors
    ///
    /// See [`Scorebook::end_match`].
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn end_match(
        &self,
        match_id: &MatchId,
        manual: Option<MatchResult>,
    ) -> Result<CommandOutput<MatchResult>> {
        let output = self
            .execute(match_id, "end_match", |book, policy| book.end_match(manual, policy))
            .await?;
        ScoringMetrics::record_transition("end_match");
        tracing::info!(
            winner = ?output.outcome.winner_id,
            margin = %output.outcome.margin,
            "Match completed"
        );
        Ok(output)
    }

    /// Call the match off.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` if already completed or cancelled.
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn cancel(&self, match_id: &MatchId) -> Result<LiveScoreProjection> {
        self.transition(match_id, "cancel", |book, policy| book.cancel(policy))
            .await
    }

    /// Suspend the match.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` if terminal or already postponed.
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn postpone(&self, match_id: &MatchId) -> Result<LiveScoreProjection> {
        self.transition(match_id, "postpone", |book, policy| book.postpone(policy))
            .await
    }

    /// Resume a postponed match.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless postponed.
    #[tracing::instrument(skip_all, fields(match_id = %match_id))]
    pub async fn resume(&self, match_id: &MatchId) -> Result<LiveScoreProjection> {
        self.transition(match_id, "resume", |book, policy| book.resume(policy))
            .await
    }

    /// The last committed projection. Served without recomputation.
    ///
    /// # Errors
    ///
    /// `MatchNotFound` for an unknown match.
    pub async fn projection(&self, match_id: &MatchId) -> Result<LiveScoreProjection> {
        Ok(self.store.load(match_id.clone()).await?.projection)
    }

    /// Every record in the match's log, voided ones included.
    ///
    /// # Errors
    ///
    /// `MatchNotFound` for an unknown match.
    pub async fn actions(&self, match_id: &MatchId) -> Result<Vec<ScoringAction>> {
        Ok(self.store.load(match_id.clone()).await?.log.records().to_vec())
    }

    /// Recompute the projection from the stored log and compare it with the
    /// stored one. `true` means the cache is sound.
    ///
    /// # Errors
    ///
    /// `MatchNotFound` for an unknown match.
    pub async fn verify_projection(&self, match_id: &MatchId) -> Result<bool> {
        let record = self.store.load(match_id.clone()).await?;
        let recomputed = Scorebook::new(record.state, record.log).project(self.policy.projection);
        let sound = recomputed == record.projection;
        if !sound {
            tracing::error!(match_id = %match_id, "Stored projection diverges from the action log");
        }
        Ok(sound)
    }
}
