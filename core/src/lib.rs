//! # Crease Core
//!
//! The functional core of a live ball-by-ball cricket scoring engine.
//!
//! Every delivery is a [`ScoringAction`] appended to a per-match [`ActionLog`].
//! The live scorecard ([`LiveScoreProjection`]) is never edited; it is derived
//! by [`projection::project`] from the match record and the non-voided
//! actions, so recording a ball, undoing one, and bulk-importing a legacy
//! match all produce the same answer for the same deliveries.
//!
//! ## Layout
//!
//! - [`ids`]: opaque identifiers
//! - [`action`]: the delivery record and its parts
//! - [`log`]: the append-mostly action log
//! - [`rules`]: strike rotation, overs, eligibility, milestones
//! - [`state_machine`]: match lifecycle and innings sides
//! - [`projection`]: the projection engine
//! - [`workflow`]: the caller-facing verbs as pure transitions
//! - [`store`]: the boundary to durable storage
//! - [`environment`]: injected clock and id generator
//!
//! ## Example
//!
//! ```
//! use crease_core::{
//!     MatchFormat, MatchId, PlayerId, RecordBall, RecordContext, Scorebook, ScoringPolicy,
//!     SelectPlayers, TeamId, TossDecision,
//! };
//! use crease_core::ids::ActionId;
//!
//! # fn main() -> crease_core::Result<()> {
//! let policy = ScoringPolicy::default();
//! let book = Scorebook::create(
//!     MatchId::new("final"),
//!     TeamId::new("north"),
//!     TeamId::new("south"),
//!     MatchFormat::t20(),
//!     &policy,
//! )?
//! .scorebook;
//! let book = book.record_toss(TeamId::new("north"), TossDecision::Bat, &policy)?.scorebook;
//! let book = book
//!     .select_players(
//!         SelectPlayers::opening(
//!             PlayerId::new("opener-1"),
//!             PlayerId::new("opener-2"),
//!             PlayerId::new("quick"),
//!         ),
//!         &policy,
//!     )?
//!     .scorebook;
//!
//! let context = RecordContext { action_id: ActionId::new(), now: chrono::Utc::now() };
//! let step = book.record_ball(RecordBall::runs(4), context, &policy)?;
//! assert_eq!(step.projection.current_innings.runs, 4);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod error;
pub mod ids;
pub mod log;
pub mod projection;
pub mod rules;
pub mod state_machine;
pub mod store;
pub mod workflow;

pub use action::{
    ActionSource, BowlingAngle, DismissalType, Extras, ScoringAction, ShotCoordinates, Wicket,
};
pub use error::{Result, ScoringError};
pub use ids::{ActionId, MatchId, PlayerId, TeamId};
pub use log::{ActionLog, VoidedAction};
pub use projection::{
    BallSummary, BatterFigures, BowlerFigures, CurrentPlayers, ExtrasTally, FallOfWicket,
    InningsScore, InningsSummary, LiveScoreProjection, ProjectionOptions,
};
pub use state_machine::{
    InningsClosure, MatchFormat, MatchResult, MatchState, MatchStatus, RetirementKind, TossDecision,
    WinMargin,
};
pub use store::{MatchRecord, MatchStore, StoreError};
pub use workflow::{
    BallOutcome, NotableEvent, RecordBall, RecordContext, Scorebook, ScoringPolicy, SelectPlayers,
    Transition, UndoOutcome,
};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Injected dependencies.
///
/// The workflows never read the system clock or generate identifiers
/// themselves; the runtime asks these traits and passes the answers in.
pub mod environment {
    use crate::ids::ActionId;
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of identifiers for new log records.
    pub trait IdGenerator: Send + Sync {
        /// A fresh, never-reused action id.
        fn next_action_id(&self) -> ActionId;
    }

    /// Random (v4) identifiers.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct UuidGenerator;

    impl IdGenerator for UuidGenerator {
        fn next_action_id(&self) -> ActionId {
            ActionId::new()
        }
    }
}
