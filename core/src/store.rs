//! Durable storage for match records.
//!
//! A [`MatchStore`] holds, per match, the match state, the action log and the
//! last projection, and replaces all three together. Each stored record
//! carries a version; a commit names the version it was derived from and is
//! rejected if another writer got there first. That check is what serialises
//! two scorers working the same match.
//!
//! # Implementations
//!
//! - `InMemoryMatchStore` (in `crease-testing`): `HashMap` behind a lock, for
//!   tests and the replay tool.
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` rather than using `async fn`, so
//! the trait can be used as `Arc<dyn MatchStore>`.

use crate::ids::MatchId;
use crate::log::ActionLog;
use crate::projection::LiveScoreProjection;
use crate::state_machine::MatchState;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors raised by a [`MatchStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the record moved on since it was loaded.
    #[error(
        "Concurrency conflict on match {match_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        /// Match that was being written.
        match_id: MatchId,
        /// Version the writer loaded.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// No record for this match.
    #[error("Match not found: {0}")]
    NotFound(MatchId),

    /// `create` was called for a match that already has a record.
    #[error("Match already exists: {0}")]
    AlreadyExists(MatchId),

    /// The backend failed (connection, I/O, poisoned lock).
    #[error("Backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Everything stored for one match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    /// Lifecycle, sides, selections and result.
    pub state: MatchState,
    /// Every delivery recorded, voided ones included.
    pub log: ActionLog,
    /// Projection computed from `state` and `log` at the last commit.
    pub projection: LiveScoreProjection,
    /// Incremented on every successful commit; 1 after `create`.
    pub version: u64,
}

impl MatchRecord {
    /// Match this record belongs to.
    #[must_use]
    pub const fn match_id(&self) -> &MatchId {
        &self.state.match_id
    }
}

/// Persistence for match records with optimistic concurrency.
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// request the service handles.
pub trait MatchStore: Send + Sync {
    /// Store a brand-new record at version 1.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: a record with this match id is present
    /// - `Backend`: the store could not be written
    fn create(
        &self,
        record: MatchRecord,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;

    /// Load the latest record for a match.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no record for this match
    /// - `Backend`/`Serialization`: the record could not be read
    fn load(
        &self,
        match_id: MatchId,
    ) -> Pin<Box<dyn Future<Output = Result<MatchRecord, StoreError>> + Send + '_>>;

    /// Replace the stored record atomically.
    ///
    /// `record.version` must equal the currently stored version; on success
    /// the stored version becomes `record.version + 1`, which is returned.
    /// Either the state, the log and the projection are all replaced or none is.
    ///
    /// # Errors
    ///
    /// - `VersionConflict`: the stored version is not `record.version`
    /// - `NotFound`: no record for this match
    /// - `Backend`: the store could not be written
    fn commit(
        &self,
        record: MatchRecord,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;
}
