//! # Crease Testing
//!
//! Testing utilities for the scoring engine.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//! - An in-memory, version-checked [`MatchStore`](crease_core::MatchStore)
//! - A driver that plays deliveries and fills vacant slots automatically
//! - proptest strategies for deliveries
//!
//! ## Example
//!
//! ```ignore
//! use crease_testing::helpers::test_service;
//!
//! #[tokio::test]
//! async fn four_runs() {
//!     let (service, _store) = test_service();
//!     // create, toss, select, record ...
//! }
//! ```

use chrono::{DateTime, Utc};
use crease_core::environment::{Clock, IdGenerator};

pub mod helpers;
pub mod properties;
pub mod store;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use crease_core::ids::ActionId;
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use crease_testing::mocks::FixedClock;
    /// use crease_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Action ids 1, 2, 3, ... encoded as UUIDs.
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start from 1.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }

        /// Ids handed out so far.
        #[must_use]
        pub fn issued(&self) -> u64 {
            self.next.load(Ordering::SeqCst)
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_action_id(&self) -> ActionId {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            ActionId::from_uuid(Uuid::from_u128(u128::from(n)))
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
pub use store::InMemoryMatchStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn sequential_ids_are_predictable() {
        let ids = SequentialIdGenerator::new();
        let first = ids.next_action_id();
        let second = ids.next_action_id();
        assert_ne!(first, second);
        assert_eq!(first.as_uuid().as_u128(), 1);
        assert_eq!(second.as_uuid().as_u128(), 2);
        assert_eq!(ids.issued(), 2);
    }
}
