//! Configuration management for the scoring service.
//!
//! Loads configuration from environment variables with sensible defaults.

use crease_core::projection::ProjectionOptions;
use crease_core::{MatchFormat, ScoringPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Scoring service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Overs per innings for matches created without an explicit format
    pub default_match_overs: u32,
    /// Reject a new over given to the previous over's bowler
    pub enforce_bowler_rotation: bool,
    /// Recent balls kept in the projection's history (0 keeps all)
    pub ball_history_limit: usize,
    /// Retries for a commit that lost a version race
    pub commit_max_retries: usize,
    /// Initial delay before retrying a conflicted commit, in milliseconds
    pub commit_retry_delay_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_match_overs: 20,
            enforce_bowler_rotation: true,
            ball_history_limit: 0,
            commit_max_retries: 3,
            commit_retry_delay_ms: 25,
        }
    }
}

impl ScoringConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CREASE_DEFAULT_MATCH_OVERS` | 20 |
    /// | `CREASE_ENFORCE_BOWLER_ROTATION` | true |
    /// | `CREASE_BALL_HISTORY_LIMIT` | 0 |
    /// | `CREASE_COMMIT_MAX_RETRIES` | 3 |
    /// | `CREASE_COMMIT_RETRY_DELAY_MS` | 25 |
    ///
    /// Unset or unparsable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            default_match_overs: lookup("CREASE_DEFAULT_MATCH_OVERS")
                .and_then(|s| s.parse().ok())
                .filter(|overs| *overs > 0)
                .unwrap_or(defaults.default_match_overs),
            enforce_bowler_rotation: lookup("CREASE_ENFORCE_BOWLER_ROTATION")
                .and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
                .unwrap_or(defaults.enforce_bowler_rotation),
            ball_history_limit: lookup("CREASE_BALL_HISTORY_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ball_history_limit),
            commit_max_retries: lookup("CREASE_COMMIT_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.commit_max_retries),
            commit_retry_delay_ms: lookup("CREASE_COMMIT_RETRY_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.commit_retry_delay_ms),
        }
    }

    /// Workflow policy derived from this configuration.
    #[must_use]
    pub const fn policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            enforce_bowler_rotation: self.enforce_bowler_rotation,
            projection: ProjectionOptions {
                ball_history_limit: self.ball_history_limit,
            },
        }
    }

    /// Format for matches created without one.
    #[must_use]
    pub const fn default_format(&self) -> MatchFormat {
        MatchFormat::limited(self.default_match_overs)
    }

    /// Retry policy for callers that want to reissue conflicted commands.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.commit_max_retries)
            .initial_delay(Duration::from_millis(self.commit_retry_delay_ms))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ScoringConfig::from_lookup(|_| None);
        assert_eq!(config, ScoringConfig::default());
        assert_eq!(config.default_format(), MatchFormat::t20());
        assert!(config.policy().enforce_bowler_rotation);
    }

    #[test]
    fn values_are_parsed() {
        let config = ScoringConfig::from_lookup(lookup(&[
            ("CREASE_DEFAULT_MATCH_OVERS", "50"),
            ("CREASE_ENFORCE_BOWLER_ROTATION", "FALSE"),
            ("CREASE_BALL_HISTORY_LIMIT", "12"),
            ("CREASE_COMMIT_MAX_RETRIES", "7"),
        ]));
        assert_eq!(config.default_match_overs, 50);
        assert!(!config.enforce_bowler_rotation);
        assert_eq!(config.policy().projection.ball_history_limit, 12);
        assert_eq!(config.retry_policy().max_retries, 7);
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let config = ScoringConfig::from_lookup(lookup(&[
            ("CREASE_DEFAULT_MATCH_OVERS", "0"),
            ("CREASE_BALL_HISTORY_LIMIT", "lots"),
        ]));
        assert_eq!(config.default_match_overs, 20);
        assert_eq!(config.ball_history_limit, 0);
    }
}
