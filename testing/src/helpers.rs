//! Fixtures for service and workflow tests.
//!
//! [`MatchDriver`] plays deliveries against a [`Scorebook`] the way a
//! scorer would, sending in the next batter after a wicket and alternating
//! two bowlers at each end of over, so property tests can feed it arbitrary
//! deliveries without tracking who is at the crease.

#![allow(clippy::expect_used)] // Fixtures fail loudly on setup errors

use crate::mocks::{SequentialIdGenerator, test_clock};
use crate::store::InMemoryMatchStore;
use crease_core::environment::{Clock, IdGenerator};
use crease_core::{
    BallOutcome, LiveScoreProjection, MatchFormat, MatchId, PlayerId, RecordBall, RecordContext,
    ScoringError, ScoringPolicy, Scorebook, SelectPlayers, TeamId, TossDecision, rules,
};
use crease_runtime::config::ScoringConfig;
use crease_runtime::{ScoringEnvironment, ScoringService};
use std::sync::Arc;

/// Home side in fixtures; bats first.
pub const HOME: &str = "home";
/// Away side in fixtures.
pub const AWAY: &str = "away";

/// Environment with the fixed test clock and sequential action ids.
#[must_use]
pub fn test_environment() -> ScoringEnvironment {
    ScoringEnvironment::new(Arc::new(test_clock()), Arc::new(SequentialIdGenerator::new()))
}

/// A service over a fresh in-memory store with default configuration.
///
/// The store is returned as well so tests can inspect versions or inject a
/// competing write.
#[must_use]
pub fn test_service() -> (ScoringService, Arc<InMemoryMatchStore>) {
    test_service_with(ScoringConfig::default())
}

/// Like [`test_service`] with a custom configuration.
#[must_use]
pub fn test_service_with(config: ScoringConfig) -> (ScoringService, Arc<InMemoryMatchStore>) {
    let store = Arc::new(InMemoryMatchStore::new());
    let service = ScoringService::new(store.clone(), test_environment(), config);
    (service, store)
}

/// Batter `n` (1-based) of `team`.
#[must_use]
pub fn batter(team: &TeamId, n: u32) -> PlayerId {
    PlayerId::new(format!("{team}-bat-{n}"))
}

/// Bowler `n` (1-based) of `team`.
#[must_use]
pub fn bowler(team: &TeamId, n: u32) -> PlayerId {
    PlayerId::new(format!("{team}-bowl-{n}"))
}

/// A match between [`HOME`] and [`AWAY`] with the home side batting and its
/// openers and the first away bowler in place.
///
/// # Panics
///
/// Panics if any setup step is rejected.
#[must_use]
pub fn live_scorebook(match_id: &str, format: MatchFormat, policy: &ScoringPolicy) -> Scorebook {
    let home = TeamId::new(HOME);
    let away = TeamId::new(AWAY);
    let book = Scorebook::create(MatchId::new(match_id), home.clone(), away.clone(), format, policy)
        .expect("create match")
        .scorebook;
    let book = book
        .record_toss(home.clone(), TossDecision::Bat, policy)
        .expect("record toss")
        .scorebook;
    book.select_players(
        SelectPlayers::opening(batter(&home, 1), batter(&home, 2), bowler(&away, 1)),
        policy,
    )
    .expect("select openers")
    .scorebook
}

/// Plays deliveries and fills empty slots between them.
#[derive(Debug)]
pub struct MatchDriver {
    book: Scorebook,
    policy: ScoringPolicy,
    ids: SequentialIdGenerator,
    next_batter: u32,
}

impl MatchDriver {
    /// Drive `book`. Batters already used are assumed to be numbered from 1
    /// up to the number of batters on the card.
    #[must_use]
    pub fn new(book: Scorebook, policy: ScoringPolicy) -> Self {
        let batsmen = book.project(policy.projection).batsmen.len();
        let next_batter = u32::try_from(batsmen).unwrap_or(u32::MAX).saturating_add(1);
        Self {
            book,
            policy,
            ids: SequentialIdGenerator::new(),
            next_batter,
        }
    }

    /// A T20 match ready for its first ball.
    #[must_use]
    pub fn t20(match_id: &str) -> Self {
        let policy = ScoringPolicy::default();
        Self::new(live_scorebook(match_id, MatchFormat::t20(), &policy), policy)
    }

    /// The scorebook as played so far.
    #[must_use]
    pub const fn scorebook(&self) -> &Scorebook {
        &self.book
    }

    /// Hand back the scorebook.
    #[must_use]
    pub fn into_scorebook(self) -> Scorebook {
        self.book
    }

    /// Current projection.
    #[must_use]
    pub fn projection(&self) -> LiveScoreProjection {
        self.book.project(self.policy.projection)
    }

    /// Whether the current innings can take another delivery.
    #[must_use]
    pub fn can_bowl(&self) -> bool {
        let projection = self.projection();
        let score = projection.current_innings;
        projection.status.is_live()
            && !rules::innings_exhausted(
                score.wickets,
                score.legal_balls(),
                self.book.state.format.overs,
            )
            && score.runs_required() != Some(0)
    }

    /// Send in a batter for each empty end and a bowler if the over needs one.
    ///
    /// # Errors
    ///
    /// Propagates a rejected selection.
    pub fn fill_vacancies(&mut self) -> Result<(), ScoringError> {
        let projection = self.projection();
        let players = &projection.current_players;
        let (Some(batting), Some(bowling)) =
            (&projection.batting_team_id, &projection.bowling_team_id)
        else {
            return Ok(());
        };

        let mut selection = SelectPlayers::default();
        if players.striker_id.is_none() {
            selection.striker_id = Some(self.take_batter(batting));
        }
        if players.non_striker_id.is_none() {
            selection.non_striker_id = Some(self.take_batter(batting));
        }
        if players.bowler_id.is_none() {
            let first = bowler(bowling, 1);
            let next = if projection.last_over_bowler.as_ref() == Some(&first) {
                bowler(bowling, 2)
            } else {
                first
            };
            selection.bowler_id = Some(next);
        }
        if selection == SelectPlayers::default() {
            return Ok(());
        }
        self.book = self.book.select_players(selection, &self.policy)?.scorebook;
        Ok(())
    }

    /// Fill vacancies, then record `ball`.
    ///
    /// # Errors
    ///
    /// Propagates a rejected selection or delivery.
    pub fn play(&mut self, ball: RecordBall) -> Result<BallOutcome, ScoringError> {
        self.fill_vacancies()?;
        let context = RecordContext {
            action_id: self.ids.next_action_id(),
            now: test_clock().now(),
        };
        let transition = self.book.record_ball(ball, context, &self.policy)?;
        self.book = transition.scorebook;
        Ok(transition.outcome)
    }

    /// Play `count` dot balls.
    ///
    /// # Errors
    ///
    /// Stops at the first rejected delivery.
    pub fn dots(&mut self, count: usize) -> Result<(), ScoringError> {
        for _ in 0..count {
            self.play(RecordBall::dot())?;
        }
        Ok(())
    }

    /// Undo the last delivery.
    ///
    /// # Errors
    ///
    /// Propagates the workflow's rejection.
    pub fn undo(&mut self, reason: &str) -> Result<(), ScoringError> {
        self.book = self.book.undo_last_ball(reason, &self.policy)?.scorebook;
        Ok(())
    }

    fn take_batter(&mut self, team: &TeamId) -> PlayerId {
        let player = batter(team, self.next_batter);
        self.next_batter += 1;
        player
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crease_core::DismissalType;

    #[test]
    fn driver_brings_in_the_next_batter() {
        let mut driver = MatchDriver::t20("driver-1");
        let striker = driver.projection().current_players.striker_id.unwrap();
        driver.play(RecordBall::wicket(DismissalType::Bowled, striker)).unwrap();
        assert!(driver.projection().current_players.striker_id.is_none());

        driver.play(RecordBall::runs(1)).unwrap();
        let projection = driver.projection();
        assert_eq!(projection.current_innings.runs, 1);
        assert_eq!(projection.batsmen.len(), 3);
        assert_eq!(
            projection.current_players.non_striker_id,
            Some(batter(&TeamId::new(HOME), 3))
        );
    }

    #[test]
    fn driver_alternates_bowlers() {
        let mut driver = MatchDriver::t20("driver-2");
        driver.dots(12).unwrap();
        let projection = driver.projection();
        assert_eq!(projection.bowlers.len(), 2);
        assert_eq!(projection.current_innings.overs, 2);
    }

    #[test]
    fn driver_stops_when_the_innings_is_over() {
        let policy = ScoringPolicy::default();
        let book = live_scorebook("driver-3", MatchFormat::limited(1), &policy);
        let mut driver = MatchDriver::new(book, policy);
        driver.dots(6).unwrap();
        assert!(!driver.can_bowl());
        assert!(driver.play(RecordBall::dot()).is_err());
    }
}
