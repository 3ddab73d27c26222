//! Stateless cricket bookkeeping: strike rotation, over boundaries, bowler
//! eligibility, milestones and the derived rate statistics.
//!
//! The projection engine and the workflows call into these helpers; nothing
//! here holds state or touches the log.

use crate::action::{Extras, ScoringAction};
use crate::error::ScoringError;
use crate::ids::PlayerId;

/// Legal deliveries in an over.
pub const BALLS_PER_OVER: u32 = 6;

/// Wickets that bring an innings to an end.
pub const WICKETS_PER_INNINGS: u32 = 10;

/// Batting milestones are reported at every multiple of this.
pub const MILESTONE_STEP: u32 = 50;

/// Upper bound on runs off the bat, and on each extras component, of a single
/// delivery. Overthrows to the boundary top out well below this.
pub const MAX_RUNS_PER_COMPONENT: u32 = 30;

/// Whether the batters crossed an odd number of times on this delivery.
///
/// Runs off the bat and byes/leg-byes count alike. On a wide or no-ball only
/// the runs beyond the one-run penalty count, so the penalty itself never
/// changes ends.
#[must_use]
pub const fn rotates_strike(action: &ScoringAction) -> bool {
    action.runs_between_wickets() % 2 == 1
}

/// Whether the legal ball that brought the innings to `legal_balls` ended an over.
#[must_use]
pub const fn completes_over(legal_balls: u32) -> bool {
    legal_balls > 0 && legal_balls % BALLS_PER_OVER == 0
}

/// Split a legal-ball count into completed overs and balls of the current over.
#[must_use]
pub const fn overs_and_balls(legal_balls: u32) -> (u32, u32) {
    (legal_balls / BALLS_PER_OVER, legal_balls % BALLS_PER_OVER)
}

/// Scorecard notation for a legal-ball count, e.g. `"3.2"`.
#[must_use]
pub fn overs_display(legal_balls: u32) -> String {
    let (overs, balls) = overs_and_balls(legal_balls);
    format!("{overs}.{balls}")
}

/// Runs per hundred balls faced; zero before the first ball.
#[must_use]
pub fn strike_rate(runs: u32, balls_faced: u32) -> f64 {
    if balls_faced == 0 {
        return 0.0;
    }
    f64::from(runs) * 100.0 / f64::from(balls_faced)
}

/// Runs conceded per six legal balls; zero before the first legal ball.
#[must_use]
pub fn economy(runs_conceded: u32, legal_balls: u32) -> f64 {
    if legal_balls == 0 {
        return 0.0;
    }
    f64::from(runs_conceded) * f64::from(BALLS_PER_OVER) / f64::from(legal_balls)
}

/// Milestones passed when a batter's score moves from `before` to `after`.
///
/// Each multiple of [`MILESTONE_STEP`] is reported once, on the ball that
/// first reaches it.
#[must_use]
pub fn milestones_crossed(before: u32, after: u32) -> Vec<u32> {
    if after <= before {
        return Vec::new();
    }
    let Some(first) = (before / MILESTONE_STEP + 1).checked_mul(MILESTONE_STEP) else {
        return Vec::new();
    };
    (first..=after).step_by(MILESTONE_STEP as usize).collect()
}

/// Reject a bowler who bowled the over that just finished.
///
/// Only applies at an over boundary; a mid-over change (injury, suspension)
/// is always allowed.
///
/// # Errors
///
/// Returns [`ScoringError::PreconditionFailed`] when `candidate` bowled the
/// previous over and a new over is about to start.
pub fn check_bowler_eligible(
    candidate: &PlayerId,
    last_over_bowler: Option<&PlayerId>,
    balls_in_current_over: u32,
) -> Result<(), ScoringError> {
    if balls_in_current_over == 0 && last_over_bowler == Some(candidate) {
        return Err(ScoringError::precondition(format!(
            "{candidate} bowled the previous over and cannot bowl consecutive overs"
        )));
    }
    Ok(())
}

/// Whether an innings can take no further deliveries.
#[must_use]
pub fn innings_exhausted(wickets: u32, legal_balls: u32, overs_limit: Option<u32>) -> bool {
    wickets >= WICKETS_PER_INNINGS
        || overs_limit.is_some_and(|limit| legal_balls >= limit.saturating_mul(BALLS_PER_OVER))
}

/// Reject a delivery whose runs no real ball could produce.
///
/// # Errors
///
/// Returns [`ScoringError::PreconditionFailed`] when the runs off the bat or
/// any extras component exceeds [`MAX_RUNS_PER_COMPONENT`].
pub fn check_delivery_runs(runs_off_bat: u32, extras: &Extras) -> Result<(), ScoringError> {
    let components = [
        ("runs off the bat", runs_off_bat),
        ("wide runs", extras.wide),
        ("no-ball runs", extras.no_ball),
        ("byes", extras.bye),
        ("leg-byes", extras.leg_bye),
        ("penalty runs", extras.penalty),
    ];
    match components.iter().find(|(_, runs)| *runs > MAX_RUNS_PER_COMPONENT) {
        Some((label, runs)) => Err(ScoringError::precondition(format!(
            "{runs} {label} on one delivery exceeds the limit of {MAX_RUNS_PER_COMPONENT}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionSource, Extras};
    use crate::ids::{ActionId, MatchId};
    use chrono::Utc;

    fn ball(runs_off_bat: u32, extras: Extras) -> ScoringAction {
        let now = Utc::now();
        ScoringAction {
            id: ActionId::new(),
            match_id: MatchId::new("m"),
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
    fn odd_runs_rotate_even_runs_do_not() {
        assert!(rotates_strike(&ball(1, Extras::none())));
        assert!(!rotates_strike(&ball(2, Extras::none())));
        assert!(rotates_strike(&ball(3, Extras::none())));
        assert!(!rotates_strike(&ball(4, Extras::none())));
    }

    #[test]
    fn odd_byes_rotate() {
        assert!(rotates_strike(&ball(0, Extras::bye(1))));
        assert!(rotates_strike(&ball(0, Extras::leg_bye(3))));
        assert!(!rotates_strike(&ball(0, Extras::bye(4))));
    }

    #[test]
    fn plain_wide_never_rotates() {
        assert!(!rotates_strike(&ball(0, Extras::wide(1))));
        assert!(rotates_strike(&ball(0, Extras::wide(2))));
        assert!(!rotates_strike(&ball(0, Extras::no_ball(1))));
        assert!(rotates_strike(&ball(1, Extras::no_ball(1))));
    }

    #[test]
    fn over_boundaries() {
        assert!(!completes_over(0));
        assert!(!completes_over(5));
        assert!(completes_over(6));
        assert!(completes_over(12));
        assert_eq!(overs_and_balls(20), (3, 2));
        assert_eq!(overs_display(20), "3.2");
    }

    #[test]
    fn rates_are_zero_without_balls() {
        assert!(strike_rate(10, 0).abs() < f64::EPSILON);
        assert!(economy(10, 0).abs() < f64::EPSILON);
        assert!((strike_rate(50, 25) - 200.0).abs() < f64::EPSILON);
        assert!((economy(12, 12) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn milestones_fire_once_per_fifty() {
        assert_eq!(milestones_crossed(48, 52), vec![50]);
        assert!(milestones_crossed(50, 54).is_empty());
        assert_eq!(milestones_crossed(96, 102), vec![100]);
        assert_eq!(milestones_crossed(0, 50), vec![50]);
        assert!(milestones_crossed(10, 10).is_empty());
        assert_eq!(milestones_crossed(145, 151), vec![150]);
    }

    #[test]
    fn previous_over_bowler_is_ineligible_only_at_over_start() {
        let bowler = PlayerId::new("b1");
        let other = PlayerId::new("b2");
        assert!(check_bowler_eligible(&bowler, Some(&bowler), 0).is_err());
        assert!(check_bowler_eligible(&other, Some(&bowler), 0).is_ok());
        assert!(check_bowler_eligible(&bowler, Some(&bowler), 3).is_ok());
        assert!(check_bowler_eligible(&bowler, None, 0).is_ok());
    }

    #[test]
    fn innings_ends_on_all_out_or_overs() {
        assert!(innings_exhausted(10, 30, Some(20)));
        assert!(innings_exhausted(3, 120, Some(20)));
        assert!(!innings_exhausted(3, 119, Some(20)));
        assert!(!innings_exhausted(9, 600, None));
    }

    #[test]
    fn huge_overs_limit_does_not_overflow() {
        assert!(!innings_exhausted(0, 1, Some(u32::MAX)));
        assert!(innings_exhausted(0, u32::MAX, Some(u32::MAX)));
    }

    #[test]
    fn milestones_near_the_top_of_the_range() {
        assert!(milestones_crossed(u32::MAX - 10, u32::MAX).is_empty());
    }

    #[test]
    fn delivery_runs_are_capped_per_component() {
        assert!(check_delivery_runs(6, &Extras::bye(4)).is_ok());
        assert!(check_delivery_runs(MAX_RUNS_PER_COMPONENT, &Extras::penalty(5)).is_ok());
        assert!(matches!(
            check_delivery_runs(u32::MAX, &Extras::none()),
            Err(ScoringError::PreconditionFailed { .. })
        ));
        assert!(matches!(
            check_delivery_runs(0, &Extras::leg_bye(MAX_RUNS_PER_COMPONENT + 1)),
            Err(ScoringError::PreconditionFailed { .. })
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn overs_and_balls_recombine(legal_balls in 0u32..10_000) {
                let (overs, balls) = overs_and_balls(legal_balls);
                prop_assert!(balls < BALLS_PER_OVER);
                prop_assert_eq!(overs * BALLS_PER_OVER + balls, legal_balls);
                prop_assert_eq!(overs_display(legal_balls), format!("{overs}.{balls}"));
            }

            #[test]
            fn each_milestone_is_crossed_exactly_once(
                steps in prop::collection::vec(0u32..=7, 1..80)
            ) {
                let mut score = 0;
                let mut seen = Vec::new();
                for step in steps {
                    seen.extend(milestones_crossed(score, score + step));
                    score += step;
                }
                let expected: Vec<u32> =
                    (1..=score / MILESTONE_STEP).map(|n| n * MILESTONE_STEP).collect();
                prop_assert_eq!(seen, expected);
            }
        }
    }
}
