//! proptest strategies for deliveries.
//!
//! A generated [`BallSpec`] does not name players; it is turned into a
//! [`RecordBall`] against whoever is at the crease when it is played, so a
//! dismissal always targets a batter who is actually in.

use crease_core::{CurrentPlayers, DismissalType, Extras, RecordBall};
use proptest::prelude::*;

/// Which batter a generated dismissal removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum End {
    /// The batter on strike.
    Striker,
    /// The batter at the bowler's end.
    NonStriker,
}

/// A delivery without player names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BallSpec {
    /// Runs off the bat.
    pub runs_off_bat: u32,
    /// Extras.
    pub extras: Extras,
    /// Dismissal, if any.
    pub wicket: Option<(DismissalType, End)>,
}

impl BallSpec {
    /// Name the players. `None` if the dismissed end is empty.
    #[must_use]
    pub fn to_record(&self, players: &CurrentPlayers) -> Option<RecordBall> {
        let ball = RecordBall::runs(self.runs_off_bat).with_extras(self.extras);
        match self.wicket {
            None => Some(ball),
            Some((kind, End::Striker)) => {
                let striker = players.striker_id.clone()?;
                Some(ball.with_wicket(crease_core::Wicket::new(kind, striker)))
            },
            Some((kind, End::NonStriker)) => {
                let non_striker = players.non_striker_id.clone()?;
                Some(ball.with_wicket(crease_core::Wicket::new(kind, non_striker)))
            },
        }
    }

    /// Whether the delivery counts toward the over.
    #[must_use]
    pub const fn is_legal(&self) -> bool {
        self.extras.is_legal_delivery()
    }
}

/// Extras for a single delivery; never both wide and no-ball.
pub fn arb_extras() -> impl Strategy<Value = Extras> {
    prop_oneof![
        6 => Just(Extras::none()),
        1 => (1u32..=5).prop_map(Extras::wide),
        1 => Just(Extras::no_ball(1)),
        1 => (1u32..=4).prop_map(Extras::bye),
        1 => (1u32..=4).prop_map(Extras::leg_bye),
    ]
}

fn arb_striker_dismissal() -> impl Strategy<Value = DismissalType> {
    prop_oneof![
        Just(DismissalType::Bowled),
        Just(DismissalType::Caught),
        Just(DismissalType::Lbw),
        Just(DismissalType::Stumped),
        Just(DismissalType::RunOut),
    ]
}

fn arb_wicket() -> impl Strategy<Value = Option<(DismissalType, End)>> {
    prop_oneof![
        9 => Just(None),
        2 => arb_striker_dismissal().prop_map(|kind| Some((kind, End::Striker))),
        1 => Just(Some((DismissalType::RunOut, End::NonStriker))),
    ]
}

/// Any delivery a scorer could record.
///
/// Runs off the bat are zero on wides, byes and leg-byes, and a wicket off
/// an illegal delivery is always a run out.
pub fn arb_ball() -> impl Strategy<Value = BallSpec> {
    (0u32..=6, arb_extras(), arb_wicket()).prop_map(|(runs, extras, wicket)| {
        let runs_off_bat = if extras.wide + extras.bye + extras.leg_bye > 0 { 0 } else { runs };
        let wicket = if extras.is_legal_delivery() {
            wicket
        } else {
            wicket.map(|(_, end)| (DismissalType::RunOut, end))
        };
        BallSpec {
            runs_off_bat,
            extras,
            wicket,
        }
    })
}

/// Legal deliveries without wickets, for over-counting checks.
pub fn arb_legal_ball() -> impl Strategy<Value = BallSpec> {
    (0u32..=6).prop_map(|runs_off_bat| BallSpec {
        runs_off_bat,
        extras: Extras::none(),
        wicket: None,
    })
}

/// Up to `max` deliveries.
pub fn arb_innings(max: usize) -> impl Strategy<Value = Vec<BallSpec>> {
    prop::collection::vec(arb_ball(), 0..=max)
}
