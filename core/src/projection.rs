//! The projection engine: action log in, live score out.
//!
//! [`project`] is a pure function of the match record and the non-voided
//! actions. It never mutates its inputs and never patches a previous
//! projection; every call replays each innings from its first delivery, so
//! the output for a given input is always identical. Recording a ball,
//! undoing one, and bulk-importing a legacy match all go through it.
//!
//! Rates (strike rate, economy) are derived on demand from the stored
//! counters rather than stored themselves.

use crate::action::{BowlingAngle, DismissalType, Extras, ScoringAction, ShotCoordinates};
use crate::ids::{MatchId, PlayerId, TeamId};
use crate::rules;
use crate::state_machine::{
    InningsClosure, InningsRecord, MatchState, MatchStatus, Retirement, RetirementKind, ScoreLine,
    WinMargin,
};
use serde::{Deserialize, Serialize};

/// Headline score of an innings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsScore {
    /// Runs scored.
    pub runs: u32,
    /// Wickets fallen.
    pub wickets: u32,
    /// Completed overs.
    pub overs: u32,
    /// Legal balls in the current partial over.
    pub balls: u32,
    /// Runs needed to win (second innings only).
    pub target: Option<u32>,
}

impl InningsScore {
    /// Total legal balls bowled.
    #[must_use]
    pub const fn legal_balls(&self) -> u32 {
        self.overs * rules::BALLS_PER_OVER + self.balls
    }

    /// Scorecard overs, e.g. `"3.2"`.
    #[must_use]
    pub fn overs_display(&self) -> String {
        rules::overs_display(self.legal_balls())
    }

    /// Runs still required, if chasing.
    #[must_use]
    pub fn runs_required(&self) -> Option<u32> {
        self.target.map(|target| target.saturating_sub(self.runs))
    }

    /// The subset of the score the state machine guards on.
    #[must_use]
    pub const fn score_line(&self) -> ScoreLine {
        ScoreLine {
            runs: self.runs,
            wickets: self.wickets,
            legal_balls: self.legal_balls(),
        }
    }
}

/// Who is at the crease and who is bowling. `None` marks a pending selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPlayers {
    /// Batter on strike.
    pub striker_id: Option<PlayerId>,
    /// Batter at the other end.
    pub non_striker_id: Option<PlayerId>,
    /// Bowler of the current over.
    pub bowler_id: Option<PlayerId>,
    /// Bowler's angle.
    pub bowling_angle: Option<BowlingAngle>,
}

impl CurrentPlayers {
    fn vacate(&mut self, player: &PlayerId) {
        if self.striker_id.as_ref() == Some(player) {
            self.striker_id = None;
        }
        if self.non_striker_id.as_ref() == Some(player) {
            self.non_striker_id = None;
        }
    }

    fn swap_ends(&mut self) {
        std::mem::swap(&mut self.striker_id, &mut self.non_striker_id);
    }

    /// True if `player` is batting at either end.
    #[must_use]
    pub fn is_batting(&self, player: &PlayerId) -> bool {
        self.striker_id.as_ref() == Some(player) || self.non_striker_id.as_ref() == Some(player)
    }
}

/// One batter's innings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatterFigures {
    /// The batter.
    pub player_id: PlayerId,
    /// Runs off the bat.
    pub runs: u32,
    /// Legal deliveries and no-balls faced.
    pub balls_faced: u32,
    /// Fours hit.
    pub fours: u32,
    /// Sixes hit.
    pub sixes: u32,
    /// Dismissed (frozen).
    pub is_out: bool,
    /// Mode of dismissal.
    pub dismissal: Option<DismissalType>,
    /// Bowler credited with the wicket.
    pub dismissed_by: Option<PlayerId>,
    /// Retired hurt and not yet resumed.
    pub retired_hurt: bool,
}

impl BatterFigures {
    fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
            is_out: false,
            dismissal: None,
            dismissed_by: None,
            retired_hurt: false,
        }
    }

    /// Runs per hundred balls.
    #[must_use]
    pub fn strike_rate(&self) -> f64 {
        rules::strike_rate(self.runs, self.balls_faced)
    }
}

/// One bowler's figures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlerFigures {
    /// The bowler.
    pub player_id: PlayerId,
    /// Legal balls bowled.
    pub legal_balls: u32,
    /// Maiden overs.
    pub maidens: u32,
    /// Runs charged (everything except byes and leg-byes).
    pub runs_conceded: u32,
    /// Wickets credited.
    pub wickets: u32,
    /// Wides bowled.
    pub wides: u32,
    /// No-balls bowled.
    pub no_balls: u32,
}

impl BowlerFigures {
    fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            legal_balls: 0,
            maidens: 0,
            runs_conceded: 0,
            wickets: 0,
            wides: 0,
            no_balls: 0,
        }
    }

    /// Scorecard overs, e.g. `"3.2"`.
    #[must_use]
    pub fn overs_display(&self) -> String {
        rules::overs_display(self.legal_balls)
    }

    /// Runs per over.
    #[must_use]
    pub fn economy(&self) -> f64 {
        rules::economy(self.runs_conceded, self.legal_balls)
    }
}

/// Extras conceded in an innings, by type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasTally {
    /// Wide runs.
    pub wides: u32,
    /// No-ball runs.
    pub no_balls: u32,
    /// Byes.
    pub byes: u32,
    /// Leg-byes.
    pub leg_byes: u32,
    /// Penalty runs.
    pub penalties: u32,
}

impl ExtrasTally {
    fn add(&mut self, extras: &Extras) {
        self.wides = self.wides.saturating_add(extras.wide);
        self.no_balls = self.no_balls.saturating_add(extras.no_ball);
        self.byes = self.byes.saturating_add(extras.bye);
        self.leg_byes = self.leg_byes.saturating_add(extras.leg_bye);
        self.penalties = self.penalties.saturating_add(extras.penalty);
    }

    /// All extras.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.wides
            .saturating_add(self.no_balls)
            .saturating_add(self.byes)
            .saturating_add(self.leg_byes)
            .saturating_add(self.penalties)
    }
}

/// Team score at the fall of a wicket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallOfWicket {
    /// 1 for the first wicket, and so on.
    pub wicket_number: u32,
    /// Team runs when it fell.
    pub runs: u32,
    /// Legal balls bowled when it fell.
    pub legal_balls: u32,
    /// The batter out.
    pub player_id: PlayerId,
}

impl FallOfWicket {
    /// Overs at the fall, e.g. `"4.3"`.
    #[must_use]
    pub fn overs_display(&self) -> String {
        rules::overs_display(self.legal_balls)
    }
}

/// A delivery as shown in the "recent balls" strip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallSummary {
    /// Log position.
    pub sequence_number: u64,
    /// 0-based over.
    pub over_number: u32,
    /// Position within the over.
    pub ball_in_over: u32,
    /// Batter on strike.
    pub striker_id: PlayerId,
    /// Bowler.
    pub bowler_id: PlayerId,
    /// Runs off the bat.
    pub runs_off_bat: u32,
    /// Extras.
    pub extras: Extras,
    /// Runs added to the total.
    pub total_runs: u32,
    /// Wide or no-ball if false.
    pub is_legal_delivery: bool,
    /// Dismissal on this ball.
    pub wicket: Option<DismissalType>,
    /// Shot placement.
    pub shot: Option<ShotCoordinates>,
}

impl BallSummary {
    fn from_action(action: &ScoringAction) -> Self {
        Self {
            sequence_number: action.sequence_number,
            over_number: action.over_number,
            ball_in_over: action.ball_in_over,
            striker_id: action.striker_id.clone(),
            bowler_id: action.bowler_id.clone(),
            runs_off_bat: action.runs_off_bat,
            extras: action.extras,
            total_runs: action.computed_total(),
            is_legal_delivery: action.derived_is_legal(),
            wicket: action.wicket.as_ref().map(|wicket| wicket.kind),
            shot: action.shot,
        }
    }

    /// Compact label: `"."`, `"4"`, `"W"`, `"1wd"`, `"nb4"`, `"2lb"`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = if self.extras.is_wide() {
            format!("{}wd", self.extras.wide)
        } else if self.extras.is_no_ball() {
            if self.runs_off_bat > 0 {
                format!("nb{}", self.runs_off_bat)
            } else {
                "nb".to_string()
            }
        } else if self.extras.bye > 0 {
            format!("{}b", self.extras.bye)
        } else if self.extras.leg_bye > 0 {
            format!("{}lb", self.extras.leg_bye)
        } else if self.runs_off_bat == 0 && self.wicket.is_none() {
            ".".to_string()
        } else if self.runs_off_bat == 0 {
            String::new()
        } else {
            self.runs_off_bat.to_string()
        };
        if self.wicket.is_some() {
            label.push('W');
        }
        label
    }
}

/// Frozen aggregate of an innings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsSummary {
    /// 1 or 2.
    pub innings_number: u8,
    /// Side that batted.
    pub batting_team_id: TeamId,
    /// Side that bowled.
    pub bowling_team_id: TeamId,
    /// Final score.
    pub score: InningsScore,
    /// Extras by type.
    pub extras: ExtrasTally,
    /// Batters in order of appearance.
    pub batsmen: Vec<BatterFigures>,
    /// Bowlers in order of appearance.
    pub bowlers: Vec<BowlerFigures>,
    /// Fall of wickets.
    pub fall_of_wickets: Vec<FallOfWicket>,
    /// How the innings ended.
    pub closure: Option<InningsClosure>,
}

/// The live, externally visible state of a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveScoreProjection {
    /// Match.
    pub match_id: MatchId,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Innings currently shown.
    pub innings_number: u8,
    /// Side batting.
    pub batting_team_id: Option<TeamId>,
    /// Side bowling.
    pub bowling_team_id: Option<TeamId>,
    /// Current innings score.
    pub current_innings: InningsScore,
    /// Players at the crease and bowling.
    pub current_players: CurrentPlayers,
    /// Bowler of the most recently completed over; may not bowl the next one.
    pub last_over_bowler: Option<PlayerId>,
    /// Current innings batters.
    pub batsmen: Vec<BatterFigures>,
    /// Current innings bowlers.
    pub bowlers: Vec<BowlerFigures>,
    /// Current innings extras.
    pub extras: ExtrasTally,
    /// Current innings fall of wickets.
    pub fall_of_wickets: Vec<FallOfWicket>,
    /// First innings, once closed.
    pub innings1: Option<InningsSummary>,
    /// Second innings, once closed.
    pub innings2: Option<InningsSummary>,
    /// Current innings deliveries, oldest first.
    pub ball_history: Vec<BallSummary>,
    /// Winner, once completed.
    pub winner_id: Option<TeamId>,
    /// Margin, once completed.
    pub win_margin: Option<WinMargin>,
    /// Highest non-voided sequence number projected.
    pub last_sequence: u64,
}

impl LiveScoreProjection {
    /// The projection of a match with no innings under way.
    #[must_use]
    pub fn empty(match_id: MatchId, status: MatchStatus) -> Self {
        Self {
            match_id,
            status,
            innings_number: 1,
            batting_team_id: None,
            bowling_team_id: None,
            current_innings: InningsScore::default(),
            current_players: CurrentPlayers::default(),
            last_over_bowler: None,
            batsmen: Vec::new(),
            bowlers: Vec::new(),
            extras: ExtrasTally::default(),
            fall_of_wickets: Vec::new(),
            innings1: None,
            innings2: None,
            ball_history: Vec::new(),
            winner_id: None,
            win_margin: None,
            last_sequence: 0,
        }
    }

    /// Figures for `player` in the current innings.
    #[must_use]
    pub fn batter(&self, player: &PlayerId) -> Option<&BatterFigures> {
        self.batsmen.iter().find(|figures| figures.player_id == *player)
    }

    /// Figures for `player` in the current innings.
    #[must_use]
    pub fn bowler(&self, player: &PlayerId) -> Option<&BowlerFigures> {
        self.bowlers.iter().find(|figures| figures.player_id == *player)
    }

    /// Encode for a projection store or a spectator feed.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a projection written by [`LiveScoreProjection::to_json`].
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Projection of the current innings as a summary.
    #[must_use]
    pub fn current_summary(&self) -> Option<InningsSummary> {
        Some(InningsSummary {
            innings_number: self.innings_number,
            batting_team_id: self.batting_team_id.clone()?,
            bowling_team_id: self.bowling_team_id.clone()?,
            score: self.current_innings,
            extras: self.extras,
            batsmen: self.batsmen.clone(),
            bowlers: self.bowlers.clone(),
            fall_of_wickets: self.fall_of_wickets.clone(),
            closure: None,
        })
    }
}

/// Knobs that change presentation but never the score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// Keep only this many recent balls in `ball_history`; 0 keeps all.
    pub ball_history_limit: usize,
}

/// Running totals for the over in progress.
#[derive(Clone, Debug, Default)]
struct OverInProgress {
    bowler: Option<PlayerId>,
    runs: u32,
    // A mid-over change of bowler rules out a maiden.
    shared: bool,
}

/// Replay accumulator for one innings.
#[derive(Clone, Debug, Default)]
pub struct InningsTally {
    runs: u32,
    wickets: u32,
    legal_balls: u32,
    extras: ExtrasTally,
    batsmen: Vec<BatterFigures>,
    bowlers: Vec<BowlerFigures>,
    fall_of_wickets: Vec<FallOfWicket>,
    ball_history: Vec<BallSummary>,
    players: CurrentPlayers,
    last_over_bowler: Option<PlayerId>,
    over: OverInProgress,
    last_sequence: u64,
}

impl InningsTally {
    /// Replay the given actions and retirements for one innings.
    ///
    /// Voided actions are skipped and the rest are applied in sequence order
    /// regardless of the order they arrive in. Retirements are applied after
    /// the delivery they were pinned to.
    #[must_use]
    pub fn replay<'a, I>(actions: I, retirements: &[&Retirement]) -> Self
    where
        I: IntoIterator<Item = &'a ScoringAction>,
    {
        let mut ordered: Vec<&ScoringAction> =
            actions.into_iter().filter(|action| !action.is_voided).collect();
        ordered.sort_by_key(|action| action.sequence_number);

        let mut pending: Vec<&Retirement> = retirements.to_vec();
        pending.sort_by_key(|retirement| retirement.after_sequence);
        let mut pending = pending.into_iter().peekable();

        let mut tally = Self::default();
        for action in ordered {
            while let Some(retirement) =
                pending.next_if(|retirement| retirement.after_sequence < action.sequence_number)
            {
                tally.apply_retirement(retirement);
            }
            tally.apply(action);
        }
        for retirement in pending {
            tally.apply_retirement(retirement);
        }
        tally
    }

    /// Headline score.
    #[must_use]
    pub const fn score(&self) -> InningsScore {
        let (overs, balls) = rules::overs_and_balls(self.legal_balls);
        InningsScore {
            runs: self.runs,
            wickets: self.wickets,
            overs,
            balls,
            target: None,
        }
    }

    /// Players derived from the log alone.
    #[must_use]
    pub const fn players(&self) -> &CurrentPlayers {
        &self.players
    }

    /// Highest sequence number replayed (0 if none).
    #[must_use]
    pub const fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    fn batter_mut(&mut self, player: &PlayerId) -> &mut BatterFigures {
        let index = match self.batsmen.iter().position(|figures| figures.player_id == *player) {
            Some(index) => index,
            None => {
                self.batsmen.push(BatterFigures::new(player.clone()));
                self.batsmen.len() - 1
            },
        };
        &mut self.batsmen[index]
    }

    fn bowler_mut(&mut self, player: &PlayerId) -> &mut BowlerFigures {
        let index = match self.bowlers.iter().position(|figures| figures.player_id == *player) {
            Some(index) => index,
            None => {
                self.bowlers.push(BowlerFigures::new(player.clone()));
                self.bowlers.len() - 1
            },
        };
        &mut self.bowlers[index]
    }

    fn record_fall_of_wicket(&mut self, player: &PlayerId, legal_balls: u32) {
        self.fall_of_wickets.push(FallOfWicket {
            wicket_number: self.wickets,
            runs: self.runs,
            legal_balls,
            player_id: player.clone(),
        });
    }

    fn apply(&mut self, action: &ScoringAction) {
        let total = action.computed_total();
        let legal = action.derived_is_legal();

        self.runs = self.runs.saturating_add(total);
        self.extras.add(&action.extras);

        let striker = self.batter_mut(&action.striker_id);
        striker.retired_hurt = false;
        striker.runs = striker.runs.saturating_add(action.runs_off_bat);
        if action.counts_as_ball_faced() {
            striker.balls_faced += 1;
        }
        match action.runs_off_bat {
            4 => striker.fours += 1,
            6 => striker.sixes += 1,
            _ => {},
        }
        if let Some(non_striker) = &action.non_striker_id {
            self.batter_mut(non_striker).retired_hurt = false;
        }

        let bowler = self.bowler_mut(&action.bowler_id);
        bowler.runs_conceded =
            bowler.runs_conceded.saturating_add(action.runs_conceded_by_bowler());
        if legal {
            bowler.legal_balls += 1;
        }
        if action.extras.is_wide() {
            bowler.wides += 1;
        }
        if action.extras.is_no_ball() {
            bowler.no_balls += 1;
        }

        if self.over.bowler.as_ref().is_some_and(|current| *current != action.bowler_id) {
            self.over.shared = true;
        }
        self.over.bowler = Some(action.bowler_id.clone());
        self.over.runs = self.over.runs.saturating_add(total);

        if let Some(wicket) = &action.wicket {
            self.wickets += 1;
            let credited = wicket.kind.credited_to_bowler();
            if credited {
                self.bowler_mut(&action.bowler_id).wickets += 1;
            }
            let out = self.batter_mut(&wicket.dismissed_player_id);
            out.is_out = true;
            out.retired_hurt = false;
            out.dismissal = Some(wicket.kind);
            out.dismissed_by = credited.then(|| action.bowler_id.clone());
            // The dismissal ball itself counts toward the overs at the fall.
            self.record_fall_of_wicket(
                &wicket.dismissed_player_id,
                self.legal_balls + u32::from(legal),
            );
        }

        let mut players = CurrentPlayers {
            striker_id: Some(action.striker_id.clone()),
            non_striker_id: action.non_striker_id.clone(),
            bowler_id: Some(action.bowler_id.clone()),
            bowling_angle: action.bowling_angle,
        };
        if rules::rotates_strike(action) {
            players.swap_ends();
        }

        if legal {
            self.legal_balls += 1;
            if rules::completes_over(self.legal_balls) {
                self.complete_over(&action.bowler_id);
                players.swap_ends();
                players.bowler_id = None;
                players.bowling_angle = None;
            }
        }

        if let Some(wicket) = &action.wicket {
            players.vacate(&wicket.dismissed_player_id);
        }

        self.players = players;
        self.ball_history.push(BallSummary::from_action(action));
        self.last_sequence = action.sequence_number;
    }

    fn complete_over(&mut self, bowler: &PlayerId) {
        let over = std::mem::take(&mut self.over);
        if over.runs == 0 && !over.shared {
            self.bowler_mut(bowler).maidens += 1;
        }
        self.last_over_bowler = Some(bowler.clone());
    }

    fn apply_retirement(&mut self, retirement: &Retirement) {
        match retirement.kind {
            RetirementKind::Hurt => {
                self.batter_mut(&retirement.player_id).retired_hurt = true;
            },
            RetirementKind::Out => {
                self.wickets += 1;
                let figures = self.batter_mut(&retirement.player_id);
                figures.is_out = true;
                figures.retired_hurt = false;
                figures.dismissal = Some(DismissalType::RetiredOut);
                figures.dismissed_by = None;
                self.record_fall_of_wicket(&retirement.player_id, self.legal_balls);
            },
        }
        self.players.vacate(&retirement.player_id);
    }

    /// Lay a selection made after the last delivery over the derived players.
    fn apply_selection(&mut self, players: CurrentPlayers) {
        for batter in [&players.striker_id, &players.non_striker_id].into_iter().flatten() {
            self.batter_mut(batter).retired_hurt = false;
        }
        if let Some(bowler) = &players.bowler_id {
            self.bowler_mut(bowler);
        }
        self.players = players;
    }

    fn into_summary(self, record: &InningsRecord, target: Option<u32>) -> InningsSummary {
        let mut score = self.score();
        score.target = target;
        InningsSummary {
            innings_number: record.number,
            batting_team_id: record.batting_team_id.clone(),
            bowling_team_id: record.bowling_team_id.clone(),
            score,
            extras: self.extras,
            batsmen: self.batsmen,
            bowlers: self.bowlers,
            fall_of_wickets: self.fall_of_wickets,
            closure: record.closure,
        }
    }
}

/// Replay a single innings from its actions alone, with no match context.
///
/// Used by importers and tests that only care about the delivery log.
#[must_use]
pub fn project_innings<'a, I>(actions: I) -> InningsTally
where
    I: IntoIterator<Item = &'a ScoringAction>,
{
    InningsTally::replay(actions, &[])
}

/// Derive the live projection from the match record and its actions.
///
/// `actions` may contain voided records and may be in any order; only
/// non-voided records are replayed, in sequence order.
#[must_use]
pub fn project(
    state: &MatchState,
    actions: &[ScoringAction],
    options: ProjectionOptions,
) -> LiveScoreProjection {
    let mut projection = LiveScoreProjection::empty(state.match_id.clone(), state.status);
    let Some(current) = state.current_innings() else {
        return projection;
    };

    let mut target = None;
    let mut current_tally = InningsTally::default();
    for record in &state.innings {
        let retirements: Vec<&Retirement> = state
            .retirements
            .iter()
            .filter(|retirement| retirement.innings == record.number)
            .collect();
        let tally = InningsTally::replay(
            actions.iter().filter(|action| action.innings_number == record.number),
            &retirements,
        );
        let innings_target = if record.number == 2 { target } else { None };
        if record.number == current.number {
            current_tally = tally.clone();
        }
        if record.closure.is_some() {
            let summary = tally.into_summary(record, innings_target);
            if record.number == 1 {
                target = Some(summary.score.runs.saturating_add(1));
                projection.innings1 = Some(summary);
            } else {
                projection.innings2 = Some(summary);
            }
        }
    }

    if current.closure.is_none() {
        if let Some(selection) =
            state.active_selection(current.number, current_tally.last_sequence)
        {
            current_tally.apply_selection(CurrentPlayers {
                striker_id: selection.striker_id.clone(),
                non_striker_id: selection.non_striker_id.clone(),
                bowler_id: selection.bowler_id.clone(),
                bowling_angle: selection.bowling_angle,
            });
        }
    } else {
        current_tally.players = CurrentPlayers::default();
    }

    let mut score = current_tally.score();
    score.target = target;

    projection.innings_number = current.number;
    projection.batting_team_id = Some(current.batting_team_id.clone());
    projection.bowling_team_id = Some(current.bowling_team_id.clone());
    projection.current_innings = score;
    projection.current_players = current_tally.players;
    projection.last_over_bowler = current_tally.last_over_bowler;
    projection.batsmen = current_tally.batsmen;
    projection.bowlers = current_tally.bowlers;
    projection.extras = current_tally.extras;
    projection.fall_of_wickets = current_tally.fall_of_wickets;
    projection.last_sequence = actions
        .iter()
        .filter(|action| !action.is_voided)
        .map(|action| action.sequence_number)
        .max()
        .unwrap_or(0);

    let mut history = current_tally.ball_history;
    if options.ball_history_limit > 0 && history.len() > options.ball_history_limit {
        history.drain(..history.len() - options.ball_history_limit);
    }
    projection.ball_history = history;

    if let Some(result) = &state.result {
        projection.winner_id.clone_from(&result.winner_id);
        projection.win_margin = Some(result.margin);
    }
    projection
}
