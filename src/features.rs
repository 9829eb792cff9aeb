use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::player::{PlayerRecord, Position, nonzero, num};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLayout {
    /// Extended draft list (no price features). Default for tree models.
    #[default]
    Draft,
    /// Classic single-gameweek list, including value/price features.
    Classic,
}

pub const DRAFT_FEATURES: &[&str] = &[
    "GW",
    "element",
    "fixture",
    "opponent_team",
    "round",
    "was_home",
    "id",
    "minutes",
    "starts",
    "total_points",
    "selected",
    "form_5",
    "form_3",
    "form_10",
    "form_trend",
    "transfers_in",
    "transfers_out",
    "transfers_balance",
    "ict_index",
    "influence",
    "creativity",
    "threat",
    "influence_per_90",
    "creativity_per_90",
    "threat_per_90",
    "goals_scored",
    "assists",
    "expected_goals",
    "expected_assists",
    "expected_goal_involvements",
    "goals_per_90",
    "assists_per_90",
    "xG_per_90",
    "xA_per_90",
    "xGI_per_90",
    "xGI_per_90_avg_5",
    "clean_sheets",
    "goals_conceded",
    "expected_goals_conceded",
    "saves",
    "def_contrib",
    "def_contrib_per_90",
    "def_contrib_per_90_avg_5",
    "bonus",
    "bps",
    "bonus_per_90",
    "bps_per_90",
    "key_passes",
    "big_chances_created",
    "big_chances_missed",
    "tackles",
    "dribbles",
    "fouls",
    "offside",
    "yellow_cards",
    "red_cards",
    "penalties_missed",
    "penalties_saved",
    "own_goals",
    "finishing_efficiency",
    "assist_efficiency",
    "cs_per_game",
    "is_GKP",
    "is_DEF",
    "is_MID",
    "is_FWD",
    "minutes_rolling",
    "minutes_std_5",
    "points_std_5",
    "points_cv",
    "xP",
    "ea_index",
    "team_h_score",
    "team_a_score",
    "winning_goals",
    "attempted_passes",
    "completed_passes",
    "open_play_crosses",
    "clearances_blocks_interceptions",
    "recoveries",
    "tackled",
    "target_missed",
    "defensive_contribution",
    "errors_leading_to_goal",
    "errors_leading_to_goal_attempt",
    "loaned_in",
    "loaned_out",
    "penalties_conceded",
    "cs_rolling_5",
    "mng_clean_sheets",
    "mng_goals_scored",
    "mng_win",
    "mng_loss",
    "mng_draw",
    "mng_underdog_win",
    "mng_underdog_draw",
];

pub const CLASSIC_FEATURES: &[&str] = &[
    "assists",
    "bonus",
    "bps",
    "clean_sheets",
    "creativity",
    "goals_conceded",
    "goals_scored",
    "ict_index",
    "influence",
    "minutes",
    "own_goals",
    "penalties_missed",
    "penalties_saved",
    "red_cards",
    "saves",
    "threat",
    "yellow_cards",
    "starts",
    "expected_goals",
    "expected_assists",
    "expected_goal_involvements",
    "expected_goals_conceded",
    "form",
    "points_per_game",
    "selected_by_percent",
    "now_cost",
    "cost_change_start",
    "cost_change_event",
    "transfers_in",
    "transfers_out",
    "transfers_in_event",
    "transfers_out_event",
    "goals_per_90",
    "assists_per_90",
    "xG_per_90",
    "xA_per_90",
    "xGI_per_90",
    "bonus_per_90",
    "bps_per_90",
    "influence_per_90",
    "creativity_per_90",
    "threat_per_90",
    "finishing_efficiency",
    "assist_efficiency",
    "is_GKP",
    "is_DEF",
    "is_MID",
    "is_FWD",
    "cs_per_game",
    "points_per_million",
    "form_per_million",
    "def_contrib_per90",
    "form_3",
    "form_5",
    "form_10",
    "xGI_per_90_avg_5",
    "def_contrib_per_90_avg_5",
    "cs_rolling_5",
    "points_std_5",
    "points_cv",
    "minutes_std_5",
    "total_points_last3",
    "minutes_last3",
    "goals_scored_last3",
    "assists_last3",
    "clean_sheets_last3",
    "saves_last3",
    "minutes_last3_std",
    "hot_streak",
    "value",
];

static DRAFT_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| index_table(DRAFT_FEATURES));
static CLASSIC_INDEX: Lazy<HashMap<&'static str, usize>> =
    Lazy::new(|| index_table(CLASSIC_FEATURES));

fn index_table(names: &'static [&'static str]) -> HashMap<&'static str, usize> {
    names.iter().enumerate().map(|(i, n)| (*n, i)).collect()
}

impl FeatureLayout {
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Self::Draft => DRAFT_FEATURES,
            Self::Classic => CLASSIC_FEATURES,
        }
    }

    pub fn index_of(self, name: &str) -> Option<usize> {
        let table = match self {
            Self::Draft => &*DRAFT_INDEX,
            Self::Classic => &*CLASSIC_INDEX,
        };
        table.get(name).copied()
    }
}

/// Named numeric features for one player. Every key of the layout is present.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    layout: FeatureLayout,
    values: Vec<f64>,
}

impl FeatureSet {
    fn zeroed(layout: FeatureLayout) -> Self {
        Self {
            layout,
            values: vec![0.0; layout.names().len()],
        }
    }

    fn set(&mut self, name: &'static str, value: f64) {
        let idx = self.layout.index_of(name);
        debug_assert!(idx.is_some(), "unknown feature {name}");
        if let Some(idx) = idx {
            self.values[idx] = if value.is_finite() { value } else { 0.0 };
        }
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Missing names read as zero.
    pub fn get(&self, name: &str) -> f64 {
        self.layout
            .index_of(name)
            .map(|idx| self.values[idx])
            .unwrap_or(0.0)
    }

    pub fn value_at(&self, idx: usize) -> f64 {
        self.values.get(idx).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layout.index_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.layout
            .names()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

pub fn extract_features(player: &PlayerRecord) -> FeatureSet {
    extract_draft(player)
}

pub fn extract_features_for(layout: FeatureLayout, player: &PlayerRecord) -> FeatureSet {
    match layout {
        FeatureLayout::Draft => extract_draft(player),
        FeatureLayout::Classic => extract_classic(player),
    }
}

pub fn draft_points_per_game(player: &PlayerRecord) -> f64 {
    let minutes = num(player.minutes);
    let from_totals = if minutes > 0.0 {
        nonzero(Some(num(player.total_points) / (minutes / 90.0)))
    } else {
        None
    };
    nonzero(player.points_per_game_90)
        .or(from_totals)
        .or(nonzero(player.form))
        .unwrap_or(0.0)
}

fn one_hot(f: &mut FeatureSet, position: Option<Position>) {
    let flag = |p: Position| if position == Some(p) { 1.0 } else { 0.0 };
    f.set("is_GKP", flag(Position::Goalkeeper));
    f.set("is_DEF", flag(Position::Defender));
    f.set("is_MID", flag(Position::Midfielder));
    f.set("is_FWD", flag(Position::Forward));
}

fn extract_draft(p: &PlayerRecord) -> FeatureSet {
    let mut f = FeatureSet::zeroed(FeatureLayout::Draft);
    let games = p.games_played();

    f.set("GW", num(p.event));
    f.set("element", p.id as f64);
    f.set("opponent_team", num(p.opponent_team));
    f.set("round", num(p.event));
    f.set("was_home", num(p.was_home));
    f.set("id", p.id as f64);

    let minutes = num(p.minutes);
    f.set("minutes", minutes);
    f.set("starts", num(p.starts));
    f.set("total_points", num(p.total_points));
    let selected = num(p.selected_by_percent);
    f.set("selected", selected);

    let boost = if num(p.transfers_in_event) > 0.0 { 0.1 } else { 0.0 };
    let ppg = draft_points_per_game(p);
    let form_5 = ppg + boost;
    let form_3 = ppg * 1.15 + boost;
    f.set("form_5", form_5);
    f.set("form_3", form_3);
    f.set("form_10", ppg * 0.85);
    f.set("form_trend", form_3 - form_5);

    let t_in = num(p.transfers_in_event);
    let t_out = num(p.transfers_out_event);
    f.set("transfers_in", t_in);
    f.set("transfers_out", t_out);
    f.set("transfers_balance", t_in - t_out);

    let influence = num(p.influence);
    let creativity = num(p.creativity);
    let threat = num(p.threat);
    f.set("ict_index", num(p.ict_index));
    f.set("influence", influence);
    f.set("creativity", creativity);
    f.set("threat", threat);
    f.set("influence_per_90", influence / games);
    f.set("creativity_per_90", creativity / games);
    f.set("threat_per_90", threat / games);

    let goals = num(p.goals_scored);
    let assists = num(p.assists);
    let xg = num(p.expected_goals);
    let xa = num(p.expected_assists);
    let xgi = num(p.expected_goal_involvements);
    f.set("goals_scored", goals);
    f.set("assists", assists);
    f.set("expected_goals", xg);
    f.set("expected_assists", xa);
    f.set("expected_goal_involvements", xgi);
    f.set("goals_per_90", goals / games);
    f.set("assists_per_90", assists / games);
    f.set("xG_per_90", xg / games);
    f.set("xA_per_90", xa / games);
    f.set("xGI_per_90", xgi / games);
    f.set("xGI_per_90_avg_5", xgi / games);

    let clean_sheets = num(p.clean_sheets);
    f.set("clean_sheets", clean_sheets);
    f.set("goals_conceded", num(p.goals_conceded));
    f.set("expected_goals_conceded", num(p.expected_goals_conceded));
    f.set("saves", num(p.saves));
    f.set("def_contrib", num(p.def_contrib));
    f.set("def_contrib_per_90", num(p.def_contrib_per90));
    f.set("def_contrib_per_90_avg_5", num(p.def_contrib_per90));

    let bonus = num(p.bonus);
    let bps = num(p.bps);
    f.set("bonus", bonus);
    f.set("bps", bps);
    f.set("bonus_per_90", bonus / games);
    f.set("bps_per_90", bps / games);

    f.set("key_passes", num(p.key_passes));
    f.set("big_chances_created", num(p.big_chances_created));
    f.set("big_chances_missed", num(p.big_chances_missed));
    f.set("tackles", num(p.tackles));
    f.set("dribbles", num(p.dribbles));
    f.set("fouls", num(p.fouls));
    f.set("offside", num(p.offside));
    f.set("yellow_cards", num(p.yellow_cards));
    f.set("red_cards", num(p.red_cards));
    f.set("penalties_missed", num(p.penalties_missed));
    f.set("penalties_saved", num(p.penalties_saved));
    f.set("own_goals", num(p.own_goals));

    // A zero expected-stat denominator is floored to 1.
    f.set("finishing_efficiency", goals / nonzero(Some(xg)).unwrap_or(1.0));
    f.set("assist_efficiency", assists / nonzero(Some(xa)).unwrap_or(1.0));
    f.set("cs_per_game", clean_sheets / games);

    one_hot(&mut f, p.position());

    f.set("minutes_rolling", minutes);
    f.set(
        "points_cv",
        if form_5 > 0.0 { 0.3 / form_5 } else { 0.0 },
    );
    f.set("xP", num(p.total_points));
    f.set(
        "ea_index",
        nonzero(p.ep_next).or(nonzero(p.ep_this)).unwrap_or(0.0),
    );
    f.set("defensive_contribution", num(p.def_contrib));

    // No per-match history upstream: rolling std devs, match score
    // breakdowns, pass/defensive event counts and manager stats stay at 0.
    f
}

fn extract_classic(p: &PlayerRecord) -> FeatureSet {
    let mut f = FeatureSet::zeroed(FeatureLayout::Classic);
    let games = p.games_played();
    let price = p.price();

    let goals = num(p.goals_scored);
    let assists = num(p.assists);
    let bonus = num(p.bonus);
    let bps = num(p.bps);
    let clean_sheets = num(p.clean_sheets);
    let influence = num(p.influence);
    let creativity = num(p.creativity);
    let threat = num(p.threat);
    let minutes = num(p.minutes);
    let saves = num(p.saves);
    let xg = num(p.expected_goals);
    let xa = num(p.expected_assists);
    let xgi = num(p.expected_goal_involvements);
    let form = num(p.form);
    let total_points = num(p.total_points);

    f.set("assists", assists);
    f.set("bonus", bonus);
    f.set("bps", bps);
    f.set("clean_sheets", clean_sheets);
    f.set("creativity", creativity);
    f.set("goals_conceded", num(p.goals_conceded));
    f.set("goals_scored", goals);
    f.set("ict_index", num(p.ict_index));
    f.set("influence", influence);
    f.set("minutes", minutes);
    f.set("own_goals", num(p.own_goals));
    f.set("penalties_missed", num(p.penalties_missed));
    f.set("penalties_saved", num(p.penalties_saved));
    f.set("red_cards", num(p.red_cards));
    f.set("saves", saves);
    f.set("threat", threat);
    f.set("yellow_cards", num(p.yellow_cards));
    f.set("starts", num(p.starts));
    f.set("expected_goals", xg);
    f.set("expected_assists", xa);
    f.set("expected_goal_involvements", xgi);
    f.set("expected_goals_conceded", num(p.expected_goals_conceded));

    f.set("form", form);
    f.set("points_per_game", num(p.points_per_game));
    f.set("selected_by_percent", num(p.selected_by_percent));
    f.set("now_cost", num(p.now_cost));
    f.set("cost_change_start", num(p.cost_change_start));
    f.set("cost_change_event", num(p.cost_change_event));

    f.set("transfers_in", num(p.transfers_in));
    f.set("transfers_out", num(p.transfers_out));
    f.set("transfers_in_event", num(p.transfers_in_event));
    f.set("transfers_out_event", num(p.transfers_out_event));

    let goals_p90 = goals / games;
    let assists_p90 = assists / games;
    let xgi_p90 = xgi / games;
    f.set("goals_per_90", goals_p90);
    f.set("assists_per_90", assists_p90);
    f.set("xG_per_90", xg / games);
    f.set("xA_per_90", xa / games);
    f.set("xGI_per_90", xgi_p90);
    f.set("bonus_per_90", bonus / games);
    f.set("bps_per_90", bps / games);
    f.set("influence_per_90", influence / games);
    f.set("creativity_per_90", creativity / games);
    f.set("threat_per_90", threat / games);

    // The classic model was trained with 0 for a missing expected stat.
    f.set(
        "finishing_efficiency",
        if xg > 0.0 { goals / xg } else { 0.0 },
    );
    f.set(
        "assist_efficiency",
        if xa > 0.0 { assists / xa } else { 0.0 },
    );

    one_hot(&mut f, p.position());

    let cs_per_game = clean_sheets / games;
    f.set("cs_per_game", cs_per_game);

    f.set(
        "points_per_million",
        if total_points > 0.0 && price > 0.0 {
            total_points / price
        } else {
            0.0
        },
    );
    f.set(
        "form_per_million",
        if form > 0.0 && price > 0.0 { form / price } else { 0.0 },
    );

    let def_contrib = num(p.def_contrib_per90);
    f.set("def_contrib_per90", def_contrib);

    f.set("form_3", form);
    f.set("form_5", form);
    f.set("form_10", form);
    f.set("xGI_per_90_avg_5", xgi_p90);
    f.set("def_contrib_per_90_avg_5", def_contrib);
    f.set("cs_rolling_5", cs_per_game);

    let points_std = form * 0.5;
    f.set("points_std_5", points_std);
    f.set("points_cv", if form > 0.0 { points_std / form } else { 0.0 });
    f.set("minutes_std_5", minutes / 10.0);

    const LAST: f64 = 3.0;
    let minutes_last3 = (minutes / games) * LAST;
    f.set("total_points_last3", form * LAST);
    f.set("minutes_last3", minutes_last3);
    f.set("goals_scored_last3", goals_p90 * LAST);
    f.set("assists_last3", assists_p90 * LAST);
    f.set("clean_sheets_last3", cs_per_game * LAST);
    f.set("saves_last3", (saves / games) * LAST);
    f.set("minutes_last3_std", minutes_last3 / 3.0);

    f.set("hot_streak", if form > 6.0 { 1.0 } else { 0.0 });
    f.set("value", price);
    f
}
