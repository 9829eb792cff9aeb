use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Every stat is optional: the API mixes numbers, numeric strings and `null`,
/// and older snapshots simply omit newer columns. Read stats through [`num`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerRecord {
    #[serde(deserialize_with = "u32_or_zero")]
    pub id: u32,
    #[serde(deserialize_with = "string_or_empty")]
    pub web_name: String,
    #[serde(deserialize_with = "u32_or_zero")]
    pub team: u32,
    #[serde(deserialize_with = "u8_or_none")]
    pub element_type: Option<u8>,

    #[serde(deserialize_with = "float_or_none")]
    pub minutes: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub starts: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub appearances: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub total_points: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub event_points: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub points_per_game: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub points_per_game_90: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub form: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub selected_by_percent: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub now_cost: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub cost_change_start: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub cost_change_event: Option<f64>,

    #[serde(deserialize_with = "float_or_none")]
    pub transfers_in: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub transfers_out: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub transfers_in_event: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub transfers_out_event: Option<f64>,

    #[serde(deserialize_with = "float_or_none")]
    pub goals_scored: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub assists: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub clean_sheets: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub goals_conceded: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub own_goals: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub penalties_missed: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub penalties_saved: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub yellow_cards: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub red_cards: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub saves: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub bonus: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub bps: Option<f64>,

    #[serde(deserialize_with = "float_or_none")]
    pub influence: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub creativity: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub threat: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub ict_index: Option<f64>,

    #[serde(deserialize_with = "float_or_none")]
    pub expected_goals: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub expected_assists: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub expected_goal_involvements: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub expected_goals_conceded: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub expected_goal_involvements_per_90: Option<f64>,

    #[serde(deserialize_with = "float_or_none")]
    pub def_contrib: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub def_contrib_per90: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub key_passes: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub big_chances_created: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub big_chances_missed: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub tackles: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub dribbles: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub fouls: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub offside: Option<f64>,

    #[serde(deserialize_with = "float_or_none")]
    pub ep_next: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub ep_this: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub event: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub opponent_team: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub was_home: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn from_element_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Goalkeeper),
            2 => Some(Self::Defender),
            3 => Some(Self::Midfielder),
            4 => Some(Self::Forward),
            _ => None,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Self::Goalkeeper => "GKP",
            Self::Defender => "DEF",
            Self::Midfielder => "MID",
            Self::Forward => "FWD",
        }
    }
}

impl PlayerRecord {
    pub fn position(&self) -> Option<Position> {
        self.element_type.and_then(Position::from_element_type)
    }

    /// Price in millions (`now_cost` is stored in tenths).
    pub fn price(&self) -> f64 {
        num(self.now_cost) / 10.0
    }

    pub fn games_played(&self) -> f64 {
        (num(self.minutes) / 90.0).max(0.1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredPlayer {
    pub record: PlayerRecord,
    /// Single-gameweek expectation, always within `[0, 15]`.
    pub predicted_points: f64,
    pub projected_points: Option<f64>,
    pub stability: u8,
}

impl ScoredPlayer {
    pub fn id(&self) -> u32 {
        self.record.id
    }

    pub fn headline_points(&self) -> f64 {
        self.projected_points.unwrap_or(self.predicted_points)
    }
}

pub type PlayerIndex = HashMap<u32, ScoredPlayer>;

/// Uniform read for optional stats: absent, unparseable and non-finite all read as zero.
pub fn num(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Like [`num`] but treats zero as missing, for `a || b || 0` style fallbacks.
pub fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

pub fn parse_bootstrap_players_json(raw: &str) -> Result<Vec<PlayerRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid bootstrap json")?;
    // Accept either the full bootstrap payload or a bare array of elements.
    let elements = match v {
        Value::Array(_) => v,
        Value::Object(mut map) => map.remove("elements").unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    let Value::Array(items) = elements else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<PlayerRecord>(item) {
            Ok(p) => out.push(p),
            Err(err) => log::debug!("skipping malformed element: {err}"),
        }
    }
    Ok(out)
}

pub(crate) fn float_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

pub(crate) fn u32_or_zero<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
        .unwrap_or(0))
}

pub(crate) fn u32_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32))
}

fn u8_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|v| *v >= 0.0 && *v <= u8::MAX as f64)
        .map(|v| v as u8))
}

pub(crate) fn bool_or_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let rendered = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(rendered)
}

pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
