use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::player::{bool_or_false, float_or_none, num, string_or_empty, u32_or_none, u32_or_zero};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueEntry {
    #[serde(deserialize_with = "u32_or_zero")]
    pub id: u32,
    #[serde(deserialize_with = "u32_or_none")]
    pub entry_id: Option<u32>,
    #[serde(deserialize_with = "string_or_empty")]
    pub entry_name: String,
    #[serde(deserialize_with = "string_or_empty")]
    pub player_first_name: String,
    #[serde(deserialize_with = "string_or_empty")]
    pub player_last_name: String,
}

impl LeagueEntry {
    pub fn manager_name(&self) -> String {
        format!("{} {}", self.player_first_name, self.player_last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRecord {
    #[serde(deserialize_with = "u32_or_none")]
    pub event: Option<u32>,
    #[serde(deserialize_with = "u32_or_none")]
    pub league_entry_1: Option<u32>,
    #[serde(deserialize_with = "float_or_none")]
    pub league_entry_1_points: Option<f64>,
    #[serde(deserialize_with = "u32_or_none")]
    pub league_entry_2: Option<u32>,
    #[serde(deserialize_with = "float_or_none")]
    pub league_entry_2_points: Option<f64>,
    #[serde(deserialize_with = "bool_or_false")]
    pub finished: bool,
    #[serde(deserialize_with = "bool_or_false")]
    pub started: bool,
    #[serde(deserialize_with = "winner_or_none")]
    pub winner: Option<Side>,
}

impl MatchRecord {
    pub fn side_of(&self, entry: u32) -> Option<Side> {
        if self.league_entry_1 == Some(entry) {
            Some(Side::Home)
        } else if self.league_entry_2 == Some(entry) {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn points(&self, side: Side) -> f64 {
        match side {
            Side::Home => num(self.league_entry_1_points),
            Side::Away => num(self.league_entry_2_points),
        }
    }

    pub fn opponent(&self, side: Side) -> Option<u32> {
        match side {
            Side::Home => self.league_entry_2,
            Side::Away => self.league_entry_1,
        }
    }
}

impl Serialize for Side {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(match self {
            Side::Home => "league_entry_1",
            Side::Away => "league_entry_2",
        })
    }
}

/// Draws, pending matches and unexpected values all read as "no winner".
fn winner_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<Side>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => match s.trim() {
            "league_entry_1" => Some(Side::Home),
            "league_entry_2" => Some(Side::Away),
            _ => None,
        },
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LeagueDetails {
    pub name: String,
    pub current_event: Option<u32>,
    pub entries: Vec<LeagueEntry>,
    pub matches: Vec<MatchRecord>,
}

impl LeagueDetails {
    pub fn entry(&self, id: u32) -> Option<&LeagueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Explicit `current_event`, else the first gameweek with an unfinished match,
    /// else the last gameweek played.
    pub fn resolve_current_event(&self) -> Option<u32> {
        self.current_event
            .or_else(|| {
                self.matches
                    .iter()
                    .filter(|m| !m.finished)
                    .filter_map(|m| m.event)
                    .min()
            })
            .or_else(|| self.matches.iter().filter_map(|m| m.event).max())
    }
}

fn collect_items<T: serde::de::DeserializeOwned>(value: Option<Value>, label: &str) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(v) => out.push(v),
            Err(err) => log::debug!("skipping malformed {label}: {err}"),
        }
    }
    out
}

pub fn parse_league_details_json(raw: &str) -> Result<LeagueDetails> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(LeagueDetails::default());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid league details json")?;
    let Value::Object(mut map) = v else {
        return Ok(LeagueDetails::default());
    };

    let league = map.remove("league").unwrap_or(Value::Null);
    let name = league
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let current_event = map
        .get("current_event")
        .or_else(|| league.get("current_event"))
        .and_then(crate::player::value_to_f64)
        .filter(|v| *v >= 0.0)
        .map(|v| v as u32);

    Ok(LeagueDetails {
        name,
        current_event,
        entries: collect_items(map.remove("league_entries"), "league entry"),
        matches: collect_items(map.remove("matches"), "match"),
    })
}

/// `{"<league entry id>": [player ids]}`. Non-numeric keys and ids are dropped.
pub fn parse_rosters_json(raw: &str) -> Result<HashMap<u32, Vec<u32>>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(HashMap::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid rosters json")?;
    let Value::Object(map) = v else {
        return Ok(HashMap::new());
    };
    let mut out = HashMap::with_capacity(map.len());
    for (key, ids) in map {
        let Ok(entry) = key.trim().parse::<u32>() else {
            log::debug!("skipping roster with non-numeric key {key:?}");
            continue;
        };
        let ids = match &ids {
            Value::Array(items) => items.iter().filter_map(value_to_id).collect(),
            Value::Object(_) => picks_from_value(&ids),
            _ => Vec::new(),
        };
        out.insert(entry, ids);
    }
    Ok(out)
}

pub fn parse_picks_json(raw: &str) -> Result<Vec<u32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid picks json")?;
    Ok(picks_from_value(&v))
}

fn picks_from_value(v: &Value) -> Vec<u32> {
    let Some(Value::Array(picks)) = v.get("picks") else {
        return Vec::new();
    };
    picks
        .iter()
        .filter_map(|pick| pick.get("element").and_then(value_to_id))
        .collect()
}

fn value_to_id(v: &Value) -> Option<u32> {
    crate::player::value_to_f64(v)
        .filter(|n| *n > 0.0 && *n <= u32::MAX as f64 && n.fract() == 0.0)
        .map(|n| n as u32)
}

#[derive(Debug, Clone, Serialize)]
pub struct NextOpponent {
    pub opponent_id: u32,
    pub is_home: bool,
    /// No match left to play; this is the most recent finished one.
    pub is_last_match: bool,
    pub fixture: MatchRecord,
}

/// Opponent for `entry_id`: the unfinished match this gameweek, else the earliest
/// upcoming one, else the most recent finished one.
pub fn next_opponent(
    entry_id: u32,
    matches: &[MatchRecord],
    current_event: Option<u32>,
) -> Option<NextOpponent> {
    let current = current_event.unwrap_or(0);
    let involved = move || {
        matches
            .iter()
            .filter_map(move |m| m.side_of(entry_id).map(|side| (m, side)))
            .filter(|(m, side)| m.opponent(*side).is_some())
    };

    let this_week = involved()
        .find(|(m, _)| !m.finished && current_event.is_some() && m.event == current_event);
    let upcoming = || {
        involved()
            .filter(|(m, _)| !m.finished && m.event.unwrap_or(0) >= current)
            .min_by_key(|(m, _)| m.event.unwrap_or(u32::MAX))
    };

    if let Some((m, side)) = this_week.or_else(upcoming) {
        return Some(NextOpponent {
            opponent_id: m.opponent(side)?,
            is_home: side == Side::Home,
            is_last_match: false,
            fixture: m.clone(),
        });
    }

    let (m, side) = involved()
        .filter(|(m, _)| m.finished)
        .max_by_key(|(m, _)| m.event.unwrap_or(0))?;
    Some(NextOpponent {
        opponent_id: m.opponent(side)?,
        is_home: side == Side::Home,
        is_last_match: true,
        fixture: m.clone(),
    })
}
