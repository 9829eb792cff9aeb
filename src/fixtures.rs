use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::player::{PlayerRecord, bool_or_false, float_or_none, num, u32_or_none, u32_or_zero};

/// Per-player fixture multiplier. `1.0` is an average run of fixtures, above is easier.
pub trait FixtureDifficulty: Send + Sync {
    fn multiplier(&self, player: &PlayerRecord) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralDifficulty;

impl FixtureDifficulty for NeutralDifficulty {
    fn multiplier(&self, _player: &PlayerRecord) -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStrength {
    #[serde(deserialize_with = "u32_or_zero")]
    pub id: u32,
    #[serde(deserialize_with = "float_or_none")]
    pub strength_attack_home: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub strength_attack_away: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub strength_defence_home: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub strength_defence_away: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    #[serde(deserialize_with = "u32_or_zero")]
    pub id: u32,
    #[serde(deserialize_with = "u32_or_none")]
    pub event: Option<u32>,
    #[serde(deserialize_with = "u32_or_zero")]
    pub team_h: u32,
    #[serde(deserialize_with = "u32_or_zero")]
    pub team_a: u32,
    #[serde(deserialize_with = "bool_or_false")]
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct TeamStrengthDifficulty {
    strengths: HashMap<u32, TeamStrength>,
    upcoming: HashMap<u32, Vec<Fixture>>,
    horizon: usize,
}

impl TeamStrengthDifficulty {
    pub fn new(strengths: Vec<TeamStrength>, fixtures: &[Fixture], horizon: usize) -> Self {
        Self {
            strengths: strengths.into_iter().map(|t| (t.id, t)).collect(),
            upcoming: upcoming_by_team(fixtures),
            horizon: horizon.max(1),
        }
    }

    pub fn upcoming_for(&self, team: u32) -> &[Fixture] {
        self.upcoming.get(&team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mean `attack / max(defence, 1)` over the next `horizon` fixtures, `1.0` without data.
    pub fn difficulty(&self, team: u32) -> f64 {
        let Some(ours) = self.strengths.get(&team) else {
            return 1.0;
        };
        let mut total = 0.0;
        let mut count = 0usize;
        for fixture in self.upcoming_for(team).iter().take(self.horizon) {
            let is_home = fixture.team_h == team;
            let opponent_id = if is_home {
                fixture.team_a
            } else {
                fixture.team_h
            };
            let Some(theirs) = self.strengths.get(&opponent_id) else {
                continue;
            };
            let attack = if is_home {
                num(ours.strength_attack_home)
            } else {
                num(ours.strength_attack_away)
            };
            let defence = if is_home {
                num(theirs.strength_defence_home)
            } else {
                num(theirs.strength_defence_away)
            };
            total += attack / defence.max(1.0);
            count += 1;
        }
        if count == 0 {
            1.0
        } else {
            total / count as f64
        }
    }
}

impl FixtureDifficulty for TeamStrengthDifficulty {
    fn multiplier(&self, player: &PlayerRecord) -> f64 {
        self.difficulty(player.team)
    }
}

/// Unfinished fixtures per team, earliest gameweek first. Unscheduled fixtures sort last.
pub fn upcoming_by_team(fixtures: &[Fixture]) -> HashMap<u32, Vec<Fixture>> {
    let mut out: HashMap<u32, Vec<Fixture>> = HashMap::new();
    for f in fixtures.iter().filter(|f| !f.finished) {
        out.entry(f.team_h).or_default().push(f.clone());
        out.entry(f.team_a).or_default().push(f.clone());
    }
    for list in out.values_mut() {
        list.sort_by_key(|f| (f.event.is_none(), f.event.unwrap_or(0)));
    }
    out
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid fixtures json")?;
    let Value::Array(items) = v else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Fixture>(item).ok())
        .collect())
}

pub fn parse_team_strengths_json(raw: &str) -> Result<Vec<TeamStrength>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid bootstrap json")?;
    let teams = match v {
        Value::Object(mut map) => map.remove("teams").unwrap_or(Value::Null),
        other => other,
    };
    let Value::Array(items) = teams else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<TeamStrength>(item).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32, attack: f64, defence: f64) -> TeamStrength {
        TeamStrength {
            id,
            strength_attack_home: Some(attack),
            strength_attack_away: Some(attack),
            strength_defence_home: Some(defence),
            strength_defence_away: Some(defence),
        }
    }

    fn fixture(id: u32, event: u32, h: u32, a: u32, finished: bool) -> Fixture {
        Fixture {
            id,
            event: Some(event),
            team_h: h,
            team_a: a,
            finished,
        }
    }

    #[test]
    fn neutral_is_one() {
        assert_eq!(NeutralDifficulty.multiplier(&PlayerRecord::default()), 1.0);
    }

    #[test]
    fn averages_next_fixtures_only() {
        let teams = vec![team(1, 1200.0, 1000.0), team(2, 1000.0, 1200.0), team(3, 1000.0, 600.0)];
        let fixtures = vec![
            fixture(10, 1, 1, 2, true),
            fixture(12, 3, 3, 1, false),
            fixture(11, 2, 1, 2, false),
            fixture(13, 9, 1, 3, false),
        ];
        let d = TeamStrengthDifficulty::new(teams, &fixtures, 2);
        let next: Vec<u32> = d.upcoming_for(1).iter().map(|f| f.id).collect();
        assert_eq!(next, vec![11, 12, 13]);
        // 1200/1200 then 1200/600, the third fixture is past the horizon.
        assert!((d.difficulty(1) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_team_is_neutral() {
        let d = TeamStrengthDifficulty::new(Vec::new(), &[], 3);
        assert_eq!(d.difficulty(42), 1.0);
    }

    #[test]
    fn parses_teams_from_bootstrap() {
        let raw = r#"{"elements": [], "teams": [{"id": 4, "strength_attack_home": "1250", "strength_defence_away": 1100}]}"#;
        let teams = parse_team_strengths_json(raw).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(num(teams[0].strength_attack_home), 1250.0);
        assert_eq!(teams[0].strength_attack_away, None);
    }
}
