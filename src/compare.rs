use serde::Serialize;

use crate::player::{PlayerIndex, ScoredPlayer, num};

pub const STARTING_ELEVEN: usize = 11;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RosterStats {
    /// Predicted points of the top eleven.
    pub x_pts: f64,
    /// Whole-squad season xGI.
    pub x_gi: f64,
    /// Whole-squad form.
    pub form: f64,
    pub starters: Vec<u32>,
    pub squad_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinSplit {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchupComparison {
    pub team_a: u32,
    pub team_b: u32,
    pub win_prob_a: f64,
    pub win_prob_b: f64,
    pub stats_a: RosterStats,
    pub stats_b: RosterStats,
}

/// Implementations return a split summing to 100.
pub trait WinProbabilityEngine: Send + Sync {
    fn win_probability(
        &self,
        team_a: u32,
        team_b: u32,
        roster_a: &[u32],
        roster_b: &[u32],
        index: &PlayerIndex,
    ) -> WinSplit;
}

/// Logistic on the difference in top-eleven expected points. `scale` is the gap that
/// gives roughly 91/9.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedPointsLogistic {
    pub scale: f64,
}

impl Default for ExpectedPointsLogistic {
    fn default() -> Self {
        Self { scale: 20.0 }
    }
}

impl ExpectedPointsLogistic {
    pub fn split(&self, x_pts_a: f64, x_pts_b: f64) -> WinSplit {
        let diff = x_pts_a - x_pts_b;
        let p = 1.0 / (1.0 + 10f64.powf(-diff / self.scale.max(1e-6)));
        let a = if p.is_finite() {
            (p * 1000.0).round() / 10.0
        } else {
            50.0
        };
        // Residue goes to the second side so the pair is exactly 100.
        WinSplit { a, b: 100.0 - a }
    }
}

impl WinProbabilityEngine for ExpectedPointsLogistic {
    fn win_probability(
        &self,
        _team_a: u32,
        _team_b: u32,
        roster_a: &[u32],
        roster_b: &[u32],
        index: &PlayerIndex,
    ) -> WinSplit {
        let a = roster_stats(&resolve(roster_a, index));
        let b = roster_stats(&resolve(roster_b, index));
        self.split(a.x_pts, b.x_pts)
    }
}

fn resolve<'a>(ids: &[u32], index: &'a PlayerIndex) -> Vec<&'a ScoredPlayer> {
    ids.iter().filter_map(|id| index.get(id)).collect()
}

/// Eleven highest single-gameweek predictions, ties kept in roster order.
pub fn top_eleven<'a>(roster: &[&'a ScoredPlayer]) -> Vec<&'a ScoredPlayer> {
    let mut sorted = roster.to_vec();
    sorted.sort_by(|a, b| b.predicted_points.total_cmp(&a.predicted_points));
    sorted.truncate(STARTING_ELEVEN);
    sorted
}

pub fn roster_stats(roster: &[&ScoredPlayer]) -> RosterStats {
    let starters = top_eleven(roster);
    RosterStats {
        x_pts: starters.iter().map(|p| p.predicted_points).sum(),
        x_gi: roster
            .iter()
            .map(|p| num(p.record.expected_goal_involvements))
            .sum(),
        form: roster.iter().map(|p| num(p.record.form)).sum(),
        starters: starters.iter().map(|p| p.id()).collect(),
        squad_size: roster.len(),
    }
}

pub fn compare_rosters(
    team_a: u32,
    team_b: u32,
    roster_a: &[u32],
    roster_b: &[u32],
    index: &PlayerIndex,
    engine: &dyn WinProbabilityEngine,
) -> MatchupComparison {
    let stats_a = roster_stats(&resolve(roster_a, index));
    let stats_b = roster_stats(&resolve(roster_b, index));
    let split = engine.win_probability(team_a, team_b, roster_a, roster_b, index);
    MatchupComparison {
        team_a,
        team_b,
        win_prob_a: split.a,
        win_prob_b: split.b,
        stats_a,
        stats_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerRecord;
    use crate::scoring::build_index;

    fn scored(id: u32, predicted: f64) -> ScoredPlayer {
        ScoredPlayer {
            record: PlayerRecord {
                id,
                form: Some(1.0),
                expected_goal_involvements: Some(0.5),
                ..Default::default()
            },
            predicted_points: predicted,
            projected_points: None,
            stability: 0,
        }
    }

    #[test]
    fn top_eleven_drops_bottom_four() {
        let squad: Vec<ScoredPlayer> = (1..=15).map(|id| scored(id, id as f64)).collect();
        let refs: Vec<&ScoredPlayer> = squad.iter().collect();
        let stats = roster_stats(&refs);
        // 5 + 6 + ... + 15
        assert_eq!(stats.x_pts, 110.0);
        assert_eq!(stats.x_gi, 7.5);
        assert_eq!(stats.form, 15.0);
        assert_eq!(stats.starters.len(), 11);
        assert!(!stats.starters.contains(&4));
    }

    #[test]
    fn ties_keep_roster_order() {
        let squad: Vec<ScoredPlayer> = (1..=13).map(|id| scored(id, 2.0)).collect();
        let refs: Vec<&ScoredPlayer> = squad.iter().collect();
        let top: Vec<u32> = top_eleven(&refs).iter().map(|p| p.id()).collect();
        assert_eq!(top, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn split_sums_to_100() {
        let engine = ExpectedPointsLogistic::default();
        for (a, b) in [(50.0, 50.0), (60.0, 40.0), (0.0, 300.0), (33.3, 31.7)] {
            let s = engine.split(a, b);
            assert_eq!(s.a + s.b, 100.0);
            assert!((0.0..=100.0).contains(&s.a));
        }
        assert_eq!(engine.split(40.0, 40.0).a, 50.0);
        assert_eq!(engine.split(60.0, 40.0).a, 90.9);
    }

    #[test]
    fn compare_uses_index_and_engine() {
        let players: Vec<ScoredPlayer> = (1..=4).map(|id| scored(id, id as f64 * 2.0)).collect();
        let index = build_index(&players);
        let cmp = compare_rosters(
            10,
            20,
            &[3, 4, 99],
            &[1, 2],
            &index,
            &ExpectedPointsLogistic::default(),
        );
        assert_eq!(cmp.stats_a.x_pts, 14.0);
        assert_eq!(cmp.stats_b.x_pts, 6.0);
        assert_eq!(cmp.stats_a.squad_size, 2);
        assert!(cmp.win_prob_a > cmp.win_prob_b);
        assert_eq!(cmp.win_prob_a + cmp.win_prob_b, 100.0);
    }
}
