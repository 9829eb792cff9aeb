use std::collections::HashMap;

use serde::Serialize;

use crate::league::{LeagueEntry, MatchRecord, Side};
use crate::player::{PlayerIndex, ScoredPlayer, num};

/// Per-team summary. Match figures come from finished league matches; squad figures
/// are summed over the *current* roster only, so a team that traded mid-season shows
/// its current squad's season totals rather than what it actually fielded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamAggregate {
    pub team: String,
    pub entry_id: u32,
    pub squad_size: usize,
    pub sum_predicted: f64,
    pub sum_projected: f64,
    /// Summed `now_cost`, in tenths of a million.
    pub total_price: f64,
    pub sum_selected_by: f64,
    pub ga_total: f64,
    pub total_clean_sheets: f64,
    pub total_xgi: f64,
    pub total_def_con: f64,
    pub points_for: f64,
    pub points_against: f64,
    pub wins: u32,
    /// `wins * 3`; draws are not counted.
    pub table_points: u32,
}

pub fn compute_team_aggregate(
    entry: &LeagueEntry,
    roster: &[&ScoredPlayer],
    matches: &[MatchRecord],
) -> TeamAggregate {
    let mut out = TeamAggregate {
        team: entry.entry_name.clone(),
        entry_id: entry.id,
        squad_size: roster.len(),
        ..Default::default()
    };

    for m in matches.iter().filter(|m| m.finished) {
        let Some(side) = m.side_of(entry.id) else {
            continue;
        };
        let other = match side {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        };
        out.points_for += m.points(side);
        out.points_against += m.points(other);
        if m.winner == Some(side) {
            out.wins += 1;
        }
    }
    out.table_points = out.wins * 3;

    for p in roster {
        let r = &p.record;
        out.sum_predicted += p.predicted_points;
        out.sum_projected += p.headline_points();
        out.total_price += num(r.now_cost);
        out.sum_selected_by += num(r.selected_by_percent);
        out.ga_total += num(r.goals_scored) + num(r.assists);
        out.total_clean_sheets += num(r.clean_sheets);
        out.total_xgi += num(r.expected_goal_involvements);
        out.total_def_con += num(r.def_contrib_per90);
    }
    out
}

/// One aggregate per named entry, in entry order. Roster ids missing from the index
/// are skipped.
pub fn compute_league_aggregates(
    entries: &[LeagueEntry],
    rosters: &HashMap<u32, Vec<u32>>,
    index: &PlayerIndex,
    matches: &[MatchRecord],
) -> Vec<TeamAggregate> {
    entries
        .iter()
        .filter(|e| !e.entry_name.is_empty())
        .map(|entry| {
            let ids = rosters.get(&entry.id).map(Vec::as_slice).unwrap_or(&[]);
            let roster: Vec<&ScoredPlayer> = ids.iter().filter_map(|id| index.get(id)).collect();
            if roster.len() < ids.len() {
                log::debug!(
                    "{}: {} roster id(s) not in player index",
                    entry.entry_name,
                    ids.len() - roster.len()
                );
            }
            let agg = compute_team_aggregate(entry, &roster, matches);
            log::debug!(
                "{:<24} for {:>6.0}  against {:>6.0}  W{:<3} G+A {:>4.0}  xGI {:>6.2}",
                agg.team,
                agg.points_for,
                agg.points_against,
                agg.wins,
                agg.ga_total,
                agg.total_xgi
            );
            agg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerRecord;

    fn entry(id: u32, name: &str) -> LeagueEntry {
        LeagueEntry {
            id,
            entry_name: name.to_string(),
            ..Default::default()
        }
    }

    fn scored(id: u32, predicted: f64, goals: f64) -> ScoredPlayer {
        ScoredPlayer {
            record: PlayerRecord {
                id,
                goals_scored: Some(goals),
                assists: Some(1.0),
                now_cost: Some(55.0),
                ..Default::default()
            },
            predicted_points: predicted,
            projected_points: Some(predicted * 3.0),
            stability: 50,
        }
    }

    fn finished(a: u32, pa: f64, b: u32, pb: f64, winner: Option<Side>) -> MatchRecord {
        MatchRecord {
            event: Some(1),
            league_entry_1: Some(a),
            league_entry_1_points: Some(pa),
            league_entry_2: Some(b),
            league_entry_2_points: Some(pb),
            finished: true,
            started: true,
            winner,
        }
    }

    #[test]
    fn only_finished_matches_count() {
        let mut pending = finished(1, 70.0, 2, 10.0, Some(Side::Home));
        pending.finished = false;
        let matches = vec![finished(1, 50.0, 2, 40.0, Some(Side::Home)), pending];
        let agg = compute_team_aggregate(&entry(1, "A"), &[], &matches);
        assert_eq!(agg.points_for, 50.0);
        assert_eq!(agg.points_against, 40.0);
        assert_eq!(agg.wins, 1);
        assert_eq!(agg.table_points, 3);

        let b = compute_team_aggregate(&entry(2, "B"), &[], &matches);
        assert_eq!(b.points_for, 40.0);
        assert_eq!(b.wins, 0);
    }

    #[test]
    fn draws_are_not_wins() {
        let matches = vec![finished(2, 45.0, 1, 45.0, None)];
        let agg = compute_team_aggregate(&entry(1, "A"), &[], &matches);
        assert_eq!(agg.wins, 0);
        assert_eq!(agg.points_for, 45.0);
    }

    #[test]
    fn squad_totals_and_ordering() {
        let index = crate::scoring::build_index(&[scored(1, 4.0, 2.0), scored(2, 6.0, 0.0)]);
        let rosters = HashMap::from([(10, vec![1, 2, 99]), (20, vec![2])]);
        let entries = vec![entry(20, "Second"), entry(30, ""), entry(10, "First")];
        let aggs = compute_league_aggregates(&entries, &rosters, &index, &[]);
        let names: Vec<&str> = aggs.iter().map(|a| a.team.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);

        let first = &aggs[1];
        assert_eq!(first.squad_size, 2);
        assert_eq!(first.sum_predicted, 10.0);
        assert_eq!(first.sum_projected, 30.0);
        assert_eq!(first.ga_total, 4.0);
        assert_eq!(first.total_price, 110.0);
    }
}
