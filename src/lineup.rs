use serde::Serialize;

use crate::player::{Position, ScoredPlayer, num};

const OUTFIELD_SLOTS: usize = 10;
const MIN_DEFENDERS: usize = 3;
const MIN_FORWARDS: usize = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineupStats {
    pub predicted: f64,
    pub last_gw: f64,
    pub ppg90: f64,
    pub form: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Lineup<'a> {
    /// Goalkeeper first, then defenders, midfielders and forwards.
    pub starting: Vec<&'a ScoredPlayer>,
    pub bench: Vec<&'a ScoredPlayer>,
    pub stats: LineupStats,
}

fn by_prediction<'a>(mut players: Vec<&'a ScoredPlayer>) -> Vec<&'a ScoredPlayer> {
    players.sort_by(|a, b| b.predicted_points.total_cmp(&a.predicted_points));
    players
}

fn of_position<'a>(squad: &[&'a ScoredPlayer], pos: Position) -> Vec<&'a ScoredPlayer> {
    by_prediction(
        squad
            .iter()
            .copied()
            .filter(|p| p.record.position() == Some(pos))
            .collect(),
    )
}

/// Highest-predicted eleven with one goalkeeper, at least three defenders and at
/// least one forward. Squads too thin for that field as many as they can.
pub fn best_lineup<'a>(squad: &[&'a ScoredPlayer]) -> Lineup<'a> {
    let mut starting = Vec::with_capacity(11);
    let mut bench = Vec::new();

    let mut keepers = of_position(squad, Position::Goalkeeper).into_iter();
    starting.extend(keepers.next());
    bench.extend(keepers);

    let mut pool = Vec::new();
    let defenders = of_position(squad, Position::Defender);
    let (forced, rest) = defenders.split_at(defenders.len().min(MIN_DEFENDERS));
    starting.extend_from_slice(forced);
    pool.extend_from_slice(rest);

    let forwards = of_position(squad, Position::Forward);
    let (forced, rest) = forwards.split_at(forwards.len().min(MIN_FORWARDS));
    starting.extend_from_slice(forced);
    pool.extend_from_slice(rest);

    pool.extend(of_position(squad, Position::Midfielder));

    let outfield = starting
        .iter()
        .filter(|p| p.record.position() != Some(Position::Goalkeeper))
        .count();
    let open = OUTFIELD_SLOTS.saturating_sub(outfield);
    let mut pool = by_prediction(pool).into_iter();
    starting.extend(pool.by_ref().take(open));
    bench.extend(pool);
    bench.extend(squad.iter().copied().filter(|p| p.record.position().is_none()));

    starting.sort_by_key(|p| p.record.element_type.unwrap_or(u8::MAX));
    let stats = lineup_stats(&starting);
    Lineup {
        starting,
        bench,
        stats,
    }
}

pub fn lineup_stats(starting: &[&ScoredPlayer]) -> LineupStats {
    if starting.is_empty() {
        return LineupStats::default();
    }
    let n = starting.len() as f64;
    LineupStats {
        predicted: starting.iter().map(|p| p.predicted_points).sum(),
        last_gw: starting.iter().map(|p| num(p.record.event_points)).sum(),
        ppg90: starting
            .iter()
            .map(|p| num(p.record.points_per_game_90))
            .sum::<f64>()
            / n,
        form: starting.iter().map(|p| num(p.record.form)).sum::<f64>() / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerRecord;

    fn scored(id: u32, element_type: u8, predicted: f64) -> ScoredPlayer {
        ScoredPlayer {
            record: PlayerRecord {
                id,
                element_type: Some(element_type),
                event_points: Some(2.0),
                form: Some(predicted),
                ..Default::default()
            },
            predicted_points: predicted,
            projected_points: None,
            stability: 0,
        }
    }

    fn count(lineup: &Lineup<'_>, pos: Position) -> usize {
        lineup
            .starting
            .iter()
            .filter(|p| p.record.position() == Some(pos))
            .count()
    }

    #[test]
    fn forces_formation_minimums() {
        // Midfielders dominate on prediction but three defenders and a forward still start.
        let mut squad = vec![scored(1, 1, 4.0), scored(2, 1, 6.0)];
        squad.extend((10..15).map(|id| scored(id, 2, 1.0 + id as f64 / 100.0)));
        squad.extend((20..26).map(|id| scored(id, 3, 8.0)));
        squad.extend((30..32).map(|id| scored(id, 4, 0.5)));
        let refs: Vec<&ScoredPlayer> = squad.iter().collect();

        let lineup = best_lineup(&refs);
        assert_eq!(lineup.starting.len(), 11);
        assert_eq!(lineup.bench.len(), 4);
        assert_eq!(count(&lineup, Position::Goalkeeper), 1);
        assert_eq!(count(&lineup, Position::Defender), 3);
        assert_eq!(count(&lineup, Position::Midfielder), 6);
        assert_eq!(count(&lineup, Position::Forward), 1);
        assert_eq!(lineup.starting[0].id(), 2);
        assert!(lineup.starting.iter().any(|p| p.id() == 14));
        assert!(lineup.bench.iter().any(|p| p.id() == 10));
        assert_eq!(lineup.stats.last_gw, 22.0);
    }

    #[test]
    fn surplus_outfielders_fill_by_prediction() {
        let mut squad = vec![scored(1, 1, 3.0)];
        squad.extend((10..15).map(|id| scored(id, 2, 7.0)));
        squad.extend((20..25).map(|id| scored(id, 3, 5.0)));
        squad.extend((30..33).map(|id| scored(id, 4, 6.0)));
        let refs: Vec<&ScoredPlayer> = squad.iter().collect();

        let lineup = best_lineup(&refs);
        assert_eq!(count(&lineup, Position::Defender), 5);
        assert_eq!(count(&lineup, Position::Forward), 3);
        assert_eq!(count(&lineup, Position::Midfielder), 2);
        assert!((lineup.stats.predicted - (3.0 + 35.0 + 18.0 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn thin_squad_does_not_panic() {
        let squad = [scored(1, 3, 2.0), scored(2, 9, 1.0)];
        let refs: Vec<&ScoredPlayer> = squad.iter().collect();
        let lineup = best_lineup(&refs);
        assert_eq!(lineup.starting.len(), 1);
        assert_eq!(lineup.bench.len(), 1);
        assert_eq!(lineup.stats.form, 2.0);
    }
}
