use rayon::prelude::*;

use crate::player::{PlayerIndex, PlayerRecord, ScoredPlayer};
use crate::predictor::{MAX_POINTS_PER_GW, PointPredictor};
use crate::stability::stability_index;

fn score_one(player: &PlayerRecord, predictor: &dyn PointPredictor) -> ScoredPlayer {
    let prediction = predictor.score(player);
    ScoredPlayer {
        record: player.clone(),
        predicted_points: prediction.next_gw.clamp(0.0, MAX_POINTS_PER_GW),
        projected_points: prediction.projection,
        stability: stability_index(player),
    }
}

/// Scores every player, output order matching input order. An uncomputable player
/// scores 0 rather than aborting the batch.
pub fn score_players(
    players: &[PlayerRecord],
    predictor: &dyn PointPredictor,
    parallel: bool,
) -> Vec<ScoredPlayer> {
    if !parallel || players.len() < 2 {
        return players.iter().map(|p| score_one(p, predictor)).collect();
    }
    players.par_iter().map(|p| score_one(p, predictor)).collect()
}

/// Same as [`score_players`] but runs on a dedicated pool of `threads` workers.
pub fn score_players_with_threads(
    players: &[PlayerRecord],
    predictor: &dyn PointPredictor,
    threads: usize,
) -> Vec<ScoredPlayer> {
    match build_scoring_pool(threads) {
        Some(pool) => pool.install(|| score_players(players, predictor, true)),
        None => score_players(players, predictor, true),
    }
}

fn build_scoring_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.clamp(1, 64))
        .thread_name(|i| format!("scoring-{i}"))
        .build()
        .map_err(|err| log::warn!("scoring pool build failed, using global pool: {err}"))
        .ok()
}

/// Id to scored player. Later duplicates replace earlier ones.
pub fn build_index(scored: &[ScoredPlayer]) -> PlayerIndex {
    scored.iter().map(|p| (p.id(), p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ScoringError, ScoringResult};
    use crate::predictor::{HeuristicPredictor, Prediction};

    struct Fails;

    impl PointPredictor for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }

        fn try_score(&self, player: &PlayerRecord) -> ScoringResult<Prediction> {
            if player.id % 2 == 0 {
                Err(ScoringError::NonFinite {
                    player_id: player.id,
                    stage: "test",
                })
            } else {
                Ok(Prediction {
                    next_gw: 99.0,
                    projection: None,
                })
            }
        }
    }

    fn roster(n: u32) -> Vec<PlayerRecord> {
        (1..=n)
            .map(|id| PlayerRecord {
                id,
                form: Some(id as f64 / 10.0),
                minutes: Some(900.0),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn parallel_preserves_order_and_values() {
        let players = roster(500);
        let h = HeuristicPredictor::default();
        let serial = score_players(&players, &h, false);
        let parallel = score_players(&players, &h, true);
        let pooled = score_players_with_threads(&players, &h, 3);
        assert_eq!(serial.len(), 500);
        for ((a, b), c) in serial.iter().zip(&parallel).zip(&pooled) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.id(), c.id());
            assert_eq!(a.predicted_points.to_bits(), b.predicted_points.to_bits());
            assert_eq!(a.projected_points, c.projected_points);
        }
        let ids: Vec<u32> = parallel.iter().map(ScoredPlayer::id).collect();
        assert_eq!(ids, (1..=500).collect::<Vec<_>>());
    }

    #[test]
    fn failures_score_zero_and_output_is_clipped() {
        let scored = score_players(&roster(4), &Fails, true);
        let points: Vec<f64> = scored.iter().map(|p| p.predicted_points).collect();
        assert_eq!(points, vec![15.0, 0.0, 15.0, 0.0]);
    }

    #[test]
    fn empty_input() {
        assert!(score_players(&[], &HeuristicPredictor::default(), true).is_empty());
    }

    #[test]
    fn index_by_id() {
        let scored = score_players(&roster(3), &HeuristicPredictor::default(), false);
        let index = build_index(&scored);
        assert_eq!(index.len(), 3);
        assert_eq!(index[&2].record.id, 2);
    }
}
