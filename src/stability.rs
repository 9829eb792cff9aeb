use crate::player::{PlayerRecord, num};

fn clamp_pct(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
}

/// Consistency score in `0..=100` from form, finishing against xG, minutes share and
/// how closely form tracks the season average.
pub fn stability_index(p: &PlayerRecord) -> u8 {
    let games = p.games_played();
    let form = num(p.form);
    let minutes = num(p.minutes);

    // Capped but not floored: negative form pulls the index down.
    let form_stability = (form * 10.0).min(100.0);

    let goals_pg = num(p.goals_scored) / games;
    let xg_pg = num(p.expected_goals) / games;
    let xg_accuracy = clamp_pct(100.0 - (goals_pg - xg_pg).abs() * 100.0);

    let appearances = match p.appearances.filter(|a| *a > 0.0) {
        Some(a) => a,
        None => games,
    };
    let minutes_stability = clamp_pct(minutes / appearances.max(1.0) / 90.0 * 100.0);

    let points_pg = num(p.total_points) / games;
    let points_stability = clamp_pct(100.0 - (form - points_pg).abs() * 20.0);

    let score = form_stability * 0.4
        + xg_accuracy * 0.3
        + minutes_stability * 0.2
        + points_stability * 0.1;
    clamp_pct(score.round()) as u8
}
