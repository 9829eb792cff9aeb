use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use draft_insights::aggregate::{TeamAggregate, compute_league_aggregates};
use draft_insights::compare::{ExpectedPointsLogistic, compare_rosters};
use draft_insights::config::ScoringConfig;
use draft_insights::fixtures::{
    FixtureDifficulty, TeamStrengthDifficulty, parse_fixtures_json, parse_team_strengths_json,
};
use draft_insights::league::{LeagueDetails, next_opponent, parse_league_details_json, parse_rosters_json};
use draft_insights::lineup::best_lineup;
use draft_insights::player::{PlayerIndex, ScoredPlayer, parse_bootstrap_players_json};
use draft_insights::scoring::{build_index, score_players, score_players_with_threads};

const TOP_N: usize = 15;
const FIXTURE_HORIZON: usize = 3;

fn read(path: &Path, label: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {label} {}", path.display()))
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let Some(bootstrap_path) = args.next() else {
        eprintln!(
            "usage: draft_insights <bootstrap.json> [league.json] [rosters.json] [fixtures.json]"
        );
        std::process::exit(2);
    };
    let league_path = args.next();
    let rosters_path = args.next();
    let fixtures_path = args.next();

    let config = ScoringConfig::from_env();
    let bootstrap = read(&bootstrap_path, "bootstrap")?;
    let players = parse_bootstrap_players_json(&bootstrap)?;

    let difficulty: Option<Box<dyn FixtureDifficulty>> = match &fixtures_path {
        Some(path) => {
            let fixtures = parse_fixtures_json(&read(path, "fixtures")?)?;
            let teams = parse_team_strengths_json(&bootstrap)?;
            log::info!("{:<32}{:<32}", "fixtures", fixtures.len());
            let hook: Box<dyn FixtureDifficulty> =
                Box::new(TeamStrengthDifficulty::new(teams, &fixtures, FIXTURE_HORIZON));
            Some(hook)
        }
        None => None,
    };
    let predictor = config.build_predictor(difficulty)?;

    let scored = match config.threads {
        Some(threads) if config.parallel => {
            score_players_with_threads(&players, predictor.as_ref(), threads)
        }
        _ => score_players(&players, predictor.as_ref(), config.parallel),
    };
    let index = build_index(&scored);

    println!(
        "draft insights  {}  strategy={}  players={}",
        Local::now().format("%Y-%m-%d %H:%M"),
        predictor.name(),
        scored.len()
    );
    print_top(&scored);

    let Some(league_path) = league_path else {
        return Ok(());
    };
    let details = parse_league_details_json(&read(&league_path, "league details")?)?;
    let rosters = match &rosters_path {
        Some(path) => parse_rosters_json(&read(path, "rosters")?)?,
        None => HashMap::new(),
    };

    let aggregates = compute_league_aggregates(&details.entries, &rosters, &index, &details.matches);
    print_aggregates(&aggregates);
    print_rival(&details, &rosters, &index);
    Ok(())
}

fn print_top(scored: &[ScoredPlayer]) {
    let mut ranked: Vec<&ScoredPlayer> = scored.iter().collect();
    ranked.sort_by(|a, b| b.headline_points().total_cmp(&a.headline_points()));

    println!();
    println!("{:<20} {:<4} {:>6} {:>7} {:>5}", "player", "pos", "next", "proj", "stab");
    for p in ranked.into_iter().take(TOP_N) {
        let pos = p.record.position().map(|p| p.short()).unwrap_or("-");
        let proj = p
            .projected_points
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<4} {:>6.1} {:>7} {:>5}",
            p.record.web_name, pos, p.predicted_points, proj, p.stability
        );
    }
}

fn print_aggregates(aggregates: &[TeamAggregate]) {
    if aggregates.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<24} {:>3} {:>4} {:>6} {:>6} {:>7} {:>5} {:>6}",
        "team", "W", "Pts", "for", "agst", "pred", "G+A", "xGI"
    );
    for a in aggregates {
        println!(
            "{:<24} {:>3} {:>4} {:>6.0} {:>6.0} {:>7.1} {:>5.0} {:>6.2}",
            a.team,
            a.wins,
            a.table_points,
            a.points_for,
            a.points_against,
            a.sum_predicted,
            a.ga_total,
            a.total_xgi
        );
    }
    println!("(squad columns reflect current rosters, not season history)");
}

fn print_rival(details: &LeagueDetails, rosters: &HashMap<u32, Vec<u32>>, index: &PlayerIndex) {
    let Some(me) = details.entries.iter().find(|e| !e.entry_name.is_empty()) else {
        return;
    };
    let empty = Vec::new();
    let my_roster = rosters.get(&me.id).unwrap_or(&empty);

    if let Some(next) = next_opponent(me.id, &details.matches, details.resolve_current_event()) {
        let rival_name = details
            .entry(next.opponent_id)
            .map(|e| e.entry_name.as_str())
            .unwrap_or("unknown");
        let their_roster = rosters.get(&next.opponent_id).unwrap_or(&empty);
        let cmp = compare_rosters(
            me.id,
            next.opponent_id,
            my_roster,
            their_roster,
            index,
            &ExpectedPointsLogistic::default(),
        );
        println!();
        println!(
            "{} vs {} ({}{}, GW {})",
            me.entry_name,
            rival_name,
            if next.is_home { "home" } else { "away" },
            if next.is_last_match { ", last match" } else { "" },
            next.fixture
                .event
                .map(|e| e.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        println!(
            "  xPts {:>6.1} vs {:>6.1}   xGI {:>5.2} vs {:>5.2}   form {:>5.1} vs {:>5.1}",
            cmp.stats_a.x_pts,
            cmp.stats_b.x_pts,
            cmp.stats_a.x_gi,
            cmp.stats_b.x_gi,
            cmp.stats_a.form,
            cmp.stats_b.form
        );
        println!("  win {:.1}% / {:.1}%", cmp.win_prob_a, cmp.win_prob_b);
    }

    let squad: Vec<&ScoredPlayer> = my_roster.iter().filter_map(|id| index.get(id)).collect();
    if squad.is_empty() {
        return;
    }
    let lineup = best_lineup(&squad);
    println!();
    println!(
        "best XI for {}: {:.1} pts predicted, {:.0} last GW",
        me.entry_name, lineup.stats.predicted, lineup.stats.last_gw
    );
    for p in &lineup.starting {
        let pos = p.record.position().map(|p| p.short()).unwrap_or("-");
        println!("  {:<4} {:<20} {:>5.1}", pos, p.record.web_name, p.predicted_points);
    }
    let bench: Vec<&str> = lineup.bench.iter().map(|p| p.record.web_name.as_str()).collect();
    println!("  bench: {}", bench.join(", "));
}
