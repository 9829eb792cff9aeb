use std::fs;
use std::path::PathBuf;

use draft_insights::aggregate::compute_league_aggregates;
use draft_insights::compare::{ExpectedPointsLogistic, compare_rosters};
use draft_insights::league::{next_opponent, parse_league_details_json, parse_rosters_json};
use draft_insights::lineup::best_lineup;
use draft_insights::player::{PlayerIndex, Position, ScoredPlayer, parse_bootstrap_players_json};
use draft_insights::predictor::HeuristicPredictor;
use draft_insights::scoring::{build_index, score_players};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn scored_index() -> PlayerIndex {
    let players = parse_bootstrap_players_json(&read_fixture("bootstrap_sample.json"))
        .expect("fixture should parse");
    build_index(&score_players(&players, &HeuristicPredictor::default(), true))
}

#[test]
fn parses_league_fixture() {
    let details = parse_league_details_json(&read_fixture("league_details.json")).unwrap();
    assert_eq!(details.name, "Office Draft");
    assert_eq!(details.current_event, Some(3));
    assert_eq!(details.entries.len(), 4);
    assert_eq!(details.matches.len(), 5);
    assert_eq!(details.matches[1].league_entry_1_points, Some(38.0));

    let rosters = parse_rosters_json(&read_fixture("rosters.json")).unwrap();
    assert_eq!(rosters.len(), 3);
    assert_eq!(rosters[&101].len(), 8);
}

#[test]
fn league_aggregates_from_fixtures() {
    let details = parse_league_details_json(&read_fixture("league_details.json")).unwrap();
    let rosters = parse_rosters_json(&read_fixture("rosters.json")).unwrap();
    let index = scored_index();

    let aggs = compute_league_aggregates(&details.entries, &rosters, &index, &details.matches);
    let names: Vec<&str> = aggs.iter().map(|a| a.team.as_str()).collect();
    assert_eq!(
        names,
        vec!["North London Forever", "Blue Is The Colour", "Tractor Boys"]
    );

    let north = &aggs[0];
    assert_eq!(north.points_for, 88.0);
    assert_eq!(north.points_against, 78.0);
    assert_eq!(north.wins, 1);
    assert_eq!(north.table_points, 3);
    // Id 99 is not in the player index.
    assert_eq!(north.squad_size, 7);
    assert_eq!(north.ga_total, 30.0);
    assert_eq!(north.total_price, 430.0);

    let blue = &aggs[1];
    assert_eq!(blue.points_for, 101.0);
    assert_eq!(blue.points_against, 80.0);
    assert_eq!(blue.wins, 1);

    let tractor = &aggs[2];
    assert_eq!(tractor.points_for, 68.0);
    assert_eq!(tractor.points_against, 99.0);
    assert_eq!(tractor.wins, 0);
    assert_eq!(tractor.table_points, 0);
}

#[test]
fn next_opponents_from_fixture() {
    let details = parse_league_details_json(&read_fixture("league_details.json")).unwrap();
    let current = details.resolve_current_event();

    let north = next_opponent(101, &details.matches, current).unwrap();
    assert_eq!(north.opponent_id, 102);
    assert!(!north.is_home);
    assert!(!north.is_last_match);

    let tractor = next_opponent(104, &details.matches, current).unwrap();
    assert_eq!(tractor.opponent_id, 101);
    assert_eq!(tractor.fixture.event, Some(4));
    assert!(!tractor.is_home);
}

#[test]
fn rival_comparison_from_fixtures() {
    let rosters = parse_rosters_json(&read_fixture("rosters.json")).unwrap();
    let index = scored_index();

    let cmp = compare_rosters(
        101,
        102,
        &rosters[&101],
        &rosters[&102],
        &index,
        &ExpectedPointsLogistic::default(),
    );
    assert!((cmp.stats_a.x_pts - 41.35).abs() < 1e-9);
    assert!((cmp.stats_b.x_pts - 32.795).abs() < 1e-9);
    assert_eq!(cmp.stats_a.starters.len(), 7);
    assert!(cmp.win_prob_a > 50.0);
    assert_eq!(cmp.win_prob_a + cmp.win_prob_b, 100.0);
}

#[test]
fn best_lineup_for_short_roster() {
    let rosters = parse_rosters_json(&read_fixture("rosters.json")).unwrap();
    let index = scored_index();
    let squad: Vec<&ScoredPlayer> = rosters[&101].iter().filter_map(|id| index.get(id)).collect();

    let lineup = best_lineup(&squad);
    assert_eq!(lineup.starting.len(), 7);
    assert!(lineup.bench.is_empty());
    assert_eq!(lineup.starting[0].record.position(), Some(Position::Goalkeeper));
    assert!((lineup.stats.predicted - 41.35).abs() < 1e-9);
}
