use std::fs;
use std::path::PathBuf;

use chrono::FixedOffset;
use prode_terminal::api::{parse_matchday_json, parse_or_default};
use prode_terminal::leaderboard::LeaderboardEntry;
use prode_terminal::models::{MatchStatus, match_status_label};
use prode_terminal::session::AuthenticatedUser;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn art() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("valid offset")
}

#[test]
fn parses_matchday_fixture() {
    let raw = read_fixture("current.json");
    let matchday = parse_matchday_json(&raw).expect("fixture should parse");
    assert_eq!(matchday.round_name, "Fecha 5");
    assert_eq!(matchday.games_by_date.len(), 2);
    assert_eq!(matchday.games().count(), 3);

    let g1 = matchday.game("g1").expect("g1 present");
    assert_eq!(g1.home_name(), "River Plate");
    assert_eq!(g1.away_name(), "Boca Juniors");
    assert_eq!(g1.kind(), MatchStatus::Finished);
    assert_eq!(g1.live_score(), Some([2, 1]));
    assert_eq!(g1.pronostics.len(), 2);
    assert_eq!(g1.pronostics[1].owner_name(), "Beto");
}

#[test]
fn game_without_scores_has_no_live_score_before_kickoff() {
    let raw = read_fixture("current.json");
    let matchday = parse_matchday_json(&raw).expect("fixture should parse");
    let g3 = matchday.game("g3").expect("g3 present");
    assert_eq!(g3.kind(), MatchStatus::NotStarted);
    assert!(g3.scores.is_none());
    assert_eq!(g3.live_score(), None);
    assert_eq!(g3.pronostics[0].score_pair(), [1, 0]);
}

#[test]
fn status_labels_follow_match_state() {
    let raw = read_fixture("current.json");
    let matchday = parse_matchday_json(&raw).expect("fixture should parse");
    let label = |id: &str| match_status_label(matchday.game(id).expect("game"), art());
    assert_eq!(label("g1"), "Finalizado");
    assert_eq!(label("g2"), "55'");
    assert_eq!(label("g3"), "21:00");
}

#[test]
fn matchday_null_is_empty() {
    let matchday = parse_matchday_json("null").expect("null should parse");
    assert!(matchday.games_by_date.is_empty());
    let matchday = parse_matchday_json("  ").expect("blank should parse");
    assert_eq!(matchday.games().count(), 0);
}

#[test]
fn parses_leaderboard_payload() {
    let raw = r#"[
        {"user": {"id": 8, "name": "Beto"}, "globalPoints": 12},
        {"user": {"id": 7, "name": "Ana", "email": "ana@example.com"}, "globalPoints": 9}
    ]"#;
    let entries: Vec<LeaderboardEntry> = parse_or_default(raw).expect("should parse");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].user.name, "Beto");
    assert_eq!(entries[1].global_points, 9);
}

#[test]
fn verify_response_accepts_snake_case_token() {
    let raw = r#"{"user": {"id": 7, "name": "Ana", "email": "ana@example.com"}, "access_token": "tok-1"}"#;
    let user: AuthenticatedUser = serde_json::from_str(raw).expect("should parse");
    assert_eq!(user.user.id, 7);
    assert_eq!(user.access_token.as_deref(), Some("tok-1"));
    assert_eq!(user.display_name(), "Ana");
}
