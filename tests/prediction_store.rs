use chrono::{TimeZone, Utc};
use prode_terminal::models::Side;
use prode_terminal::predictions::{PredictionStore, parse_score_input};

#[test]
fn entering_home_score_defaults_away_to_zero() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "2");

    assert_eq!(store.get_score("g1", Side::Home), "2");
    assert_eq!(store.get_score("g1", Side::Away), "0");
    assert_eq!(store.count_pending(), 1);
}

#[test]
fn removing_pending_prediction_clears_it() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "2");
    store.remove_prediction("g1");

    assert!(!store.has_prediction("g1"));
    assert_eq!(store.count_pending(), 0);
    assert_eq!(store.get_score("g1", Side::Home), "");
}

#[test]
fn submitted_prediction_ignores_further_edits() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "2");
    store.update_score("g1", Side::Away, "1");
    store.mark_submitted("g1");
    let before = store.snapshot();

    store.update_score("g1", Side::Home, "9");

    assert_eq!(store.get_score("g1", Side::Home), "2");
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.count_pending(), 0);
}

#[test]
fn submitted_prediction_cannot_be_removed() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "3");
    store.mark_submitted("g1");
    store.remove_prediction("g1");

    assert!(store.has_prediction("g1"));
    assert!(store.is_submitted("g1"));
}

#[test]
fn last_write_per_side_wins_and_is_clamped() {
    let mut store = PredictionStore::new();
    let writes = [
        (Side::Home, "1"),
        (Side::Away, "4"),
        (Side::Home, "-3"),
        (Side::Away, "7"),
        (Side::Home, "12"),
        (Side::Away, "abc"),
    ];
    for (side, raw) in writes {
        store.update_score("g7", side, raw);
    }
    assert_eq!(store.get_score("g7", Side::Home), "12");
    assert_eq!(store.get_score("g7", Side::Away), "0");
}

#[test]
fn score_input_normalization() {
    assert_eq!(parse_score_input(""), 0);
    assert_eq!(parse_score_input(" 3 "), 3);
    assert_eq!(parse_score_input("-1"), 0);
    assert_eq!(parse_score_input("two"), 0);
}

#[test]
fn pending_count_matches_unfiltered_batch() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "1");
    store.update_score("g2", Side::Away, "2");
    store.update_score("g3", Side::Home, "0");
    store.mark_submitted("g2");

    let batch = store.build_batch(None);
    assert_eq!(store.count_pending(), batch.len());
    assert_eq!(batch.len(), 2);
    assert!(batch.iter().all(|p| p.external_id != "g2"));
}

#[test]
fn filtered_batch_only_includes_requested_pending_games() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "1");
    store.update_score("g2", Side::Home, "2");
    store.update_score("g3", Side::Away, "3");

    let batch = store.build_batch(Some(&["g2", "g3", "missing"]));
    let ids: Vec<&str> = batch.iter().map(|p| p.external_id.as_str()).collect();
    assert_eq!(ids, vec!["g2", "g3"]);
    assert_eq!(batch[1].prediction.scores, [0, 3]);
}

#[test]
fn batch_serializes_to_bulk_wire_shape() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "2");
    store.update_score("g1", Side::Away, "1");

    let json = serde_json::to_value(store.build_batch(None)).expect("serializes");
    assert_eq!(
        json,
        serde_json::json!([{ "externalId": "g1", "prediction": { "scores": [2, 1] } }])
    );
}

#[test]
fn mark_submitted_stamps_time() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "1");
    let at = Utc.with_ymd_and_hms(2025, 8, 24, 12, 0, 0).single().expect("valid time");
    store.mark_submitted_at("g1", at);

    let entry = store.prediction("g1").expect("entry");
    assert!(entry.submitted);
    assert_eq!(entry.submitted_at, Some(at));
}

#[test]
fn mark_submitted_on_unknown_game_is_noop() {
    let mut store = PredictionStore::new();
    store.mark_submitted("nope");
    assert!(!store.has_prediction("nope"));
}

#[test]
fn only_entries_matching_the_sent_batch_become_submitted() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "2");
    store.update_score("g2", Side::Home, "1");
    let sent = store.build_batch(None);

    store.update_score("g2", Side::Away, "3");
    let at = Utc.with_ymd_and_hms(2025, 8, 24, 12, 0, 0).single().expect("valid time");
    let marked = store.mark_sent_at(&sent, at);

    assert_eq!(marked, 1);
    assert!(store.is_submitted("g1"));
    assert!(!store.is_submitted("g2"));
    assert_eq!(store.get_score("g2", Side::Away), "3");
    assert_eq!(store.count_pending(), 1);
}

#[test]
fn sent_batch_for_removed_entry_is_ignored() {
    let mut store = PredictionStore::new();
    store.update_score("g1", Side::Home, "2");
    let sent = store.build_batch(None);
    store.remove_prediction("g1");

    assert_eq!(store.mark_sent(&sent), 0);
    assert!(!store.has_prediction("g1"));
}
