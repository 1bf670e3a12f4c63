use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use prode_terminal::api::parse_matchday_json;
use prode_terminal::models::{Game, MatchesByDate, PredictionScores, Pronostic, Side};
use prode_terminal::predictions::PredictionStore;

const CURRENT_JSON: &str = include_str!("../tests/fixtures/current.json");

fn synthetic_matchday(dates: usize, games_per_date: usize, players: i64) -> Vec<MatchesByDate> {
    (0..dates)
        .map(|d| MatchesByDate {
            date: format!("2025-08-{:02}", d + 1),
            matches: (0..games_per_date)
                .map(|g| {
                    let id = format!("g{d}-{g}");
                    Game {
                        id: id.clone(),
                        pronostics: (1..=players)
                            .map(|user_id| Pronostic {
                                id: user_id,
                                external_id: id.clone(),
                                user_id,
                                prediction: PredictionScores {
                                    scores: vec![user_id % 4, (user_id + g as i64) % 3],
                                },
                                updated_at: Some("2025-08-20T10:00:00.000Z".to_string()),
                                ..Pronostic::default()
                            })
                            .collect(),
                        ..Game::default()
                    }
                })
                .collect(),
        })
        .collect()
}

fn bench_matchday_parse(c: &mut Criterion) {
    c.bench_function("matchday_parse", |b| {
        b.iter(|| {
            let root = parse_matchday_json(black_box(CURRENT_JSON)).unwrap();
            black_box(root.games_by_date.len());
        })
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let matches = synthetic_matchday(4, 8, 200);
    c.bench_function("reconcile_server_matches", |b| {
        b.iter(|| {
            let mut store = PredictionStore::new();
            for g in 0..8 {
                store.update_score(&format!("g0-{g}"), Side::Home, "1");
            }
            store.ingest_server_matches(black_box(&matches), Some(42));
            black_box(store.count_pending());
        })
    });
}

criterion_group!(benches, bench_matchday_parse, bench_reconcile);
criterion_main!(benches);
