//! Benchmarks for leaderboard collation and hub round-trips
//!
//! Run with: cargo bench --bench leaderboard
//!
//! Collation and rank lookup are the hot paths of a fetch; the round-trip
//! benchmarks measure a full submit or fetch driven to completion against
//! the in-memory store.

// Allow benchmark-specific patterns
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use arcade_hub::leaderboard::{collate, rank_of};
use arcade_hub::{
    GameId, HubBuilder, MemoryIdentity, MemoryStore, RawRecord, Score, ScoreHub, UserId,
    UserIdentity,
};

/// Builds `count` raw rows the way a store query would hand them back,
/// ascending by score with every eighth row partial.
fn raw_rows(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            let mut record = RawRecord {
                user_id: Some(UserId::new(format!("uid-{i:04}"))),
                display_name: Some(format!("player-{i:04}")),
                high_score: Some(Score::new(u32::try_from(i).unwrap_or(u32::MAX))),
                updated_at_ms: Some(1_700_000_000_000 + i as u64),
            };
            match i % 8 {
                3 => record.display_name = None,
                6 => record.high_score = None,
                _ => {},
            }
            record
        })
        .collect()
}

/// A hub signed in as a fixed bench user over the given store.
fn bench_hub(store: MemoryStore) -> ScoreHub {
    HubBuilder::new()
        .with_identity(MemoryIdentity::signed_in_as(UserIdentity {
            user_id: UserId::new("uid-bench"),
            display_name: Some("Bench".to_owned()),
            email: Some("bench@example.com".to_owned()),
        }))
        .connect(store)
        .expect("hub connects")
}

/// Polls until nothing is in flight and drains the completion events.
fn drive(hub: &mut ScoreHub) -> usize {
    while hub.pending_requests() > 0 {
        hub.poll_store();
    }
    hub.events().count()
}

fn bench_collate(c: &mut Criterion) {
    let mut group = c.benchmark_group("collate");

    for count in [100_usize, 1_000] {
        let raw = raw_rows(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &raw, |b, raw| {
            b.iter_batched(|| raw.clone(), collate, BatchSize::SmallInput);
        });
    }

    group.finish();
}

fn bench_rank_of(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_of");

    let records = collate(raw_rows(1_000));
    let first = records[0].user_id.clone().expect("seeded rows carry ids");
    let last = records[records.len() - 1]
        .user_id
        .clone()
        .expect("seeded rows carry ids");
    let missing = UserId::new("uid-nobody");

    for (label, user) in [("first", first), ("last", last), ("missing", missing)] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &user, |b, user| {
            b.iter(|| rank_of(black_box(&records), black_box(user)));
        });
    }

    group.finish();
}

fn bench_submit_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ScoreHub");

    // A fresh store per iteration keeps the append-only history from
    // growing across the measurement.
    group.bench_function("submit_settled", |b| {
        b.iter_batched(
            || bench_hub(MemoryStore::new()),
            |mut hub| {
                hub.submit_score(GameId::Guess, Score::new(black_box(42)))
                    .expect("submission accepted");
                black_box(drive(&mut hub));
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_fetch_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ScoreHub");

    let store = MemoryStore::new();
    for (i, record) in raw_rows(100).into_iter().enumerate() {
        store.seed_record(GameId::Guess, format!("uid-{i:04}"), record);
    }
    let mut hub = bench_hub(store);

    group.bench_function("fetch_top_ten_settled", |b| {
        b.iter(|| {
            hub.fetch_leaderboard(GameId::Guess, 10).expect("fetch accepted");
            black_box(drive(&mut hub));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_collate,
    bench_rank_of,
    bench_submit_round_trip,
    bench_fetch_round_trip
);
criterion_main!(benches);
