//! Property-based tests for the hub's submission and fetch contracts.
//!
//! These drive full `ScoreHub` instances over a shared [`MemoryStore`] with
//! proptest-generated score runs and verify the laws the deterministic tests
//! spot-check:
//!
//! - The stored best equals the running maximum of everything submitted,
//!   and `new_best` fires exactly when that maximum moves.
//! - History keeps every submission, in order, regardless of what the
//!   leaderboard did with it.
//! - Two clients of one user can interleave freely without ever lowering
//!   the best.
//! - A fetch with any limit returns the descending prefix of the board.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

mod stubs;

use std::collections::BTreeMap;

use arcade_hub::{GameId, HubEvent, MemoryStore, Score, UserId};
use proptest::prelude::*;
use stubs::{fetch_and_settle, hub_over, player, settle, submit_and_settle};

// ============================================================================
// Strategies
// ============================================================================

/// One player's session: a short run of scores, zeros included.
fn score_run() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(0_u32..=1_000, 1..16)
}

/// A leaderboard's worth of players keyed by a small id, scores colliding
/// often enough to exercise ties.
fn board_rows() -> impl Strategy<Value = BTreeMap<u8, u32>> {
    proptest::collection::btree_map(any::<u8>(), 0_u32..=50, 1..10)
}

// ============================================================================
// Submission laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After every submission the stored best equals the running maximum,
    /// `new_best` reports exactly the submissions that moved it, and the
    /// final history replays the whole run in order.
    #[test]
    fn prop_the_best_tracks_the_running_max(scores in score_run()) {
        let store = MemoryStore::new();
        let mut hub = hub_over(store.clone(), player("uid-prop", "Prop"));
        let user = UserId::new("uid-prop");

        let mut running_max: Option<u32> = None;
        for &points in &scores {
            let events = submit_and_settle(&mut hub, GameId::Guess, points);
            let moved = running_max.map_or(true, |max| points > max);
            prop_assert_eq!(
                events,
                vec![HubEvent::ScoreSubmitted {
                    game: GameId::Guess,
                    score: Score::new(points),
                    new_best: moved,
                }]
            );

            if moved {
                running_max = Some(points);
            }
            let stored = store
                .best_record(GameId::Guess, &user)
                .and_then(|record| record.high_score);
            prop_assert_eq!(stored, running_max.map(Score::new));
        }

        let history: Vec<u32> = store
            .score_history(&user, GameId::Guess)
            .iter()
            .map(|entry| entry.score.points())
            .collect();
        prop_assert_eq!(history, scores);
    }

    /// Two hub clients of the same user interleave their submissions without
    /// settling in between; once both settle, the best is the maximum over
    /// both runs and no append was lost.
    #[test]
    fn prop_interleaved_clients_never_lower_the_best(
        left in score_run(),
        right in score_run(),
    ) {
        let store = MemoryStore::new();
        let mut first = hub_over(store.clone(), player("uid-race", "Race"));
        let mut second = hub_over(store.clone(), player("uid-race", "Race"));
        let user = UserId::new("uid-race");

        let rounds = left.len().max(right.len());
        for i in 0..rounds {
            if let Some(&points) = left.get(i) {
                first.submit_score(GameId::Rps, Score::new(points)).unwrap();
            }
            if let Some(&points) = right.get(i) {
                second.submit_score(GameId::Rps, Score::new(points)).unwrap();
            }
        }
        settle(&mut first);
        settle(&mut second);

        let top = left.iter().chain(&right).copied().max().unwrap();
        let stored = store.best_record(GameId::Rps, &user).unwrap();
        prop_assert_eq!(stored.high_score, Some(Score::new(top)));
        let history = store.score_history(&user, GameId::Rps);
        prop_assert_eq!(history.len(), left.len() + right.len());
    }
}

// ============================================================================
// Fetch laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any board contents and any positive limit, the fetch delivers the
    /// `limit` highest scores in descending order. Compared as score lists so
    /// ties may land in any name order.
    #[test]
    fn prop_a_fetch_is_the_descending_prefix_of_the_board(
        rows in board_rows(),
        limit in 1_usize..=12,
    ) {
        let store = MemoryStore::new();
        let mut hub = hub_over(store, player("uid-admin", "Admin"));
        for (&key, &points) in &rows {
            hub.update_leaderboard(
                GameId::Memory,
                UserId::new(format!("uid-{key:03}")),
                format!("player-{key:03}"),
                Score::new(points),
            )
            .unwrap();
        }
        settle(&mut hub);

        let records = fetch_and_settle(&mut hub, GameId::Memory, limit);

        let mut expected: Vec<u32> = rows.values().copied().collect();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        expected.truncate(limit);

        let delivered: Vec<u32> = records.iter().map(|r| r.high_score.points()).collect();
        prop_assert_eq!(delivered, expected);
    }
}
