//! In-memory score store.
//!
//! [`MemoryStore`] is the reference [`StoreTransport`]: it executes every
//! request the moment it is sent and queues the response for the next
//! [`receive_all_responses`](StoreTransport::receive_all_responses) call, so
//! a driving loop sees at most one poll of latency. It backs the tests and
//! pins down the store-side contract a remote backend must honor, notably:
//!
//! - History is append-only. Nothing ever updates or deletes an entry.
//! - The best-record write is conditional and atomic: compare and replace
//!   happen under one lock, so two racing submitters can never move a high
//!   score backwards.
//! - Top-N queries return ascending score order with scoreless records
//!   first, mirroring an index scan that sorts missing keys lowest.
//!
//! Clone handles share the tables but each handle keeps its own response
//! queue. Tests hold one handle for inspection while the hub drives a
//! clone.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::store::messages::{
    BestRecord, RawRecord, RequestBody, ResponseBody, ScoreEntry, StoreRequest, StoreResponse,
};
use crate::{GameId, StoreTransport, UserId};

#[derive(Debug, Default)]
struct Tables {
    history: BTreeMap<(UserId, GameId), Vec<ScoreEntry>>,
    leaderboard: BTreeMap<(GameId, UserId), RawRecord>,
}

impl Tables {
    fn append(&mut self, entry: &ScoreEntry) {
        self.history
            .entry((entry.user_id.clone(), entry.game))
            .or_default()
            .push(entry.clone());
    }

    /// The conditional write: replaces the stored record only when its high
    /// score is absent or strictly lower than the candidate's. Runs under
    /// the table lock, which is what makes racing submitters safe.
    fn record_best(&mut self, game: GameId, candidate: &BestRecord) -> bool {
        let key = (game, candidate.user_id.clone());
        let current = self.leaderboard.get(&key).and_then(|raw| raw.high_score);
        match current {
            Some(existing) if existing >= candidate.high_score => false,
            _ => {
                self.leaderboard.insert(key, RawRecord::from(candidate.clone()));
                true
            },
        }
    }

    fn query_top(&self, game: GameId, limit: usize) -> Vec<RawRecord> {
        let mut records: Vec<RawRecord> = self
            .leaderboard
            .iter()
            .filter(|((stored_game, _), _)| *stored_game == game)
            .map(|(_, record)| record.clone())
            .collect();
        // Stable sort: records missing a score order first, ties keep user
        // key order.
        records.sort_by_key(|record| record.high_score);
        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
        records
    }
}

/// An in-memory [`StoreTransport`] with shared clone handles.
#[derive(Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Tables>>,
    outbox: VecDeque<StoreResponse>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A user's full history for one game, in append order.
    #[must_use]
    pub fn score_history(&self, user: &UserId, game: GameId) -> Vec<ScoreEntry> {
        self.shared
            .lock()
            .history
            .get(&(user.clone(), game))
            .cloned()
            .unwrap_or_default()
    }

    /// The stored best record for `(game, user)`, if any.
    #[must_use]
    pub fn best_record(&self, game: GameId, user: &UserId) -> Option<RawRecord> {
        self.shared.lock().leaderboard.get(&(game, user.clone())).cloned()
    }

    /// Installs a raw record directly, bypassing the conditional write.
    ///
    /// This is how tests fabricate partial or hand-edited rows; `key` is the
    /// storage key and may differ from (or exceed) whatever `record.user_id`
    /// says.
    pub fn seed_record(&self, game: GameId, key: impl Into<UserId>, record: RawRecord) {
        self.shared.lock().leaderboard.insert((game, key.into()), record);
    }
}

impl Clone for MemoryStore {
    /// Shares the tables; the new handle starts with an empty response
    /// queue, so each handle only ever sees answers to its own requests.
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            outbox: VecDeque::new(),
        }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.shared.lock();
        f.debug_struct("MemoryStore")
            .field("history_keys", &tables.history.len())
            .field("leaderboard_rows", &tables.leaderboard.len())
            .field("queued_responses", &self.outbox.len())
            .finish()
    }
}

impl StoreTransport for MemoryStore {
    fn send(&mut self, request: &StoreRequest) {
        trace!(id = %request.id, kind = request.body.kind(), "store request");
        let body = {
            let mut tables = self.shared.lock();
            match &request.body {
                RequestBody::AppendScore { entry } => {
                    tables.append(entry);
                    ResponseBody::Appended
                },
                RequestBody::RecordBest { game, record } => ResponseBody::BestRecorded {
                    updated: tables.record_best(*game, record),
                },
                RequestBody::QueryTop { game, limit } => ResponseBody::TopScores {
                    records: tables
                        .query_top(*game, usize::try_from(*limit).unwrap_or(usize::MAX)),
                },
            }
        };
        self.outbox.push_back(StoreResponse {
            id: request.id,
            body,
        });
    }

    fn receive_all_responses(&mut self) -> Vec<StoreResponse> {
        self.outbox.drain(..).collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::store::messages::RequestId;
    use crate::Score;

    fn entry(user: &str, game: GameId, score: u32) -> ScoreEntry {
        ScoreEntry {
            user_id: UserId::new(user),
            game,
            score: Score::new(score),
            recorded_at_ms: 1_700_000_000_000,
            display_name: user.to_owned(),
        }
    }

    fn best(user: &str, score: u32) -> BestRecord {
        BestRecord {
            user_id: UserId::new(user),
            display_name: user.to_owned(),
            high_score: Score::new(score),
            updated_at_ms: 1_700_000_000_000,
        }
    }

    fn send(store: &mut MemoryStore, id: u64, body: RequestBody) -> ResponseBody {
        store.send(&StoreRequest {
            id: RequestId::new(id),
            body,
        });
        let mut responses = store.receive_all_responses();
        assert_eq!(responses.len(), 1);
        let response = responses.remove(0);
        assert_eq!(response.id, RequestId::new(id));
        response.body
    }

    #[test]
    fn appends_accumulate_in_order() {
        let mut store = MemoryStore::new();
        for (id, score) in [(1, 7_u32), (2, 5), (3, 12)] {
            let body = send(
                &mut store,
                id,
                RequestBody::AppendScore {
                    entry: entry("uid-1", GameId::Guess, score),
                },
            );
            assert_eq!(body, ResponseBody::Appended);
        }

        let history = store.score_history(&UserId::new("uid-1"), GameId::Guess);
        let scores: Vec<u32> = history.iter().map(|e| e.score.points()).collect();
        assert_eq!(scores, vec![7, 5, 12]);
    }

    #[test]
    fn histories_are_keyed_per_user_and_game() {
        let mut store = MemoryStore::new();
        send(
            &mut store,
            1,
            RequestBody::AppendScore {
                entry: entry("uid-1", GameId::Guess, 7),
            },
        );
        send(
            &mut store,
            2,
            RequestBody::AppendScore {
                entry: entry("uid-1", GameId::Memory, 4),
            },
        );
        send(
            &mut store,
            3,
            RequestBody::AppendScore {
                entry: entry("uid-2", GameId::Guess, 9),
            },
        );

        assert_eq!(store.score_history(&UserId::new("uid-1"), GameId::Guess).len(), 1);
        assert_eq!(store.score_history(&UserId::new("uid-1"), GameId::Memory).len(), 1);
        assert_eq!(store.score_history(&UserId::new("uid-2"), GameId::Guess).len(), 1);
        assert!(store.score_history(&UserId::new("uid-2"), GameId::Memory).is_empty());
    }

    #[test]
    fn record_best_takes_only_strictly_higher_scores() {
        let mut store = MemoryStore::new();
        let user = UserId::new("uid-1");

        let body = send(
            &mut store,
            1,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: best("uid-1", 7),
            },
        );
        assert_eq!(body, ResponseBody::BestRecorded { updated: true });

        // Lower loses.
        let body = send(
            &mut store,
            2,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: best("uid-1", 5),
            },
        );
        assert_eq!(body, ResponseBody::BestRecorded { updated: false });
        let stored = store.best_record(GameId::Guess, &user).unwrap();
        assert_eq!(stored.high_score, Some(Score::new(7)));

        // Equal loses too.
        let body = send(
            &mut store,
            3,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: best("uid-1", 7),
            },
        );
        assert_eq!(body, ResponseBody::BestRecorded { updated: false });

        // Higher wins and rewrites the whole record.
        let mut candidate = best("uid-1", 12);
        candidate.display_name = "renamed".to_owned();
        let body = send(
            &mut store,
            4,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: candidate,
            },
        );
        assert_eq!(body, ResponseBody::BestRecorded { updated: true });
        let stored = store.best_record(GameId::Guess, &user).unwrap();
        assert_eq!(stored.high_score, Some(Score::new(12)));
        assert_eq!(stored.display_name.as_deref(), Some("renamed"));
    }

    #[test]
    fn record_best_replaces_a_scoreless_row() {
        let mut store = MemoryStore::new();
        store.seed_record(
            GameId::Rps,
            "uid-1",
            RawRecord {
                user_id: Some(UserId::new("uid-1")),
                display_name: Some("ada".to_owned()),
                high_score: None,
                updated_at_ms: None,
            },
        );

        let body = send(
            &mut store,
            1,
            RequestBody::RecordBest {
                game: GameId::Rps,
                record: best("uid-1", 1),
            },
        );
        assert_eq!(body, ResponseBody::BestRecorded { updated: true });
    }

    #[test]
    fn query_returns_the_ascending_tail() {
        let mut store = MemoryStore::new();
        for (id, user, score) in [(1, "uid-a", 10_u32), (2, "uid-b", 30), (3, "uid-c", 20)] {
            send(
                &mut store,
                id,
                RequestBody::RecordBest {
                    game: GameId::TicTacToe,
                    record: best(user, score),
                },
            );
        }

        let body = send(
            &mut store,
            4,
            RequestBody::QueryTop {
                game: GameId::TicTacToe,
                limit: 2,
            },
        );
        let ResponseBody::TopScores { records } = body else {
            panic!("expected top scores");
        };
        let scores: Vec<Option<Score>> = records.iter().map(|r| r.high_score).collect();
        assert_eq!(scores, vec![Some(Score::new(20)), Some(Score::new(30))]);
    }

    #[test]
    fn query_orders_scoreless_rows_first() {
        let mut store = MemoryStore::new();
        store.seed_record(GameId::Guess, "uid-x", RawRecord::default());
        send(
            &mut store,
            1,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: best("uid-a", 5),
            },
        );

        let body = send(
            &mut store,
            2,
            RequestBody::QueryTop {
                game: GameId::Guess,
                limit: 10,
            },
        );
        let ResponseBody::TopScores { records } = body else {
            panic!("expected top scores");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].high_score, None);
        assert_eq!(records[1].high_score, Some(Score::new(5)));

        // With a tight limit the scoreless head falls off.
        let body = send(
            &mut store,
            3,
            RequestBody::QueryTop {
                game: GameId::Guess,
                limit: 1,
            },
        );
        let ResponseBody::TopScores { records } = body else {
            panic!("expected top scores");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].high_score, Some(Score::new(5)));
    }

    #[test]
    fn query_scopes_to_one_game() {
        let mut store = MemoryStore::new();
        send(
            &mut store,
            1,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: best("uid-a", 5),
            },
        );
        let body = send(
            &mut store,
            2,
            RequestBody::QueryTop {
                game: GameId::Memory,
                limit: 10,
            },
        );
        assert_eq!(body, ResponseBody::TopScores { records: vec![] });
    }

    #[test]
    fn query_with_zero_limit_is_empty() {
        let mut store = MemoryStore::new();
        send(
            &mut store,
            1,
            RequestBody::RecordBest {
                game: GameId::Guess,
                record: best("uid-a", 5),
            },
        );
        let body = send(
            &mut store,
            2,
            RequestBody::QueryTop {
                game: GameId::Guess,
                limit: 0,
            },
        );
        assert_eq!(body, ResponseBody::TopScores { records: vec![] });
    }

    #[test]
    fn clones_share_tables_but_not_response_queues() {
        let mut writer = MemoryStore::new();
        let mut observer = writer.clone();

        writer.send(&StoreRequest {
            id: RequestId::new(1),
            body: RequestBody::AppendScore {
                entry: entry("uid-1", GameId::Guess, 7),
            },
        });

        // The observer sees the shared table, not the writer's response.
        assert!(observer.receive_all_responses().is_empty());
        assert_eq!(observer.score_history(&UserId::new("uid-1"), GameId::Guess).len(), 1);
        assert_eq!(writer.receive_all_responses().len(), 1);
    }

    #[test]
    fn racing_writers_cannot_lower_a_best_score() {
        let mut first = MemoryStore::new();
        let mut second = first.clone();
        let user = UserId::new("uid-1");

        send(
            &mut first,
            1,
            RequestBody::RecordBest {
                game: GameId::Memory,
                record: best("uid-1", 12),
            },
        );
        let body = send(
            &mut second,
            1,
            RequestBody::RecordBest {
                game: GameId::Memory,
                record: best("uid-1", 9),
            },
        );
        assert_eq!(body, ResponseBody::BestRecorded { updated: false });

        let stored = first.best_record(GameId::Memory, &user).unwrap();
        assert_eq!(stored.high_score, Some(Score::new(12)));
    }
}
