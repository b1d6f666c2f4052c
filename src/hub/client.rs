//! The score hub client.
//!
//! [`ScoreHub`] is the single object an app talks to: it resolves the
//! signed-in user, fires non-blocking store requests, and turns responses
//! into [`HubEvent`]s. It is designed for a caller with one logical thread
//! and a frame or UI loop:
//!
//! 1. Call an operation ([`submit_score`], [`fetch_leaderboard`]). It
//!    returns immediately with a [`RequestId`].
//! 2. Call [`poll_store`] once per tick.
//! 3. Drain [`events`] and react.
//!
//! Nothing in the hub retries. Every failure is terminal for that one
//! operation and says so in its event; whether to try again is the
//! caller's decision.
//!
//! A submission is two store writes chained through the poll loop: the
//! history append goes out first, and only its acknowledgement triggers
//! the conditional best-record write. The append is never rolled back, so
//! a best-record failure still leaves the played score in the history.
//!
//! [`submit_score`]: ScoreHub::submit_score
//! [`fetch_leaderboard`]: ScoreHub::fetch_leaderboard
//! [`poll_store`]: ScoreHub::poll_store
//! [`events`]: ScoreHub::events

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace, warn};
use web_time::Instant;

use crate::auth::{IdentityProvider, UserIdentity};
use crate::error::HubError;
use crate::hub::config::HubConfig;
use crate::hub::events::{EventDrain, HubEvent};
use crate::leaderboard;
use crate::store::messages::{
    BestRecord, RequestBody, RequestId, ResponseBody, ScoreEntry, StoreRequest,
};
use crate::{GameId, Score, StoreTransport, UserId};

// Events pile up only when the caller stops draining them; beyond this the
// oldest are discarded.
const MAX_EVENT_QUEUE_SIZE: usize = 100;

/// Wall-clock epoch milliseconds, clamped to zero if the clock reads
/// before the epoch.
fn unix_time_millis() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// What the hub still owes an answer for, keyed by [`RequestId`].
#[derive(Debug)]
enum PendingOp {
    /// History append in flight. Carries everything the follow-up
    /// best-record write will need.
    Append {
        game: GameId,
        score: Score,
        user_id: UserId,
        display_name: String,
    },
    /// Conditional best-record write in flight.
    RecordBest { game: GameId, score: Score },
    /// Leaderboard query racing its deadline.
    Query { game: GameId, issued_at: Instant },
}

/// The poll-driven client for score submission and leaderboards.
///
/// Built by [`HubBuilder`](crate::hub::builder::HubBuilder). See the
/// [module docs](self) for the driving pattern and the
/// [crate docs](crate) for a complete example.
#[derive(Debug)]
pub struct ScoreHub {
    config: HubConfig,
    identity: Box<dyn IdentityProvider>,
    store: Box<dyn StoreTransport>,
    next_request: u64,
    in_flight: BTreeMap<RequestId, PendingOp>,
    event_queue: VecDeque<HubEvent>,
}

impl ScoreHub {
    pub(crate) fn new(
        config: HubConfig,
        identity: Box<dyn IdentityProvider>,
        store: Box<dyn StoreTransport>,
    ) -> Self {
        Self {
            config,
            identity,
            store,
            next_request: 0,
            in_flight: BTreeMap::new(),
            event_queue: VecDeque::new(),
        }
    }

    /// Submits a finished game's score for the signed-in user.
    ///
    /// The user is resolved now, synchronously; the writes happen through
    /// the poll loop. The display name recorded next to the score falls
    /// back from profile name to email local part to `"Anonymous"`.
    ///
    /// Completion arrives as [`HubEvent::ScoreSubmitted`] (with `new_best`
    /// saying whether the leaderboard record moved) or
    /// [`HubEvent::SubmitFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotAuthenticated`] when the identity provider
    /// reports nobody signed in. Nothing is sent in that case.
    pub fn submit_score(&mut self, game: GameId, score: Score) -> Result<RequestId, HubError> {
        let Some(user) = self.identity.current_user() else {
            debug!(%game, "submission rejected, nobody is signed in");
            return Err(HubError::NotAuthenticated);
        };
        let display_name = user.resolve_display_name();
        let id = self.next_id();
        let entry = ScoreEntry {
            user_id: user.user_id.clone(),
            game,
            score,
            recorded_at_ms: unix_time_millis(),
            display_name: display_name.clone(),
        };
        debug!(%id, %game, %score, user = %user.user_id, "submitting score");
        self.store.send(&StoreRequest {
            id,
            body: RequestBody::AppendScore { entry },
        });
        self.in_flight.insert(
            id,
            PendingOp::Append {
                game,
                score,
                user_id: user.user_id,
                display_name,
            },
        );
        Ok(id)
    }

    /// Sends the conditional leaderboard write on its own, with identity
    /// resolved by the caller.
    ///
    /// The record `{display_name, score, user_id}` is written whole with a
    /// fresh timestamp, but only if the stored high score is absent or
    /// strictly lower; otherwise nothing changes and the operation still
    /// completes with `new_best == false`. [`submit_score`] calls this
    /// internally after its history append is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] for an empty display name,
    /// which would put an unnameable row on the board.
    ///
    /// [`submit_score`]: Self::submit_score
    pub fn update_leaderboard(
        &mut self,
        game: GameId,
        user_id: UserId,
        display_name: impl Into<String>,
        score: Score,
    ) -> Result<RequestId, HubError> {
        let display_name = display_name.into();
        if display_name.is_empty() {
            return Err(HubError::InvalidRequest {
                info: "display_name must not be empty".to_owned(),
            });
        }
        Ok(self.record_best_request(game, user_id, display_name, score))
    }

    /// Requests the top `limit` leaderboard rows for a game.
    ///
    /// Completion arrives as [`HubEvent::LeaderboardReady`] with validated
    /// records in descending score order, or [`HubEvent::LeaderboardFailed`]
    /// carrying [`HubError::FetchFailed`] for a store error and
    /// [`HubError::FetchTimedOut`] when [`HubConfig::fetch_timeout`] passes
    /// first. A store response arriving after the deadline is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] when `limit` is zero.
    pub fn fetch_leaderboard(
        &mut self,
        game: GameId,
        limit: usize,
    ) -> Result<RequestId, HubError> {
        if limit == 0 {
            return Err(HubError::InvalidRequest {
                info: "limit must be greater than zero".to_owned(),
            });
        }
        let id = self.next_id();
        debug!(%id, %game, limit, "fetching leaderboard");
        self.store.send(&StoreRequest {
            id,
            body: RequestBody::QueryTop {
                game,
                limit: u32::try_from(limit).unwrap_or(u32::MAX),
            },
        });
        self.in_flight.insert(
            id,
            PendingOp::Query {
                game,
                issued_at: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Requests the leaderboard at the configured default depth.
    ///
    /// # Errors
    ///
    /// Propagates from [`fetch_leaderboard`](Self::fetch_leaderboard).
    pub fn fetch_leaderboard_top(&mut self, game: GameId) -> Result<RequestId, HubError> {
        self.fetch_leaderboard(game, self.config.default_fetch_limit)
    }

    /// Drives in-flight operations forward. Call once per tick.
    ///
    /// Deadlines are checked before responses are processed, so a query
    /// answered after its deadline finds its id already forgotten and the
    /// late result is dropped rather than delivered.
    pub fn poll_store(&mut self) {
        self.expire_overdue_queries();
        let responses = self.store.receive_all_responses();
        for response in responses {
            let Some(op) = self.in_flight.remove(&response.id) else {
                trace!(
                    id = %response.id,
                    kind = response.body.kind(),
                    "dropping response for unknown request"
                );
                continue;
            };
            self.complete(response.id, op, response.body);
        }
    }

    /// Drains all queued events, oldest first.
    pub fn events(&mut self) -> EventDrain<'_> {
        EventDrain::from_drain(self.event_queue.drain(..))
    }

    /// Number of operations still awaiting a store response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }

    /// The live identity, straight from the provider. Never cached.
    #[must_use]
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.identity.current_user()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn next_id(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId::new(self.next_request)
    }

    fn record_best_request(
        &mut self,
        game: GameId,
        user_id: UserId,
        display_name: String,
        score: Score,
    ) -> RequestId {
        let id = self.next_id();
        let record = BestRecord {
            user_id,
            display_name,
            high_score: score,
            updated_at_ms: unix_time_millis(),
        };
        trace!(%id, %game, %score, "sending conditional best-record write");
        self.store.send(&StoreRequest {
            id,
            body: RequestBody::RecordBest { game, record },
        });
        self.in_flight.insert(id, PendingOp::RecordBest { game, score });
        id
    }

    fn push_event(&mut self, event: HubEvent) {
        self.event_queue.push_back(event);
        while self.event_queue.len() > MAX_EVENT_QUEUE_SIZE {
            self.event_queue.pop_front();
        }
    }

    fn expire_overdue_queries(&mut self) {
        let timeout = self.config.fetch_timeout;
        let expired: Vec<(RequestId, GameId, u128)> = self
            .in_flight
            .iter()
            .filter_map(|(id, op)| match op {
                PendingOp::Query { game, issued_at } => {
                    let waited = issued_at.elapsed();
                    (waited >= timeout).then_some((*id, *game, waited.as_millis()))
                },
                _ => None,
            })
            .collect();
        for (id, game, waited_ms) in expired {
            self.in_flight.remove(&id);
            debug!(%id, %game, waited_ms, "leaderboard fetch timed out");
            self.push_event(HubEvent::LeaderboardFailed {
                game,
                error: HubError::FetchTimedOut { waited_ms },
            });
        }
    }

    fn complete(&mut self, id: RequestId, op: PendingOp, body: ResponseBody) {
        match (op, body) {
            (
                PendingOp::Append {
                    game,
                    score,
                    user_id,
                    display_name,
                },
                ResponseBody::Appended,
            ) => {
                trace!(%id, %game, "history append acknowledged");
                self.record_best_request(game, user_id, display_name, score);
            },
            (PendingOp::Append { game, score, .. }, ResponseBody::Failed { message }) => {
                debug!(%id, %game, %message, "history append failed");
                self.push_event(HubEvent::SubmitFailed {
                    game,
                    score,
                    error: HubError::StoreUnavailable { context: message },
                });
            },
            (PendingOp::RecordBest { game, score }, ResponseBody::BestRecorded { updated }) => {
                debug!(%id, %game, %score, new_best = updated, "submission complete");
                self.push_event(HubEvent::ScoreSubmitted {
                    game,
                    score,
                    new_best: updated,
                });
            },
            (PendingOp::RecordBest { game, score }, ResponseBody::Failed { message }) => {
                // The history append already landed and stays.
                debug!(%id, %game, %message, "best-record write failed");
                self.push_event(HubEvent::SubmitFailed {
                    game,
                    score,
                    error: HubError::StoreUnavailable { context: message },
                });
            },
            (PendingOp::Query { game, .. }, ResponseBody::TopScores { records }) => {
                let records = leaderboard::collate(records);
                debug!(%id, %game, rows = records.len(), "leaderboard snapshot ready");
                self.push_event(HubEvent::LeaderboardReady { game, records });
            },
            (PendingOp::Query { game, .. }, ResponseBody::Failed { message }) => {
                debug!(%id, %game, %message, "leaderboard fetch failed");
                self.push_event(HubEvent::LeaderboardFailed {
                    game,
                    error: HubError::FetchFailed { context: message },
                });
            },
            (op, body) => {
                warn!(%id, kind = body.kind(), "response kind does not match the pending operation");
                let context = format!("store answered with {}", body.kind());
                match op {
                    PendingOp::Append { game, score, .. }
                    | PendingOp::RecordBest { game, score } => {
                        self.push_event(HubEvent::SubmitFailed {
                            game,
                            score,
                            error: HubError::StoreUnavailable { context },
                        });
                    },
                    PendingOp::Query { game, .. } => {
                        self.push_event(HubEvent::LeaderboardFailed {
                            game,
                            error: HubError::FetchFailed { context },
                        });
                    },
                }
            },
        }
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
    use crate::auth::MemoryIdentity;
    use crate::hub::builder::HubBuilder;
    use crate::store::chaos::{ChaosConfig, ChaosStore};
    use crate::store::memory::MemoryStore;
    use crate::store::messages::StoreResponse;

    fn signed_in_identity() -> MemoryIdentity {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();
        auth.sign_in("ada@example.com", "hunter42").unwrap();
        auth
    }

    fn hub_over_memory() -> (ScoreHub, MemoryStore, MemoryIdentity) {
        let auth = signed_in_identity();
        let store = MemoryStore::new();
        let hub = HubBuilder::new()
            .with_config(HubConfig::testing())
            .with_identity(auth.clone())
            .connect(store.clone())
            .unwrap();
        (hub, store, auth)
    }

    fn pump(hub: &mut ScoreHub) -> Vec<HubEvent> {
        for _ in 0..10 {
            if hub.pending_requests() == 0 {
                break;
            }
            hub.poll_store();
        }
        assert_eq!(hub.pending_requests(), 0, "operations still in flight");
        hub.events().collect()
    }

    #[test]
    fn submission_needs_a_signed_in_user() {
        let store = MemoryStore::new();
        let mut hub = HubBuilder::new()
            .with_identity(MemoryIdentity::new())
            .connect(store.clone())
            .unwrap();

        let result = hub.submit_score(GameId::Guess, Score::new(7));
        assert_eq!(result, Err(HubError::NotAuthenticated));
        assert_eq!(hub.pending_requests(), 0);
        assert!(pump(&mut hub).is_empty());
    }

    #[test]
    fn submission_appends_history_and_records_a_best() {
        let (mut hub, store, auth) = hub_over_memory();
        let user = auth.current_user().unwrap().user_id;

        hub.submit_score(GameId::Guess, Score::new(7)).unwrap();
        let events = pump(&mut hub);

        assert_eq!(
            events,
            vec![HubEvent::ScoreSubmitted {
                game: GameId::Guess,
                score: Score::new(7),
                new_best: true,
            }]
        );
        let history = store.score_history(&user, GameId::Guess);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, Score::new(7));
        assert_eq!(history[0].display_name, "ada");
        let best = store.best_record(GameId::Guess, &user).unwrap();
        assert_eq!(best.high_score, Some(Score::new(7)));
    }

    #[test]
    fn lower_scores_append_but_do_not_become_best() {
        let (mut hub, store, auth) = hub_over_memory();
        let user = auth.current_user().unwrap().user_id;

        hub.submit_score(GameId::Guess, Score::new(7)).unwrap();
        pump(&mut hub);
        hub.submit_score(GameId::Guess, Score::new(5)).unwrap();
        let events = pump(&mut hub);

        assert_eq!(
            events,
            vec![HubEvent::ScoreSubmitted {
                game: GameId::Guess,
                score: Score::new(5),
                new_best: false,
            }]
        );
        let scores: Vec<u32> = store
            .score_history(&user, GameId::Guess)
            .iter()
            .map(|e| e.score.points())
            .collect();
        assert_eq!(scores, vec![7, 5]);
        let best = store.best_record(GameId::Guess, &user).unwrap();
        assert_eq!(best.high_score, Some(Score::new(7)));
    }

    #[test]
    fn display_name_falls_back_to_the_email_local_part() {
        let auth = MemoryIdentity::signed_in_as(UserIdentity {
            user_id: UserId::new("uid-9"),
            display_name: None,
            email: Some("grace.hopper@example.com".to_owned()),
        });
        let store = MemoryStore::new();
        let mut hub = HubBuilder::new()
            .with_identity(auth)
            .connect(store.clone())
            .unwrap();

        hub.submit_score(GameId::Rps, Score::new(3)).unwrap();
        pump(&mut hub);

        let history = store.score_history(&UserId::new("uid-9"), GameId::Rps);
        assert_eq!(history[0].display_name, "grace.hopper");
        let best = store.best_record(GameId::Rps, &UserId::new("uid-9")).unwrap();
        assert_eq!(best.display_name.as_deref(), Some("grace.hopper"));
    }

    #[test]
    fn update_leaderboard_rejects_an_empty_name() {
        let (mut hub, _store, _auth) = hub_over_memory();
        let result =
            hub.update_leaderboard(GameId::Memory, UserId::new("uid-1"), "", Score::new(4));
        assert!(matches!(result, Err(HubError::InvalidRequest { .. })));
    }

    #[test]
    fn update_leaderboard_stands_alone() {
        let (mut hub, store, _auth) = hub_over_memory();
        hub.update_leaderboard(GameId::Memory, UserId::new("uid-1"), "ada", Score::new(4))
            .unwrap();
        let events = pump(&mut hub);

        assert_eq!(
            events,
            vec![HubEvent::ScoreSubmitted {
                game: GameId::Memory,
                score: Score::new(4),
                new_best: true,
            }]
        );
        // No history entry; only the best record was touched.
        assert!(store.score_history(&UserId::new("uid-1"), GameId::Memory).is_empty());
        assert!(store.best_record(GameId::Memory, &UserId::new("uid-1")).is_some());
    }

    #[test]
    fn fetch_rejects_a_zero_limit() {
        let (mut hub, _store, _auth) = hub_over_memory();
        let result = hub.fetch_leaderboard(GameId::Guess, 0);
        assert!(matches!(result, Err(HubError::InvalidRequest { .. })));
    }

    #[test]
    fn fetch_delivers_a_descending_snapshot() {
        let (mut hub, _store, _auth) = hub_over_memory();
        for (user, name, points) in [
            ("uid-a", "alice", 10_u32),
            ("uid-b", "bob", 30),
            ("uid-c", "carol", 20),
        ] {
            hub.update_leaderboard(GameId::TicTacToe, UserId::new(user), name, Score::new(points))
                .unwrap();
        }
        pump(&mut hub);

        hub.fetch_leaderboard(GameId::TicTacToe, 2).unwrap();
        let events = pump(&mut hub);

        let [HubEvent::LeaderboardReady { game, records }] = events.as_slice() else {
            panic!("expected one ready event, got {events:?}");
        };
        assert_eq!(*game, GameId::TicTacToe);
        let names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);
    }

    #[test]
    fn fetch_times_out_against_a_silent_store() {
        let auth = signed_in_identity();
        let silent = ChaosStore::new(
            MemoryStore::new(),
            ChaosConfig::builder().drop_rate(1.0).seed(7).build(),
        );
        let mut hub = HubBuilder::new()
            .with_config(HubConfig::testing())
            .with_identity(auth)
            .connect(silent)
            .unwrap();

        hub.fetch_leaderboard(GameId::Guess, 5).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(60));
        hub.poll_store();

        let events: Vec<HubEvent> = hub.events().collect();
        let [HubEvent::LeaderboardFailed { error, .. }] = events.as_slice() else {
            panic!("expected one failed event, got {events:?}");
        };
        assert!(matches!(error, HubError::FetchTimedOut { .. }));
        assert_eq!(hub.pending_requests(), 0);
    }

    #[test]
    fn store_failure_is_distinct_from_timeout() {
        let auth = signed_in_identity();
        let broken = ChaosStore::new(MemoryStore::new(), ChaosConfig::unreachable());
        let mut hub = HubBuilder::new()
            .with_config(HubConfig::testing())
            .with_identity(auth)
            .connect(broken)
            .unwrap();

        hub.fetch_leaderboard(GameId::Guess, 5).unwrap();
        let events = pump(&mut hub);

        let [HubEvent::LeaderboardFailed { error, .. }] = events.as_slice() else {
            panic!("expected one failed event, got {events:?}");
        };
        assert!(matches!(error, HubError::FetchFailed { .. }));
    }

    #[test]
    fn submit_failure_surfaces_as_store_unavailable() {
        let auth = signed_in_identity();
        let broken = ChaosStore::new(MemoryStore::new(), ChaosConfig::unreachable());
        let mut hub = HubBuilder::new()
            .with_config(HubConfig::testing())
            .with_identity(auth)
            .connect(broken)
            .unwrap();

        hub.submit_score(GameId::Memory, Score::new(4)).unwrap();
        let events = pump(&mut hub);

        let [HubEvent::SubmitFailed { game, score, error }] = events.as_slice() else {
            panic!("expected one failed event, got {events:?}");
        };
        assert_eq!(*game, GameId::Memory);
        assert_eq!(*score, Score::new(4));
        assert!(matches!(error, HubError::StoreUnavailable { .. }));
    }

    #[test]
    fn mismatched_response_kinds_fail_the_operation() {
        // A store that answers every request with a query result.
        #[derive(Debug, Default)]
        struct WrongKindStore {
            inbox: Vec<StoreRequest>,
        }

        impl StoreTransport for WrongKindStore {
            fn send(&mut self, request: &StoreRequest) {
                self.inbox.push(request.clone());
            }

            fn receive_all_responses(&mut self) -> Vec<StoreResponse> {
                self.inbox
                    .drain(..)
                    .map(|request| StoreResponse {
                        id: request.id,
                        body: ResponseBody::TopScores { records: vec![] },
                    })
                    .collect()
            }
        }

        let auth = signed_in_identity();
        let mut hub = HubBuilder::new()
            .with_identity(auth)
            .connect(WrongKindStore::default())
            .unwrap();

        hub.submit_score(GameId::Guess, Score::new(7)).unwrap();
        hub.poll_store();

        let events: Vec<HubEvent> = hub.events().collect();
        let [HubEvent::SubmitFailed { error, .. }] = events.as_slice() else {
            panic!("expected one failed event, got {events:?}");
        };
        assert_eq!(
            *error,
            HubError::StoreUnavailable {
                context: "store answered with top-scores".to_owned(),
            }
        );
    }

    #[test]
    fn undrained_events_drop_oldest_first() {
        let (mut hub, _store, _auth) = hub_over_memory();
        for points in 0..u32::try_from(MAX_EVENT_QUEUE_SIZE).unwrap() + 10 {
            hub.push_event(HubEvent::ScoreSubmitted {
                game: GameId::Guess,
                score: Score::new(points),
                new_best: false,
            });
        }

        let events: Vec<HubEvent> = hub.events().collect();
        assert_eq!(events.len(), MAX_EVENT_QUEUE_SIZE);
        // The first ten were discarded.
        assert_eq!(
            events[0],
            HubEvent::ScoreSubmitted {
                game: GameId::Guess,
                score: Score::new(10),
                new_best: false,
            }
        );
    }

    #[test]
    fn request_ids_are_unique_and_increasing() {
        let (mut hub, _store, _auth) = hub_over_memory();
        let first = hub.submit_score(GameId::Guess, Score::new(1)).unwrap();
        let second = hub.fetch_leaderboard(GameId::Guess, 5).unwrap();
        assert!(first < second);
    }
}
