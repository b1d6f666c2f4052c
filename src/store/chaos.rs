//! Fault-injecting store wrapper for testing.
//!
//! [`ChaosStore`] wraps any [`StoreTransport`] and misbehaves on purpose:
//! it can reject requests with a fabricated failure, swallow responses so
//! they never arrive, and hold responses back for a number of polls. That
//! is exactly the weather a hub has to survive in production, so the tests
//! for timeout, store-failure, and late-result handling all drive one of
//! these instead of a well-behaved store.
//!
//! All randomness comes from [`Pcg32`]; give the config a seed and a test
//! becomes fully deterministic. Delays are counted in polls rather than
//! wall-clock time for the same reason.
//!
//! # Examples
//!
//! ```
//! use arcade_hub::store::chaos::{ChaosConfig, ChaosStore};
//! use arcade_hub::store::memory::MemoryStore;
//!
//! // A store that fails every request.
//! let store = ChaosStore::new(MemoryStore::new(), ChaosConfig::unreachable());
//! assert_eq!(store.config().fail_rate, 1.0);
//! ```

use std::collections::VecDeque;

use crate::rng::Pcg32;
use crate::store::messages::{ResponseBody, StoreRequest, StoreResponse};
use crate::StoreTransport;

/// Failure message carried by fabricated [`ResponseBody::Failed`] responses.
pub const INJECTED_FAILURE: &str = "injected store failure";

/// Configuration for [`ChaosStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaosConfig {
    /// Probability in `[0.0, 1.0]` that a request is rejected with a
    /// fabricated failure response instead of reaching the inner store.
    pub fail_rate: f64,
    /// Probability in `[0.0, 1.0]` that an inner response is swallowed and
    /// never delivered.
    pub drop_rate: f64,
    /// Number of extra polls a response is held before delivery. Zero keeps
    /// the inner store's own latency.
    pub response_delay: u32,
    /// Seed for the fault dice. `None` seeds from entropy, which is fine
    /// interactively but makes test failures unreproducible.
    pub seed: Option<u64>,
}

impl ChaosConfig {
    /// No interference at all; behaves exactly like the inner store.
    #[must_use]
    pub const fn passthrough() -> Self {
        Self {
            fail_rate: 0.0,
            drop_rate: 0.0,
            response_delay: 0,
            seed: None,
        }
    }

    /// Occasional failures and a one-poll delay. A reasonable stand-in for
    /// a spotty mobile connection.
    #[must_use]
    pub const fn flaky() -> Self {
        Self {
            fail_rate: 0.25,
            drop_rate: 0.0,
            response_delay: 1,
            seed: None,
        }
    }

    /// Every request fails. Exercises the store-unavailable path.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            fail_rate: 1.0,
            drop_rate: 0.0,
            response_delay: 0,
            seed: None,
        }
    }

    /// Starts building a custom configuration.
    #[must_use]
    pub fn builder() -> ChaosConfigBuilder {
        ChaosConfigBuilder::default()
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self::passthrough()
    }
}

/// Builder for [`ChaosConfig`]. Rates are clamped to `[0.0, 1.0]` at
/// [`build`](Self::build) time.
#[derive(Debug, Clone, Copy, Default)]
#[must_use = "call build() to produce the config"]
pub struct ChaosConfigBuilder {
    fail_rate: f64,
    drop_rate: f64,
    response_delay: u32,
    seed: Option<u64>,
}

impl ChaosConfigBuilder {
    /// Sets the request failure probability.
    pub const fn fail_rate(mut self, rate: f64) -> Self {
        self.fail_rate = rate;
        self
    }

    /// Sets the response drop probability.
    pub const fn drop_rate(mut self, rate: f64) -> Self {
        self.drop_rate = rate;
        self
    }

    /// Sets the delivery delay in polls.
    pub const fn response_delay(mut self, polls: u32) -> Self {
        self.response_delay = polls;
        self
    }

    /// Seeds the fault dice for deterministic behavior.
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Produces the configuration.
    #[must_use]
    pub fn build(self) -> ChaosConfig {
        ChaosConfig {
            fail_rate: self.fail_rate.clamp(0.0, 1.0),
            drop_rate: self.drop_rate.clamp(0.0, 1.0),
            response_delay: self.response_delay,
            seed: self.seed,
        }
    }
}

/// Counters of everything a [`ChaosStore`] has done to the traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChaosStats {
    /// Requests given to [`StoreTransport::send`].
    pub requests_sent: u64,
    /// Requests answered with a fabricated failure.
    pub requests_failed: u64,
    /// Requests that reached the inner store.
    pub requests_forwarded: u64,
    /// Inner responses swallowed by the drop rate.
    pub responses_dropped: u64,
    /// Responses actually handed to the caller.
    pub responses_delivered: u64,
}

#[derive(Debug)]
struct HeldResponse {
    response: StoreResponse,
    release_at: u64,
}

/// A [`StoreTransport`] wrapper that injects failures, drops, and delays.
#[derive(Debug)]
pub struct ChaosStore<S> {
    inner: S,
    config: ChaosConfig,
    rng: Pcg32,
    held: VecDeque<HeldResponse>,
    polls: u64,
    stats: ChaosStats,
}

impl<S: StoreTransport> ChaosStore<S> {
    /// Wraps `inner` with the given fault configuration.
    pub fn new(inner: S, config: ChaosConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(Pcg32::from_entropy, Pcg32::seed_from_u64);
        Self {
            inner,
            config,
            rng,
            held: VecDeque::new(),
            polls: 0,
            stats: ChaosStats::default(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// What has happened to the traffic so far.
    #[must_use]
    pub fn stats(&self) -> ChaosStats {
        self.stats
    }

    /// Zeroes the counters.
    pub fn reset_stats(&mut self) {
        self.stats = ChaosStats::default();
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The wrapped store, mutably.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwraps, discarding any held responses.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn should_trigger(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            false
        } else if rate >= 1.0 {
            true
        } else {
            self.rng.gen_bool(rate)
        }
    }

    fn release_due(&mut self) -> Vec<StoreResponse> {
        let mut ready = Vec::new();
        while let Some(held) = self.held.front() {
            if held.release_at > self.polls {
                break;
            }
            if let Some(held) = self.held.pop_front() {
                ready.push(held.response);
            }
        }
        ready
    }
}

impl<S: StoreTransport> StoreTransport for ChaosStore<S> {
    fn send(&mut self, request: &StoreRequest) {
        self.stats.requests_sent += 1;
        if self.should_trigger(self.config.fail_rate) {
            self.stats.requests_failed += 1;
            // The inner store never sees the request; the caller gets a
            // failure response on a later poll like any other outcome.
            self.held.push_back(HeldResponse {
                response: StoreResponse {
                    id: request.id,
                    body: ResponseBody::Failed {
                        message: INJECTED_FAILURE.to_owned(),
                    },
                },
                release_at: self.polls + u64::from(self.config.response_delay),
            });
            return;
        }
        self.stats.requests_forwarded += 1;
        self.inner.send(request);
    }

    fn receive_all_responses(&mut self) -> Vec<StoreResponse> {
        self.polls += 1;
        let drop_rate = self.config.drop_rate;
        for response in self.inner.receive_all_responses() {
            if self.should_trigger(drop_rate) {
                self.stats.responses_dropped += 1;
                continue;
            }
            self.held.push_back(HeldResponse {
                response,
                release_at: self.polls + u64::from(self.config.response_delay),
            });
        }
        let ready = self.release_due();
        self.stats.responses_delivered += ready.len() as u64;
        ready
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
    use crate::store::memory::MemoryStore;
    use crate::store::messages::{RequestBody, RequestId, ScoreEntry};
    use crate::{GameId, Score, UserId};

    fn append_request(id: u64, score: u32) -> StoreRequest {
        StoreRequest {
            id: RequestId::new(id),
            body: RequestBody::AppendScore {
                entry: ScoreEntry {
                    user_id: UserId::new("uid-1"),
                    game: GameId::Guess,
                    score: Score::new(score),
                    recorded_at_ms: 0,
                    display_name: "ada".to_owned(),
                },
            },
        }
    }

    #[test]
    fn passthrough_changes_nothing() {
        let mut store = ChaosStore::new(MemoryStore::new(), ChaosConfig::passthrough());
        store.send(&append_request(1, 7));

        let responses = store.receive_all_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].body, ResponseBody::Appended);
        assert_eq!(store.stats().requests_forwarded, 1);
        assert_eq!(store.stats().requests_failed, 0);
    }

    #[test]
    fn unreachable_fails_without_touching_the_inner_store() {
        let inner = MemoryStore::new();
        let observer = inner.clone();
        let mut store = ChaosStore::new(inner, ChaosConfig::unreachable());

        store.send(&append_request(1, 7));
        let responses = store.receive_all_responses();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, RequestId::new(1));
        assert!(matches!(&responses[0].body, ResponseBody::Failed { message } if message == INJECTED_FAILURE));
        assert!(observer.score_history(&UserId::new("uid-1"), GameId::Guess).is_empty());
        assert_eq!(store.stats().requests_failed, 1);
    }

    #[test]
    fn full_drop_rate_swallows_responses_but_not_writes() {
        let config = ChaosConfig::builder().drop_rate(1.0).seed(42).build();
        let mut store = ChaosStore::new(MemoryStore::new(), config);

        store.send(&append_request(1, 7));
        assert!(store.receive_all_responses().is_empty());
        assert!(store.receive_all_responses().is_empty());

        // The write landed; only the acknowledgement was lost.
        assert_eq!(
            store.inner().score_history(&UserId::new("uid-1"), GameId::Guess).len(),
            1
        );
        assert_eq!(store.stats().responses_dropped, 1);
        assert_eq!(store.stats().responses_delivered, 0);
    }

    #[test]
    fn response_delay_is_counted_in_polls() {
        let config = ChaosConfig::builder().response_delay(2).build();
        let mut store = ChaosStore::new(MemoryStore::new(), config);

        store.send(&append_request(1, 7));
        assert!(store.receive_all_responses().is_empty()); // held, release at poll 3
        assert!(store.receive_all_responses().is_empty());
        let responses = store.receive_all_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].body, ResponseBody::Appended);
    }

    #[test]
    fn delayed_responses_keep_arrival_order() {
        let config = ChaosConfig::builder().response_delay(1).build();
        let mut store = ChaosStore::new(MemoryStore::new(), config);

        store.send(&append_request(1, 7));
        assert!(store.receive_all_responses().is_empty());
        store.send(&append_request(2, 8));
        let first = store.receive_all_responses();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, RequestId::new(1));
        let second = store.receive_all_responses();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, RequestId::new(2));
    }

    #[test]
    fn partial_fail_rate_is_seeded_and_plausible() {
        let run = |seed: u64| -> u64 {
            let config = ChaosConfig::builder().fail_rate(0.5).seed(seed).build();
            let mut store = ChaosStore::new(MemoryStore::new(), config);
            for id in 0..100 {
                store.send(&append_request(id, 1));
            }
            store.stats().requests_failed
        };

        let first = run(42);
        assert_eq!(first, run(42));
        assert!(first > 30, "expected more failures, got {first}");
        assert!(first < 70, "expected fewer failures, got {first}");
        assert_ne!(first, run(1234));
    }

    #[test]
    fn builder_clamps_rates() {
        let config = ChaosConfig::builder().fail_rate(1.5).drop_rate(-0.5).build();
        assert_eq!(config.fail_rate, 1.0);
        assert_eq!(config.drop_rate, 0.0);
    }

    #[test]
    fn stats_reset() {
        let mut store = ChaosStore::new(MemoryStore::new(), ChaosConfig::unreachable());
        store.send(&append_request(1, 7));
        assert_eq!(store.stats().requests_sent, 1);

        store.reset_stats();
        assert_eq!(store.stats(), ChaosStats::default());
    }

    #[test]
    fn into_inner_returns_the_wrapped_store() {
        let mut store = ChaosStore::new(MemoryStore::new(), ChaosConfig::passthrough());
        store.send(&append_request(1, 7));
        let _ = store.receive_all_responses();

        let inner = store.into_inner();
        assert_eq!(inner.score_history(&UserId::new("uid-1"), GameId::Guess).len(), 1);
    }
}
