//! Completion events delivered by the hub.
//!
//! Every submission and fetch eventually produces exactly one terminal
//! event, queued during [`poll_store`] and handed out by [`events`]. The
//! queue is bounded; a caller that never drains it loses the oldest events
//! first.
//!
//! [`poll_store`]: crate::hub::client::ScoreHub::poll_store
//! [`events`]: crate::hub::client::ScoreHub::events

use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::error::HubError;
use crate::leaderboard::LeaderboardRecord;
use crate::{GameId, Score};

/// A completed hub operation.
///
/// Submission events answer [`submit_score`] and [`update_leaderboard`];
/// leaderboard events answer [`fetch_leaderboard`]. Failures carry the
/// operation's inputs so a UI can offer a retry without bookkeeping of its
/// own; the hub itself never retries.
///
/// [`submit_score`]: crate::hub::client::ScoreHub::submit_score
/// [`update_leaderboard`]: crate::hub::client::ScoreHub::update_leaderboard
/// [`fetch_leaderboard`]: crate::hub::client::ScoreHub::fetch_leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HubEvent {
    /// A submission finished. The history entry is in place; `new_best`
    /// tells whether the leaderboard record was replaced as well.
    ScoreSubmitted {
        /// The game the score was submitted for.
        game: GameId,
        /// The submitted score.
        score: Score,
        /// Whether the conditional leaderboard write took effect.
        new_best: bool,
    },
    /// A submission failed at the store. If the failure happened after the
    /// history append, the appended entry stays; appends are never rolled
    /// back.
    SubmitFailed {
        /// The game the score was submitted for.
        game: GameId,
        /// The score that failed to submit.
        score: Score,
        /// What went wrong, always [`HubError::StoreUnavailable`].
        error: HubError,
    },
    /// A leaderboard fetch finished. Records are validated and in
    /// descending score order.
    LeaderboardReady {
        /// The game the snapshot belongs to.
        game: GameId,
        /// The validated records, best first.
        records: Vec<LeaderboardRecord>,
    },
    /// A leaderboard fetch failed or timed out; [`HubError::FetchFailed`]
    /// and [`HubError::FetchTimedOut`] tell the two apart.
    LeaderboardFailed {
        /// The game the fetch was for.
        game: GameId,
        /// What went wrong.
        error: HubError,
    },
}

/// An iterator over the hub's queued events, oldest first.
///
/// Returned by [`ScoreHub::events()`](crate::hub::client::ScoreHub::events).
/// It wraps the queue's drain so the backing `VecDeque` stays an
/// implementation detail, and it empties the queue even when dropped
/// part-way through; events a caller walks away from are gone.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a> {
    inner: Drain<'a, HubEvent>,
}

impl<'a> EventDrain<'a> {
    pub(crate) fn from_drain(inner: Drain<'a, HubEvent>) -> Self {
        Self { inner }
    }
}

impl Iterator for EventDrain<'_> {
    type Item = HubEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for EventDrain<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for EventDrain<'_> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl FusedIterator for EventDrain<'_> {}

impl std::fmt::Debug for EventDrain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::iter_with_drain
)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    fn submitted(points: u32) -> HubEvent {
        HubEvent::ScoreSubmitted {
            game: GameId::Guess,
            score: Score::new(points),
            new_best: false,
        }
    }

    fn queue_of(points: &[u32]) -> VecDeque<HubEvent> {
        points.iter().copied().map(submitted).collect()
    }

    #[test]
    fn drains_oldest_first() {
        let mut queue = queue_of(&[1, 2, 3]);
        let drained: Vec<_> = EventDrain::from_drain(queue.drain(..)).collect();
        assert_eq!(drained, vec![submitted(1), submitted(2), submitted(3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn stays_exhausted_once_empty() {
        let mut queue = queue_of(&[1]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.next(), Some(submitted(1)));
        assert_eq!(drain.next(), None);
        assert_eq!(drain.next(), None);
    }

    #[test]
    fn walks_from_both_ends() {
        let mut queue = queue_of(&[1, 2, 3]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.next_back(), Some(submitted(3)));
        assert_eq!(drain.next(), Some(submitted(1)));
        assert_eq!(drain.next_back(), Some(submitted(2)));
        assert_eq!(drain.next(), None);
    }

    #[test]
    fn len_and_size_hint_count_down_together() {
        let mut queue = queue_of(&[1, 2]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.len(), 2);
        assert_eq!(drain.size_hint(), (2, Some(2)));
        let _ = drain.next();
        assert_eq!(drain.len(), 1);
        assert_eq!(drain.size_hint(), (1, Some(1)));
    }

    #[test]
    fn dropping_a_partly_used_drain_still_clears_the_queue() {
        let mut queue = queue_of(&[1, 2, 3]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        let _ = drain.next();
        drop(drain);
        assert!(queue.is_empty());
    }

    #[test]
    fn debug_reports_the_remaining_count() {
        let mut queue = queue_of(&[1, 2]);
        let drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 2 }");
    }
}
