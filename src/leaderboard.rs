//! Leaderboard snapshots.
//!
//! The store answers a top-N query with raw records in *ascending* score
//! order (its native index order, absent scores first). This module turns
//! that into what callers actually want: a descending, validated list.
//!
//! Validation is deliberately lenient. A raw record missing its display
//! name or high score cannot be shown and is dropped with a debug log,
//! never an error; one corrupt row must not take down the whole board.
//! A missing user id or timestamp is tolerated, the record just cannot be
//! matched by [`rank_of`].

use tracing::debug;

use crate::store::messages::RawRecord;
use crate::{Score, UserId};

/// One validated leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRecord {
    /// The player, when the stored record carried an id.
    pub user_id: Option<UserId>,
    /// The name to show for this row.
    pub display_name: String,
    /// The player's best score.
    pub high_score: Score,
    /// Epoch milliseconds of the last update, when recorded.
    pub updated_at_ms: Option<u64>,
}

impl LeaderboardRecord {
    /// Validates a raw record. `None` when the display name or high score
    /// is missing; the other fields may be absent.
    #[must_use]
    pub fn from_raw(raw: RawRecord) -> Option<Self> {
        let display_name = raw.display_name?;
        let high_score = raw.high_score?;
        Some(Self {
            user_id: raw.user_id,
            display_name,
            high_score,
            updated_at_ms: raw.updated_at_ms,
        })
    }
}

/// Turns an ascending store snapshot into the descending list shown to
/// callers, dropping records that fail validation.
#[must_use]
pub fn collate(raw: Vec<RawRecord>) -> Vec<LeaderboardRecord> {
    let total = raw.len();
    let mut records: Vec<LeaderboardRecord> =
        raw.into_iter().filter_map(LeaderboardRecord::from_raw).collect();
    let dropped = total - records.len();
    if dropped > 0 {
        debug!(dropped, kept = records.len(), "dropped partial leaderboard records");
    }
    records.reverse();
    records
}

/// The 1-based rank of `user` within a collated snapshot.
///
/// `None` when the user has no row in the snapshot, including when their
/// row was stored without a user id.
#[must_use]
pub fn rank_of(records: &[LeaderboardRecord], user: &UserId) -> Option<usize> {
    records
        .iter()
        .position(|record| record.user_id.as_ref() == Some(user))
        .map(|index| index + 1)
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

    fn complete(user: &str, name: &str, score: u32) -> RawRecord {
        RawRecord {
            user_id: Some(UserId::new(user)),
            display_name: Some(name.to_owned()),
            high_score: Some(Score::new(score)),
            updated_at_ms: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn from_raw_keeps_complete_records() {
        let record = LeaderboardRecord::from_raw(complete("uid-1", "ada", 12)).unwrap();
        assert_eq!(record.user_id, Some(UserId::new("uid-1")));
        assert_eq!(record.display_name, "ada");
        assert_eq!(record.high_score, Score::new(12));
    }

    #[test]
    fn from_raw_requires_name_and_score() {
        let mut nameless = complete("uid-1", "ada", 12);
        nameless.display_name = None;
        assert!(LeaderboardRecord::from_raw(nameless).is_none());

        let mut scoreless = complete("uid-1", "ada", 12);
        scoreless.high_score = None;
        assert!(LeaderboardRecord::from_raw(scoreless).is_none());
    }

    #[test]
    fn from_raw_tolerates_missing_id_and_timestamp() {
        let mut anonymous = complete("uid-1", "ada", 12);
        anonymous.user_id = None;
        anonymous.updated_at_ms = None;
        let record = LeaderboardRecord::from_raw(anonymous).unwrap();
        assert!(record.user_id.is_none());
        assert!(record.updated_at_ms.is_none());
    }

    #[test]
    fn collate_flips_ascending_to_descending() {
        let snapshot = vec![
            complete("uid-c", "carol", 20),
            complete("uid-b", "bob", 30),
        ];
        let records = collate(snapshot);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display_name, "bob");
        assert_eq!(records[0].high_score, Score::new(30));
        assert_eq!(records[1].display_name, "carol");
        assert_eq!(records[1].high_score, Score::new(20));
    }

    #[test]
    fn collate_drops_partials_and_keeps_the_rest() {
        let snapshot = vec![
            complete("uid-a", "alice", 10),
            RawRecord {
                user_id: Some(UserId::new("uid-x")),
                display_name: None,
                high_score: Some(Score::new(99)),
                updated_at_ms: None,
            },
            RawRecord {
                user_id: None,
                display_name: Some("ghost".to_owned()),
                high_score: None,
                updated_at_ms: None,
            },
            complete("uid-b", "bob", 30),
        ];
        let records = collate(snapshot);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display_name, "bob");
        assert_eq!(records[1].display_name, "alice");
    }

    #[test]
    fn collate_of_nothing_is_empty() {
        assert!(collate(Vec::new()).is_empty());
    }

    #[test]
    fn rank_is_one_based() {
        let records = collate(vec![
            complete("uid-a", "alice", 10),
            complete("uid-c", "carol", 20),
            complete("uid-b", "bob", 30),
        ]);
        assert_eq!(rank_of(&records, &UserId::new("uid-b")), Some(1));
        assert_eq!(rank_of(&records, &UserId::new("uid-c")), Some(2));
        assert_eq!(rank_of(&records, &UserId::new("uid-a")), Some(3));
        assert_eq!(rank_of(&records, &UserId::new("uid-z")), None);
    }

    #[test]
    fn rank_ignores_rows_without_an_id() {
        let mut anonymous = complete("uid-a", "alice", 10);
        anonymous.user_id = None;
        let records = collate(vec![anonymous]);
        assert_eq!(records.len(), 1);
        assert_eq!(rank_of(&records, &UserId::new("uid-a")), None);
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn prop_collate_keeps_exactly_the_complete_records(
            rows in prop::collection::vec(
                (
                    proptest::option::of(0_u32..1000),
                    proptest::option::of("[a-z]{1,8}"),
                ),
                0..40,
            )
        ) {
            let raw: Vec<RawRecord> = rows
                .into_iter()
                .map(|(score, name)| RawRecord {
                    user_id: None,
                    display_name: name,
                    high_score: score.map(Score::new),
                    updated_at_ms: None,
                })
                .collect();
            let complete = raw
                .iter()
                .filter(|r| r.display_name.is_some() && r.high_score.is_some())
                .count();
            prop_assert_eq!(collate(raw).len(), complete);
        }

        #[test]
        fn prop_collate_of_an_ascending_snapshot_is_descending(
            mut scores in prop::collection::vec(0_u32..10_000, 0..30)
        ) {
            scores.sort_unstable();
            let raw: Vec<RawRecord> = scores
                .iter()
                .enumerate()
                .map(|(i, &score)| RawRecord {
                    user_id: Some(UserId::new(format!("uid-{i}"))),
                    display_name: Some(format!("player-{i}")),
                    high_score: Some(Score::new(score)),
                    updated_at_ms: Some(0),
                })
                .collect();
            let records = collate(raw);
            prop_assert_eq!(records.len(), scores.len());
            prop_assert!(records
                .windows(2)
                .all(|pair| pair[0].high_score >= pair[1].high_score));
        }

        #[test]
        fn prop_every_identified_row_has_an_in_bounds_rank(
            count in 1_usize..30,
            pick in 0_usize..30,
        ) {
            let raw: Vec<RawRecord> = (0..count)
                .map(|i| RawRecord {
                    user_id: Some(UserId::new(format!("uid-{i}"))),
                    display_name: Some(format!("player-{i}")),
                    high_score: Some(Score::new(u32::try_from(i).unwrap_or(u32::MAX))),
                    updated_at_ms: None,
                })
                .collect();
            let records = collate(raw);
            let target = pick % count;
            let rank = rank_of(&records, &UserId::new(format!("uid-{target}")));
            prop_assert!(rank.is_some());
            let rank = rank.unwrap();
            prop_assert!(rank >= 1 && rank <= count);
        }
    }
}
