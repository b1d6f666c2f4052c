//! Wire messages exchanged with a score store.
//!
//! Every store interaction is a [`StoreRequest`] tagged with a caller-chosen
//! [`RequestId`] and answered (or not) by a [`StoreResponse`] carrying the
//! same id. The id is the only correlation mechanism: responses may arrive
//! in any order, duplicated, or never, and a response whose id the hub no
//! longer tracks is silently dropped.
//!
//! Write shapes ([`ScoreEntry`], [`BestRecord`]) are fully populated; the
//! read shape ([`RawRecord`]) is all-optional because remote leaderboard
//! data may be partial or hand-edited.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GameId, Score, UserId};

/// Correlates a [`StoreResponse`] with the [`StoreRequest`] that caused it.
///
/// Ids are unique per hub instance, not globally; a store must echo the id
/// back untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw id value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable row of a user's score history.
///
/// History is append-only: entries are never updated or deleted, so a
/// user's past scores survive even when their leaderboard record moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// The player the entry belongs to.
    pub user_id: UserId,
    /// The game the score was achieved in.
    pub game: GameId,
    /// The points scored in this one play.
    pub score: Score,
    /// Wall-clock epoch milliseconds when the hub recorded the score.
    pub recorded_at_ms: u64,
    /// The display name resolved at submission time.
    pub display_name: String,
}

/// The complete write shape of a leaderboard best record.
///
/// Written whole on every accepted update so a record never ends up with
/// fields from two different submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestRecord {
    /// The player the record belongs to.
    pub user_id: UserId,
    /// The display name to show on the leaderboard.
    pub display_name: String,
    /// The player's best score for the game. Monotonically non-decreasing.
    pub high_score: Score,
    /// Wall-clock epoch milliseconds of the update that wrote this record.
    pub updated_at_ms: u64,
}

/// The lenient read shape of a stored best record.
///
/// Every field is optional: leaderboard data may predate the current
/// schema or have been edited out-of-band, and the client decides per
/// field whether absence disqualifies the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// The player the record belongs to, when recorded.
    pub user_id: Option<UserId>,
    /// The display name, when recorded.
    pub display_name: Option<String>,
    /// The best score, when recorded.
    pub high_score: Option<Score>,
    /// Last update time in epoch milliseconds, when recorded.
    pub updated_at_ms: Option<u64>,
}

impl From<BestRecord> for RawRecord {
    fn from(record: BestRecord) -> Self {
        Self {
            user_id: Some(record.user_id),
            display_name: Some(record.display_name),
            high_score: Some(record.high_score),
            updated_at_ms: Some(record.updated_at_ms),
        }
    }
}

/// A request sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Echoed back verbatim in the response.
    pub id: RequestId,
    /// What the store should do.
    pub body: RequestBody,
}

/// The store operations the hub issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestBody {
    /// Append one entry to the user's per-game history. Never conditional.
    AppendScore {
        /// The history row to append.
        entry: ScoreEntry,
    },
    /// Replace the `(game, user)` best record if and only if the stored
    /// high score is absent or strictly lower. The comparison and write
    /// are one atomic step on the store side.
    RecordBest {
        /// The game whose leaderboard is updated.
        game: GameId,
        /// The candidate record, written whole when it wins.
        record: BestRecord,
    },
    /// Fetch up to `limit` best records for a game, ordered by high score
    /// ascending with absent scores first. The hub reverses client-side.
    QueryTop {
        /// The game whose leaderboard is read.
        game: GameId,
        /// Maximum number of records to return.
        limit: u32,
    },
}

impl RequestBody {
    /// Short name of this operation, for log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AppendScore { .. } => "append-score",
            Self::RecordBest { .. } => "record-best",
            Self::QueryTop { .. } => "query-top",
        }
    }
}

/// A response from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    /// The id of the request this answers.
    pub id: RequestId,
    /// The outcome.
    pub body: ResponseBody,
}

/// Store outcomes, one per [`RequestBody`] plus a shared failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// The history entry was appended.
    Appended,
    /// The conditional best-record write ran; `updated` tells whether the
    /// candidate actually replaced the stored record.
    BestRecorded {
        /// `true` when the candidate won the comparison and was written.
        updated: bool,
    },
    /// The query result, in the store's ascending order.
    TopScores {
        /// Up to `limit` raw records.
        records: Vec<RawRecord>,
    },
    /// The operation failed; `message` is the store's own description.
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

impl ResponseBody {
    /// Short name of this outcome, for log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Appended => "appended",
            Self::BestRecorded { .. } => "best-recorded",
            Self::TopScores { .. } => "top-scores",
            Self::Failed { .. } => "failed",
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

    #[test]
    fn request_ids_order_by_value() {
        let early = RequestId::new(3);
        let late = RequestId::from(9);
        assert!(early < late);
        assert_eq!(late.value(), 9);
        assert_eq!(format!("{early}"), "3");
    }

    #[test]
    fn raw_record_from_best_is_fully_populated() {
        let best = BestRecord {
            user_id: UserId::new("uid-1"),
            display_name: "ada".to_owned(),
            high_score: Score::new(12),
            updated_at_ms: 1_700_000_000_000,
        };
        let raw = RawRecord::from(best.clone());
        assert_eq!(raw.user_id, Some(best.user_id));
        assert_eq!(raw.display_name, Some(best.display_name));
        assert_eq!(raw.high_score, Some(best.high_score));
        assert_eq!(raw.updated_at_ms, Some(best.updated_at_ms));
    }

    #[test]
    fn default_raw_record_is_all_absent() {
        let raw = RawRecord::default();
        assert!(raw.user_id.is_none());
        assert!(raw.display_name.is_none());
        assert!(raw.high_score.is_none());
        assert!(raw.updated_at_ms.is_none());
    }

    #[test]
    fn request_kinds_name_every_variant() {
        let entry = ScoreEntry {
            user_id: UserId::new("uid-1"),
            game: GameId::Guess,
            score: Score::new(5),
            recorded_at_ms: 0,
            display_name: "ada".to_owned(),
        };
        assert_eq!(RequestBody::AppendScore { entry }.kind(), "append-score");
        assert_eq!(
            RequestBody::QueryTop {
                game: GameId::Memory,
                limit: 1,
            }
            .kind(),
            "query-top"
        );
    }

    #[test]
    fn response_kinds_name_every_variant() {
        assert_eq!(ResponseBody::Appended.kind(), "appended");
        assert_eq!(ResponseBody::BestRecorded { updated: true }.kind(), "best-recorded");
        assert_eq!(ResponseBody::TopScores { records: vec![] }.kind(), "top-scores");
        assert_eq!(
            ResponseBody::Failed {
                message: "offline".to_owned(),
            }
            .kind(),
            "failed"
        );
    }

    #[test]
    fn game_names_serialize_canonically_inside_requests() {
        let request = StoreRequest {
            id: RequestId::new(1),
            body: RequestBody::QueryTop {
                game: GameId::Rps,
                limit: 50,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"RPS\""), "{json}");
        let back: StoreRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
