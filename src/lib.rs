//! # Arcade Hub
//!
//! Arcade Hub is the score and session backbone for a collection of small
//! single-player games. It takes care of everything between "the player just
//! finished a round" and "the leaderboard screen shows the top scores":
//! resolving the signed-in identity, appending an immutable score history
//! entry, conditionally raising the per-game high score, and fetching a
//! descending top-N snapshot with a caller-visible deadline.
//!
//! The client is a poll-driven session object. Calls like
//! [`ScoreHub::submit_score`] never block; they validate synchronously, fire a
//! request at the store, and return. Completions are delivered as
//! [`HubEvent`]s the next time you call [`ScoreHub::poll_store`] and drain
//! [`ScoreHub::events`], so the whole client runs comfortably on a single
//! thread such as a UI event loop.
//!
//! ```
//! use arcade_hub::{
//!     GameId, HubBuilder, HubEvent, IdentityProvider, MemoryIdentity, MemoryStore, Score,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // A shared in-memory backend and identity provider. Clones of these
//! // handles all point at the same underlying state.
//! let store = MemoryStore::new();
//! let mut auth = MemoryIdentity::new();
//! auth.sign_up("ada", "ada@example.com", "hunter42")?;
//! auth.sign_in("ada@example.com", "hunter42")?;
//!
//! let mut hub = HubBuilder::new()
//!     .with_identity(auth.clone())
//!     .connect(store.clone())?;
//!
//! hub.submit_score(GameId::Guess, Score::new(12))?;
//! while hub.pending_requests() > 0 {
//!     hub.poll_store();
//! }
//!
//! let events: Vec<HubEvent> = hub.events().collect();
//! assert!(matches!(
//!     events.first(),
//!     Some(HubEvent::ScoreSubmitted { new_best: true, .. })
//! ));
//! # Ok(())
//! # }
//! ```
//!
//! The store and identity boundaries are traits ([`StoreTransport`],
//! [`auth::IdentityProvider`]), so the provided in-memory implementations can
//! be swapped for real remote backends without touching client code.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::{self, Debug};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use auth::{AuthError, IdentityProvider, MemoryIdentity, UserIdentity};
pub use error::HubError;
pub use hub::builder::HubBuilder;
pub use hub::client::ScoreHub;
pub use hub::config::HubConfig;
pub use hub::events::{EventDrain, HubEvent};
pub use leaderboard::LeaderboardRecord;
pub use session::{Session, SessionCache};
pub use store::chaos::{ChaosConfig, ChaosConfigBuilder, ChaosStats, ChaosStore};
pub use store::memory::MemoryStore;
pub use store::messages::{
    BestRecord, RawRecord, RequestBody, RequestId, ResponseBody, ScoreEntry, StoreRequest,
    StoreResponse,
};

#[doc(hidden)]
pub mod error;
/// Seeded PCG32 randomness for game rounds and fault injection.
pub mod rng;

/// Identity boundary: the provider trait, credential validation, and the
/// in-memory provider used by tests and local builds.
pub mod auth;
/// Local session cache with optional file persistence.
pub mod session;
/// Leaderboard record validation, ordering, and rank lookup.
pub mod leaderboard;

/// Score store boundary: wire messages, codec, and the provided backends.
pub mod store {
    pub mod chaos;
    pub mod codec;
    pub mod memory;
    pub mod messages;
}

/// The poll-driven hub client and its supporting pieces.
pub mod hub {
    pub mod builder;
    pub mod client;
    pub mod config;
    pub mod events;
}

/// Pure-logic cores for the hub's built-in mini-games.
///
/// Each game owns a seeded PCG32 generator, exposes its running score, and
/// leaves all rendering and input plumbing to the caller.
pub mod games {
    pub mod guess;
    pub mod memory;
    pub mod rps;
    pub mod tictactoe;
}

// #############################################################################
// #                              IDENTIFIERS                                  #
// #############################################################################

/// Identifies one of the hub's games.
///
/// The set of games is closed: score history keys, leaderboard keys, and
/// every store path derive from these four variants, so a typo'd game name
/// cannot exist. The canonical wire and display form of each variant is the
/// exact string returned by [`GameId::as_str`]; note that the forms are
/// case-sensitive (`"RPS"` is all caps, `"TicTacToe"` is camel case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameId {
    /// Number guessing: find the secret number, score by attempts left.
    Guess,
    /// Color sequence recall, one point per completed round.
    Memory,
    /// Rock, paper, scissors against a random opponent.
    #[serde(rename = "RPS")]
    Rps,
    /// 3x3 tic-tac-toe against a random opponent.
    TicTacToe,
}

impl GameId {
    /// Every game in the hub, in display order.
    pub const ALL: [Self; 4] = [Self::Guess, Self::Memory, Self::Rps, Self::TicTacToe];

    /// Returns the canonical store key for this game.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guess => "Guess",
            Self::Memory => "Memory",
            Self::Rps => "RPS",
            Self::TicTacToe => "TicTacToe",
        }
    }

    /// Parses a canonical game name. Case-sensitive; returns `None` for
    /// anything that is not exactly one of the four known keys.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Guess" => Some(Self::Guess),
            "Memory" => Some(Self::Memory),
            "RPS" => Some(Self::Rps),
            "TicTacToe" => Some(Self::TicTacToe),
            _ => None,
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| HubError::InvalidRequest {
            info: format!("unknown game id: {s:?}"),
        })
    }
}

/// A non-negative game score.
///
/// Scores are plain integers; the newtype exists so that a score can never be
/// confused with a request id, a limit, or a timestamp at a call site.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Score(u32);

impl Score {
    /// The zero score.
    pub const ZERO: Self = Self(0);

    /// Creates a score from a raw point count.
    #[must_use]
    pub const fn new(points: u32) -> Self {
        Self(points)
    }

    /// Returns the raw point count.
    #[must_use]
    pub const fn points(self) -> u32 {
        self.0
    }
}

impl From<u32> for Score {
    fn from(points: u32) -> Self {
        Self(points)
    }
}

impl From<Score> for u32 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl PartialEq<u32> for Score {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

impl PartialEq<Score> for u32 {
    fn eq(&self, other: &Score) -> bool {
        *self == other.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque user identifier assigned by the identity provider.
///
/// The hub never interprets the contents; it only uses the id as a store key
/// and for equality checks such as rank lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// #############################################################################
// #                             STORE BOUNDARY                                #
// #############################################################################

/// Non-blocking transport to the score store.
///
/// This is the seam between the hub client and whatever actually persists
/// scores. [`MemoryStore`] is the provided implementation; a remote backend
/// would serialize [`StoreRequest`]s with [`store::codec`] and push them over
/// its connection instead.
///
/// Both methods must return immediately. `send` fires a request and forgets
/// it; any outcome, including failure, arrives later as a [`StoreResponse`]
/// carrying the same [`RequestId`] (or never arrives at all, which the client
/// treats as a timeout for reads and silence for writes). Implementations
/// must not reorder a response ahead of the request that caused it, but no
/// ordering is required between distinct requests.
pub trait StoreTransport: Debug {
    /// Fires a request at the store. Must not block.
    fn send(&mut self, request: &StoreRequest);

    /// Drains every response that has arrived since the last call.
    /// Must not block when nothing is pending.
    fn receive_all_responses(&mut self) -> Vec<StoreResponse>;
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
    fn game_ids_use_canonical_store_keys() {
        // These strings are store keys shared with every deployed client.
        // They must never change, including their exact casing.
        assert_eq!(GameId::Guess.as_str(), "Guess");
        assert_eq!(GameId::Memory.as_str(), "Memory");
        assert_eq!(GameId::Rps.as_str(), "RPS");
        assert_eq!(GameId::TicTacToe.as_str(), "TicTacToe");
    }

    #[test]
    fn game_id_parse_roundtrip() {
        for game in GameId::ALL {
            assert_eq!(GameId::from_name(game.as_str()), Some(game));
            assert_eq!(game.as_str().parse::<GameId>().unwrap(), game);
        }
    }

    #[test]
    fn game_id_parse_is_case_sensitive() {
        assert_eq!(GameId::from_name("guess"), None);
        assert_eq!(GameId::from_name("rps"), None);
        assert_eq!(GameId::from_name("Rps"), None);
        assert_eq!(GameId::from_name("tictactoe"), None);
        assert_eq!(GameId::from_name(""), None);
        assert!("Snake".parse::<GameId>().is_err());
    }

    #[test]
    fn game_id_display_matches_as_str() {
        for game in GameId::ALL {
            assert_eq!(game.to_string(), game.as_str());
        }
    }

    #[test]
    fn score_ordering_and_display() {
        assert!(Score::new(5) < Score::new(7));
        assert_eq!(Score::ZERO, Score::new(0));
        assert_eq!(Score::new(42).points(), 42);
        assert_eq!(Score::new(42).to_string(), "42");
    }

    #[test]
    fn score_compares_against_raw_points() {
        assert_eq!(Score::new(10), 10u32);
        assert_eq!(10u32, Score::new(10));
        assert_ne!(Score::new(10), 11u32);
    }

    #[test]
    fn score_conversions() {
        let score: Score = 9u32.into();
        assert_eq!(score, Score::new(9));
        let raw: u32 = score.into();
        assert_eq!(raw, 9);
    }

    #[test]
    fn user_id_behaves_like_a_string_key() {
        let id = UserId::new("uid-1");
        assert_eq!(id.as_str(), "uid-1");
        assert_eq!(id.to_string(), "uid-1");
        assert_eq!(UserId::from("uid-1"), id);
        assert_eq!(UserId::from(String::from("uid-1")), id);
        assert!(UserId::new("a") < UserId::new("b"));
    }

    #[test]
    fn game_id_serde_names_match_store_keys() {
        // JSON form must agree with as_str so records written by other
        // clients read back under the same keys.
        for game in GameId::ALL {
            let json = serde_json::to_string(&game).unwrap();
            assert_eq!(json, format!("\"{}\"", game.as_str()));
            let back: GameId = serde_json::from_str(&json).unwrap();
            assert_eq!(back, game);
        }
    }
}
