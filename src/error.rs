//! Error types reported by the hub client.

use std::error::Error;
use std::fmt;

/// The error type for hub operations.
///
/// Every failure is terminal for the operation that produced it: the hub
/// never retries on its own and carries no backoff machinery. Callers decide
/// whether to surface the failure, re-invoke the operation, or ignore it.
///
/// Asynchronous failures (store writes and reads completing after the call
/// returned) are delivered inside [`HubEvent`](crate::HubEvent)s carrying one
/// of these values rather than as a `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HubError {
    /// No live identity was available when an operation that writes on the
    /// user's behalf was invoked. Nothing was sent to the store. The only
    /// sensible recovery is routing the user to sign-in; retrying without a
    /// session will fail the same way.
    NotAuthenticated,

    /// The caller handed the hub something it cannot act on, such as a zero
    /// fetch limit or a builder missing its identity provider.
    InvalidRequest {
        /// Human-readable description of what was wrong with the request.
        info: String,
    },

    /// The store rejected or failed a write. The context is the store's own
    /// message, suitable for showing to the user. A failure on the
    /// leaderboard step does not undo the history append that preceded it.
    StoreUnavailable {
        /// The store-provided failure message.
        context: String,
    },

    /// A leaderboard read failed at the store.
    FetchFailed {
        /// The store-provided failure message.
        context: String,
    },

    /// A leaderboard read outlived its deadline. Distinct from
    /// [`FetchFailed`](Self::FetchFailed): the store never answered in time,
    /// and any answer that arrives later is dropped.
    FetchTimedOut {
        /// How long the hub waited before giving up, in milliseconds.
        waited_ms: u128,
    },

    /// Reading or writing the session cache file failed.
    SessionStorage {
        /// The underlying I/O or serialization failure.
        context: String,
    },
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::NotAuthenticated => {
                write!(f, "not authenticated: no live identity is signed in")
            }
            HubError::InvalidRequest { info } => {
                write!(f, "invalid request: {}", info)
            }
            HubError::StoreUnavailable { context } => {
                write!(f, "score store unavailable: {}", context)
            }
            HubError::FetchFailed { context } => {
                write!(f, "leaderboard fetch failed: {}", context)
            }
            HubError::FetchTimedOut { waited_ms } => {
                write!(f, "leaderboard fetch timed out after {} ms", waited_ms)
            }
            HubError::SessionStorage { context } => {
                write!(f, "session cache storage failed: {}", context)
            }
        }
    }
}

impl Error for HubError {}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_failure() {
        assert!(HubError::NotAuthenticated.to_string().contains("not authenticated"));
        let err = HubError::InvalidRequest {
            info: "limit must be nonzero".to_owned(),
        };
        assert!(err.to_string().contains("limit must be nonzero"));
        let err = HubError::StoreUnavailable {
            context: "connection refused".to_owned(),
        };
        assert!(err.to_string().contains("connection refused"));
        let err = HubError::FetchFailed {
            context: "index missing".to_owned(),
        };
        assert!(err.to_string().contains("index missing"));
        let err = HubError::FetchTimedOut { waited_ms: 10_000 };
        assert_eq!(err.to_string(), "leaderboard fetch timed out after 10000 ms");
        let err = HubError::SessionStorage {
            context: "permission denied".to_owned(),
        };
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn timeout_and_store_failure_are_distinct() {
        // Callers match on the variant to choose the user-facing message,
        // so these must never collapse into one another.
        let timeout = HubError::FetchTimedOut { waited_ms: 10_000 };
        let failure = HubError::FetchFailed {
            context: "boom".to_owned(),
        };
        assert_ne!(timeout, failure);
    }

    #[test]
    fn errors_are_boxable() {
        let err: Box<dyn Error> = Box::new(HubError::NotAuthenticated);
        assert!(err.to_string().contains("not authenticated"));
    }

    #[test]
    fn errors_are_clonable_and_hashable() {
        use std::collections::HashSet;
        let err = HubError::FetchTimedOut { waited_ms: 42 };
        let clone = err.clone();
        assert_eq!(err, clone);
        let mut set = HashSet::new();
        set.insert(err);
        assert!(set.contains(&clone));
    }
}
