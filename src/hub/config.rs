//! Configuration for the score hub.

use web_time::Duration;

use crate::error::HubError;

/// Default deadline for a leaderboard fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of leaderboard rows a fetch asks for.
pub const DEFAULT_FETCH_LIMIT: usize = 50;

/// Tunables for [`ScoreHub`](crate::hub::client::ScoreHub).
///
/// The defaults suit an interactive app on a typical connection: a fetch
/// that takes longer than ten seconds is treated as failed, and one
/// leaderboard screen's worth of rows is requested at a time.
///
/// The struct is non-exhaustive in spirit even though its fields are
/// public: construct it with struct update syntax over
/// `HubConfig::default()` so added fields do not break your build.
///
/// # Example
///
/// ```
/// use arcade_hub::HubConfig;
/// use web_time::Duration;
///
/// let config = HubConfig {
///     fetch_timeout: Duration::from_secs(5),
///     ..HubConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "HubConfig has no effect unless passed to HubBuilder::with_config()"]
pub struct HubConfig {
    /// How long a leaderboard query may stay unanswered before the hub
    /// gives up and emits `FetchTimedOut`. A response arriving after the
    /// deadline is dropped, never delivered late.
    ///
    /// Default: 10s
    pub fetch_timeout: Duration,

    /// How many rows [`fetch_leaderboard`] requests. Callers wanting a
    /// different depth for one query use [`fetch_leaderboard_top`].
    ///
    /// Default: 50
    ///
    /// [`fetch_leaderboard`]: crate::hub::client::ScoreHub::fetch_leaderboard
    /// [`fetch_leaderboard_top`]: crate::hub::client::ScoreHub::fetch_leaderboard_top
    pub default_fetch_limit: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            default_fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

impl HubConfig {
    /// Creates a new `HubConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for slow or congested connections.
    ///
    /// Triples the fetch deadline so a struggling store still gets to
    /// answer rather than burning the query on a timeout.
    pub fn patient() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// Preset for snappy UIs on good connections.
    ///
    /// A three-second deadline and a shorter board; better to show a
    /// retry prompt quickly than to spin.
    pub fn responsive() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(3),
            default_fetch_limit: 20,
        }
    }

    /// Preset for tests that drive the poll loop themselves.
    ///
    /// The deadline is 50 milliseconds so a test can provoke a timeout
    /// with a short sleep instead of stalling for seconds.
    ///
    /// # Warning
    ///
    /// ONLY USE FOR TESTING. Any real connection will blow through a
    /// deadline this tight.
    pub fn testing() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(50),
            default_fetch_limit: 10,
        }
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] when the fetch timeout or the
    /// default fetch limit is zero.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.fetch_timeout.is_zero() {
            return Err(HubError::InvalidRequest {
                info: "fetch_timeout must be greater than zero".to_owned(),
            });
        }
        if self.default_fetch_limit == 0 {
            return Err(HubError::InvalidRequest {
                info: "default_fetch_limit must be greater than zero".to_owned(),
            });
        }
        Ok(())
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
    fn defaults_match_the_documented_values() {
        let config = HubConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.default_fetch_limit, 50);
        assert_eq!(config, HubConfig::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn presets_validate() {
        assert!(HubConfig::patient().validate().is_ok());
        assert!(HubConfig::responsive().validate().is_ok());
        assert!(HubConfig::testing().validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = HubConfig {
            fetch_timeout: Duration::ZERO,
            ..HubConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HubError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let config = HubConfig {
            default_fetch_limit: 0,
            ..HubConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HubError::InvalidRequest { .. })
        ));
    }
}
