//! Builder for [`ScoreHub`].

use crate::auth::IdentityProvider;
use crate::error::HubError;
use crate::hub::client::ScoreHub;
use crate::hub::config::HubConfig;
use crate::StoreTransport;

/// Assembles a [`ScoreHub`] from its two dependencies and a config.
///
/// A hub needs an identity provider (who is signed in) and a store
/// transport (where scores live); both are taken as owned trait objects so
/// the hub can be handed around freely. The builder is consumed by
/// [`connect`](Self::connect).
///
/// # Examples
///
/// ```
/// use arcade_hub::{HubBuilder, HubConfig, MemoryIdentity, MemoryStore};
///
/// let hub = HubBuilder::new()
///     .with_config(HubConfig::responsive())
///     .with_identity(MemoryIdentity::new())
///     .connect(MemoryStore::new())?;
/// assert_eq!(hub.pending_requests(), 0);
/// # Ok::<(), arcade_hub::HubError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "call connect() to produce a hub"]
pub struct HubBuilder {
    config: HubConfig,
    identity: Option<Box<dyn IdentityProvider>>,
}

impl HubBuilder {
    /// Creates a builder with the default [`HubConfig`] and no identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration. Validated at [`connect`](Self::connect)
    /// time, not here.
    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the identity provider. Required.
    pub fn with_identity(mut self, provider: impl IdentityProvider + 'static) -> Self {
        self.identity = Some(Box::new(provider));
        self
    }

    /// Builds the hub against the given store.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidRequest`] when no identity provider was
    /// set or the configuration fails [`HubConfig::validate`].
    pub fn connect(self, store: impl StoreTransport + 'static) -> Result<ScoreHub, HubError> {
        self.config.validate()?;
        let Some(identity) = self.identity else {
            return Err(HubError::InvalidRequest {
                info: "an identity provider is required; call with_identity() first".to_owned(),
            });
        };
        Ok(ScoreHub::new(self.config, identity, Box::new(store)))
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
    use web_time::Duration;

    use super::*;
    use crate::auth::MemoryIdentity;
    use crate::store::memory::MemoryStore;

    #[test]
    fn connect_requires_an_identity() {
        let result = HubBuilder::new().connect(MemoryStore::new());
        assert!(matches!(result, Err(HubError::InvalidRequest { .. })));
    }

    #[test]
    fn connect_rejects_an_invalid_config() {
        let config = HubConfig {
            fetch_timeout: Duration::ZERO,
            ..HubConfig::default()
        };
        let result = HubBuilder::new()
            .with_config(config)
            .with_identity(MemoryIdentity::new())
            .connect(MemoryStore::new());
        assert!(matches!(result, Err(HubError::InvalidRequest { .. })));
    }

    #[test]
    fn connect_with_defaults_succeeds() {
        let hub = HubBuilder::new()
            .with_identity(MemoryIdentity::new())
            .connect(MemoryStore::new())
            .unwrap();
        assert_eq!(*hub.config(), HubConfig::default());
        assert_eq!(hub.pending_requests(), 0);
    }

    #[test]
    fn with_config_is_kept() {
        let hub = HubBuilder::new()
            .with_config(HubConfig::responsive())
            .with_identity(MemoryIdentity::new())
            .connect(MemoryStore::new())
            .unwrap();
        assert_eq!(*hub.config(), HubConfig::responsive());
    }
}
