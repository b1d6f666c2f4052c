//! Local session cache.
//!
//! [`SessionCache`] remembers who signed in last so a UI can skip straight
//! past the login screen. It is a convenience layer only and is *never*
//! authoritative: the hub resolves the live user through
//! [`IdentityProvider::current_user`] on every operation, and
//! [`SessionCache::reconcile`] exists to pull the cache back in line with
//! the provider whenever they disagree.
//!
//! The cache is dependency-injected rather than reached through a global,
//! and can be purely in-memory or backed by a small JSON file. File writes
//! on [`SessionCache::create`] and [`SessionCache::clear`] are
//! fire-and-forget (failures are logged, not raised); callers that need to
//! know the write landed use [`SessionCache::persist`] directly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{IdentityProvider, UserIdentity};
use crate::error::HubError;
use crate::UserId;

/// A cached login descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The signed-in user's opaque id.
    pub user_id: UserId,
    /// The name shown in the UI for this user.
    pub username: String,
    /// The account email, empty when the provider reported none.
    pub email: String,
}

impl Session {
    /// Creates a session record.
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            email: email.into(),
        }
    }

    /// Builds the cacheable record for a live identity, resolving the
    /// username through the same fallback chain used for score records.
    #[must_use]
    pub fn from_identity(identity: &UserIdentity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            username: identity.resolve_display_name(),
            email: identity.email.clone().unwrap_or_default(),
        }
    }
}

/// The on-disk shape. Kept separate from [`Session`] so the file carries an
/// explicit `is_logged_in` flag and tolerates missing fields.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    is_logged_in: bool,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
}

impl StoredSession {
    fn snapshot(current: Option<&Session>) -> Self {
        match current {
            Some(session) => Self {
                is_logged_in: true,
                user_id: session.user_id.as_str().to_owned(),
                username: session.username.clone(),
                email: session.email.clone(),
            },
            None => Self {
                is_logged_in: false,
                user_id: String::new(),
                username: String::new(),
                email: String::new(),
            },
        }
    }

    fn into_session(self) -> Option<Session> {
        self.is_logged_in.then(|| Session {
            user_id: UserId::new(self.user_id),
            username: self.username,
            email: self.email,
        })
    }
}

/// A non-authoritative record of the last sign-in.
#[derive(Debug)]
pub struct SessionCache {
    current: Option<Session>,
    file: Option<PathBuf>,
}

impl SessionCache {
    /// Creates a cache with no file backing. State lives for the lifetime of
    /// the value and is lost on drop.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            current: None,
            file: None,
        }
    }

    /// Creates a cache backed by a JSON file at `path`, loading any session
    /// already recorded there.
    ///
    /// An unreadable or malformed file is treated as "nobody signed in" and
    /// logged; it gets overwritten by the next write-through.
    #[must_use]
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let mut cache = Self {
            current: None,
            file: Some(path.into()),
        };
        if let Err(error) = cache.load() {
            warn!(%error, "discarding unreadable session file");
        }
        cache
    }

    /// The backing file, if this cache has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Records a new session, replacing any previous one.
    ///
    /// File-backed caches write through immediately; a failed write is
    /// logged and the in-memory state stands.
    pub fn create(&mut self, session: Session) {
        debug!(user = %session.user_id, "session cached");
        self.current = Some(session);
        self.write_through();
    }

    /// Whether a session is currently cached. Remember that this answers
    /// "did someone sign in here recently", not "is someone signed in".
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    /// The cached session, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Forgets the cached session.
    pub fn clear(&mut self) {
        if self.current.take().is_some() {
            debug!("session cache cleared");
        }
        self.write_through();
    }

    /// Re-checks the cache against the live identity.
    ///
    /// When the provider reports nobody signed in, the cache is cleared;
    /// otherwise the cached fields are refreshed from the live user. Calling
    /// this at app start keeps a stale cache from outliving a remote
    /// sign-out.
    pub fn reconcile<P>(&mut self, provider: &P)
    where
        P: IdentityProvider + ?Sized,
    {
        match provider.current_user() {
            None => {
                if self.current.is_some() {
                    debug!("live session gone, dropping cached session");
                    self.clear();
                }
            },
            Some(identity) => {
                let live = Session::from_identity(&identity);
                if self.current.as_ref() != Some(&live) {
                    self.create(live);
                }
            },
        }
    }

    /// Writes the current state to the backing file, creating parent
    /// directories as needed. A no-op for in-memory caches.
    pub fn persist(&self) -> Result<(), HubError> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|error| HubError::SessionStorage {
                    context: format!("create {}: {error}", parent.display()),
                })?;
            }
        }
        let stored = StoredSession::snapshot(self.current.as_ref());
        let body = serde_json::to_string_pretty(&stored).map_err(|error| {
            HubError::SessionStorage {
                context: format!("encode session: {error}"),
            }
        })?;
        fs::write(path, body).map_err(|error| HubError::SessionStorage {
            context: format!("write {}: {error}", path.display()),
        })
    }

    /// Reloads state from the backing file. A missing file means "nobody
    /// signed in"; a malformed one is an error. A no-op for in-memory
    /// caches.
    pub fn load(&mut self) -> Result<(), HubError> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                self.current = None;
                return Ok(());
            },
            Err(error) => {
                return Err(HubError::SessionStorage {
                    context: format!("read {}: {error}", path.display()),
                });
            },
        };
        let stored: StoredSession =
            serde_json::from_str(&body).map_err(|error| HubError::SessionStorage {
                context: format!("decode {}: {error}", path.display()),
            })?;
        self.current = stored.into_session();
        Ok(())
    }

    fn write_through(&self) {
        if let Err(error) = self.persist() {
            warn!(%error, "session write-through failed");
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
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::auth::MemoryIdentity;

    fn temp_path(tag: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "arcade-hub-session-{}-{tag}-{unique}.json",
            std::process::id()
        ))
    }

    fn sample_session() -> Session {
        Session::new("uid-1", "ada", "ada@example.com")
    }

    #[test]
    fn in_memory_lifecycle() {
        let mut cache = SessionCache::in_memory();
        assert!(!cache.is_logged_in());
        assert!(cache.current().is_none());

        cache.create(sample_session());
        assert!(cache.is_logged_in());
        assert_eq!(cache.current(), Some(&sample_session()));

        cache.clear();
        assert!(!cache.is_logged_in());
        assert!(cache.current().is_none());
    }

    #[test]
    fn persisting_without_a_file_is_a_no_op() {
        let mut cache = SessionCache::in_memory();
        cache.create(sample_session());
        assert!(cache.persist().is_ok());
        assert!(cache.load().is_ok());
    }

    #[test]
    fn sessions_survive_across_instances() {
        let path = temp_path("roundtrip");
        {
            let mut cache = SessionCache::with_file(&path);
            cache.create(sample_session());
        }
        let reopened = SessionCache::with_file(&path);
        assert!(reopened.is_logged_in());
        assert_eq!(reopened.current(), Some(&sample_session()));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn clear_writes_through() {
        let path = temp_path("clear");
        {
            let mut cache = SessionCache::with_file(&path);
            cache.create(sample_session());
            cache.clear();
        }
        let reopened = SessionCache::with_file(&path);
        assert!(!reopened.is_logged_in());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_means_logged_out() {
        let path = temp_path("missing");
        let cache = SessionCache::with_file(&path);
        assert!(!cache.is_logged_in());
    }

    #[test]
    fn malformed_file_is_discarded() {
        let path = temp_path("garbage");
        fs::write(&path, b"not json at all").unwrap();
        let cache = SessionCache::with_file(&path);
        assert!(!cache.is_logged_in());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = temp_path("partial");
        fs::write(&path, br#"{ "is_logged_in": true, "user_id": "uid-9" }"#).unwrap();
        let cache = SessionCache::with_file(&path);
        let session = cache.current().unwrap();
        assert_eq!(session.user_id.as_str(), "uid-9");
        assert_eq!(session.username, "");
        assert_eq!(session.email, "");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn persist_reports_unwritable_paths() {
        let blocker = temp_path("blocker");
        fs::write(&blocker, b"plain file").unwrap();
        // Using a file as a directory component must fail loudly.
        let mut cache = SessionCache::with_file(blocker.join("nested.json"));
        cache.current = Some(sample_session());
        let error = cache.persist().unwrap_err();
        assert!(matches!(error, HubError::SessionStorage { .. }));
        let _ = fs::remove_file(&blocker);
    }

    #[test]
    fn reconcile_clears_when_live_session_is_gone() {
        let provider = MemoryIdentity::new();
        let mut cache = SessionCache::in_memory();
        cache.create(sample_session());

        cache.reconcile(&provider);
        assert!(!cache.is_logged_in());
    }

    #[test]
    fn reconcile_refreshes_from_the_live_user() {
        let mut provider = MemoryIdentity::new();
        provider
            .sign_up("grace", "grace@example.com", "hunter42")
            .unwrap();
        provider.sign_in("grace@example.com", "hunter42").unwrap();

        let mut cache = SessionCache::in_memory();
        cache.create(sample_session());
        cache.reconcile(&provider);

        let session = cache.current().unwrap();
        assert_eq!(session.username, "grace");
        assert_eq!(session.email, "grace@example.com");
    }

    #[test]
    fn session_from_identity_uses_the_fallback_chain() {
        let identity = UserIdentity {
            user_id: UserId::new("uid-2"),
            display_name: None,
            email: Some("grace.hopper@example.com".to_owned()),
        };
        let session = Session::from_identity(&identity);
        assert_eq!(session.username, "grace.hopper");
        assert_eq!(session.email, "grace.hopper@example.com");
    }
}
