//! The identity boundary.
//!
//! Everything the hub knows about "who is signed in" comes through the
//! [`IdentityProvider`] trait: a synchronous snapshot of the live user plus
//! the sign-in, sign-up, sign-out, and password-reset entry points. The hub
//! never stores credentials itself and trusts the provider completely.
//!
//! [`MemoryIdentity`] is the provided implementation: an in-memory account
//! table whose clone handles share state, which makes it the natural fixture
//! for tests and local builds. Production deployments implement the trait
//! over their real identity service.
//!
//! Credential validation (email shape, password and username length) lives
//! here as free functions so that sign-up forms can check input before ever
//! reaching a provider.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::UserId;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum accepted username length, in characters, after trimming.
pub const MIN_USERNAME_LEN: usize = 3;

/// Display name used when neither a profile name nor an email is available.
pub const FALLBACK_DISPLAY_NAME: &str = "Anonymous";

/// Errors reported by the identity boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The email address is not plausibly shaped like an email address.
    InvalidEmail,
    /// The password is shorter than the accepted minimum.
    PasswordTooShort {
        /// The minimum number of characters required.
        minimum: usize,
    },
    /// The username is shorter than the accepted minimum after trimming.
    UsernameTooShort {
        /// The minimum number of characters required.
        minimum: usize,
    },
    /// The two password fields of a sign-up form do not match.
    PasswordMismatch,
    /// An account with this email already exists.
    EmailTaken,
    /// The email/password pair did not match any account.
    InvalidCredentials,
    /// A password reset was requested for an email with no account.
    UnknownEmail,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidEmail => write!(f, "enter a valid email address"),
            AuthError::PasswordTooShort { minimum } => {
                write!(f, "password must be at least {} characters", minimum)
            }
            AuthError::UsernameTooShort { minimum } => {
                write!(f, "username must be at least {} characters", minimum)
            }
            AuthError::PasswordMismatch => write!(f, "passwords do not match"),
            AuthError::EmailTaken => write!(f, "email address is already in use"),
            AuthError::InvalidCredentials => write!(f, "email or password is incorrect"),
            AuthError::UnknownEmail => write!(f, "no account exists for that email"),
        }
    }
}

impl Error for AuthError {}

/// Checks that an email has a non-empty local part, a single `@`, and a
/// dotted domain. This is a plausibility check, not RFC validation; the
/// provider remains the authority on whether an address is deliverable.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(AuthError::InvalidEmail);
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return Err(AuthError::InvalidEmail);
    };
    if host.is_empty() || tld.is_empty() {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

/// Checks the minimum password length.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort {
            minimum: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Checks the minimum username length, ignoring surrounding whitespace.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.trim().chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::UsernameTooShort {
            minimum: MIN_USERNAME_LEN,
        });
    }
    Ok(())
}

/// Validates a complete sign-up form, including the confirm-password field.
///
/// Checks run in form order (username, email, password, confirm) and the
/// first failure is returned, so a UI can focus the offending field.
pub fn validate_sign_up(
    username: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<(), AuthError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)?;
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// Validates a sign-in form.
pub fn validate_sign_in(email: &str, password: &str) -> Result<(), AuthError> {
    validate_email(email)?;
    validate_password(password)?;
    Ok(())
}

/// A snapshot of the signed-in user as reported by the provider.
///
/// Both the display name and the email are optional because accounts created
/// through other channels may carry neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// The provider-assigned opaque id.
    pub user_id: UserId,
    /// The profile display name, if one was ever set.
    pub display_name: Option<String>,
    /// The account email, if the provider exposes one.
    pub email: Option<String>,
}

impl UserIdentity {
    /// Resolves the name to record next to scores.
    ///
    /// Falls back in order: profile display name if non-blank, then the part
    /// of the email before `@`, then [`FALLBACK_DISPLAY_NAME`].
    #[must_use]
    pub fn resolve_display_name(&self) -> String {
        if let Some(name) = &self.display_name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map_or_else(|| FALLBACK_DISPLAY_NAME.to_owned(), str::to_owned)
    }
}

/// The identity service the hub is deployed against.
///
/// `current_user` is a cheap synchronous snapshot and is consulted on every
/// operation that writes on the user's behalf; the hub never caches its
/// answer. The remaining methods are the account lifecycle. Implementations
/// own credential storage and verification entirely.
pub trait IdentityProvider: fmt::Debug {
    /// Authenticates an email/password pair and makes that user current.
    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserIdentity, AuthError>;

    /// Registers a new account and sets its display name from the username.
    ///
    /// The new account is left signed *out*: callers route the user through a
    /// fresh sign-in, which keeps "account exists" and "session exists"
    /// visibly separate steps.
    fn sign_up(&mut self, username: &str, email: &str, password: &str)
        -> Result<UserId, AuthError>;

    /// Ends the current session, if any.
    fn sign_out(&mut self);

    /// Requests a password-reset message for the given email.
    fn request_password_reset(&mut self, email: &str) -> Result<(), AuthError>;

    /// Returns the currently signed-in user, if any.
    fn current_user(&self) -> Option<UserIdentity>;
}

#[derive(Debug)]
struct Account {
    user_id: UserId,
    password: String,
    display_name: Option<String>,
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: BTreeMap<String, Account>,
    active: Option<UserIdentity>,
    next_user: u64,
    reset_requests: Vec<String>,
}

/// An in-memory [`IdentityProvider`].
///
/// Clone handles share one account table and one live session, so a test can
/// hold a handle, hand a clone to the hub, and flip the signed-in state out
/// from under it. Passwords are held in plain text; this type is a stand-in
/// for a real identity service, not a place to keep real credentials.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    inner: Arc<Mutex<ProviderState>>,
}

impl MemoryIdentity {
    /// Creates an empty provider with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider already signed in as the given identity.
    ///
    /// The identity does not need a backing account; this exists so fixtures
    /// can fabricate edge-case users, such as one with no display name.
    #[must_use]
    pub fn signed_in_as(identity: UserIdentity) -> Self {
        let provider = Self::new();
        provider.inner.lock().active = Some(identity);
        provider
    }

    /// Emails that asked for a password reset, in request order.
    #[must_use]
    pub fn reset_requests(&self) -> Vec<String> {
        self.inner.lock().reset_requests.clone()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.inner.lock().accounts.len()
    }
}

impl fmt::Debug for MemoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        // Deliberately omits account contents so passwords never hit logs.
        f.debug_struct("MemoryIdentity")
            .field("accounts", &state.accounts.len())
            .field("signed_in", &state.active.is_some())
            .finish()
    }
}

impl IdentityProvider for MemoryIdentity {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        validate_sign_in(email, password)?;
        let mut state = self.inner.lock();
        let Some(account) = state.accounts.get(email) else {
            return Err(AuthError::InvalidCredentials);
        };
        if account.password != password {
            return Err(AuthError::InvalidCredentials);
        }
        let identity = UserIdentity {
            user_id: account.user_id.clone(),
            display_name: account.display_name.clone(),
            email: Some(email.to_owned()),
        };
        state.active = Some(identity.clone());
        debug!(user = %identity.user_id, "signed in");
        Ok(identity)
    }

    fn sign_up(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserId, AuthError> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;
        let mut state = self.inner.lock();
        if state.accounts.contains_key(email) {
            return Err(AuthError::EmailTaken);
        }
        state.next_user += 1;
        let user_id = UserId::new(format!("user-{:04}", state.next_user));
        state.accounts.insert(
            email.to_owned(),
            Account {
                user_id: user_id.clone(),
                password: password.to_owned(),
                display_name: Some(username.trim().to_owned()),
            },
        );
        // The fresh account must sign in explicitly.
        state.active = None;
        debug!(user = %user_id, "account created");
        Ok(user_id)
    }

    fn sign_out(&mut self) {
        self.inner.lock().active = None;
    }

    fn request_password_reset(&mut self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;
        let mut state = self.inner.lock();
        if !state.accounts.contains_key(email) {
            return Err(AuthError::UnknownEmail);
        }
        state.reset_requests.push(email.to_owned());
        Ok(())
    }

    fn current_user(&self) -> Option<UserIdentity> {
        self.inner.lock().active.clone()
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

    fn identity(name: Option<&str>, email: Option<&str>) -> UserIdentity {
        UserIdentity {
            user_id: UserId::new("uid-test"),
            display_name: name.map(str::to_owned),
            email: email.map(str::to_owned),
        }
    }

    #[test]
    fn email_validation_accepts_plausible_addresses() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.co").is_ok());
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        for bad in [
            "",
            "ada",
            "@example.com",
            "ada@",
            "ada@example",
            "ada@.com",
            "ada@com.",
            "ada a@example.com",
            "ada@@example.com",
        ] {
            assert_eq!(validate_email(bad), Err(AuthError::InvalidEmail), "{bad:?}");
        }
    }

    #[test]
    fn password_and_username_minimums() {
        assert_eq!(
            validate_password("12345"),
            Err(AuthError::PasswordTooShort { minimum: 6 })
        );
        assert!(validate_password("123456").is_ok());
        assert_eq!(
            validate_username("ab"),
            Err(AuthError::UsernameTooShort { minimum: 3 })
        );
        assert_eq!(
            validate_username("  ab  "),
            Err(AuthError::UsernameTooShort { minimum: 3 })
        );
        assert!(validate_username("abc").is_ok());
    }

    #[test]
    fn sign_up_form_checks_run_in_form_order() {
        assert_eq!(
            validate_sign_up("x", "bad", "short", "short"),
            Err(AuthError::UsernameTooShort { minimum: 3 })
        );
        assert_eq!(
            validate_sign_up("ada", "bad", "short", "short"),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            validate_sign_up("ada", "ada@example.com", "short", "short"),
            Err(AuthError::PasswordTooShort { minimum: 6 })
        );
        assert_eq!(
            validate_sign_up("ada", "ada@example.com", "hunter42", "hunter43"),
            Err(AuthError::PasswordMismatch)
        );
        assert!(validate_sign_up("ada", "ada@example.com", "hunter42", "hunter42").is_ok());
    }

    #[test]
    fn display_name_prefers_profile_name() {
        let user = identity(Some("Ada"), Some("ada@example.com"));
        assert_eq!(user.resolve_display_name(), "Ada");
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let user = identity(None, Some("ada.lovelace@example.com"));
        assert_eq!(user.resolve_display_name(), "ada.lovelace");
        // A blank profile name counts as absent.
        let user = identity(Some("   "), Some("ada@example.com"));
        assert_eq!(user.resolve_display_name(), "ada");
    }

    #[test]
    fn display_name_falls_back_to_anonymous() {
        let user = identity(None, None);
        assert_eq!(user.resolve_display_name(), FALLBACK_DISPLAY_NAME);
        // An email with an empty local part cannot name anyone.
        let user = identity(None, Some("@example.com"));
        assert_eq!(user.resolve_display_name(), FALLBACK_DISPLAY_NAME);
        let user = identity(Some(""), Some(""));
        assert_eq!(user.resolve_display_name(), FALLBACK_DISPLAY_NAME);
    }

    #[test]
    fn sign_up_then_sign_in_roundtrip() {
        let mut auth = MemoryIdentity::new();
        let user_id = auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();

        // Registration does not start a session.
        assert!(auth.current_user().is_none());

        let signed_in = auth.sign_in("ada@example.com", "hunter42").unwrap();
        assert_eq!(signed_in.user_id, user_id);
        assert_eq!(signed_in.display_name.as_deref(), Some("ada"));
        assert_eq!(auth.current_user(), Some(signed_in));
    }

    #[test]
    fn sign_up_trims_the_username() {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("  ada  ", "ada@example.com", "hunter42").unwrap();
        let user = auth.sign_in("ada@example.com", "hunter42").unwrap();
        assert_eq!(user.display_name.as_deref(), Some("ada"));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();
        assert_eq!(
            auth.sign_up("other", "ada@example.com", "different1"),
            Err(AuthError::EmailTaken)
        );
    }

    #[test]
    fn wrong_credentials_are_rejected() {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();
        assert_eq!(
            auth.sign_in("ada@example.com", "wrong-password"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in("nobody@example.com", "hunter42"),
            Err(AuthError::InvalidCredentials)
        );
        assert!(auth.current_user().is_none());
    }

    #[test]
    fn sign_out_clears_the_session() {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();
        auth.sign_in("ada@example.com", "hunter42").unwrap();
        auth.sign_out();
        assert!(auth.current_user().is_none());
    }

    #[test]
    fn password_reset_requires_a_known_account() {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();

        assert!(auth.request_password_reset("ada@example.com").is_ok());
        assert_eq!(
            auth.request_password_reset("nobody@example.com"),
            Err(AuthError::UnknownEmail)
        );
        assert_eq!(
            auth.request_password_reset("not-an-email"),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(auth.reset_requests(), vec!["ada@example.com".to_owned()]);
    }

    #[test]
    fn clone_handles_share_state() {
        let mut auth = MemoryIdentity::new();
        let observer = auth.clone();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();
        auth.sign_in("ada@example.com", "hunter42").unwrap();

        assert!(observer.current_user().is_some());
        assert_eq!(observer.account_count(), 1);
    }

    #[test]
    fn signed_in_as_installs_an_arbitrary_identity() {
        let forged = identity(None, Some("ghost@example.com"));
        let auth = MemoryIdentity::signed_in_as(forged.clone());
        assert_eq!(auth.current_user(), Some(forged));
        assert_eq!(auth.account_count(), 0);
    }

    #[test]
    fn debug_output_never_contains_passwords() {
        let mut auth = MemoryIdentity::new();
        auth.sign_up("ada", "ada@example.com", "hunter42").unwrap();
        let debug = format!("{auth:?}");
        assert!(debug.contains("MemoryIdentity"));
        assert!(!debug.contains("hunter42"));
    }

    #[test]
    fn error_messages_read_like_form_feedback() {
        assert_eq!(
            AuthError::PasswordTooShort { minimum: MIN_PASSWORD_LEN }.to_string(),
            "password must be at least 6 characters"
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "email or password is incorrect"
        );
    }
}
