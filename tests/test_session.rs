mod stubs;

use std::fs;

use arcade_hub::{
    GameId, HubError, IdentityProvider, MemoryIdentity, MemoryStore, Score, SessionCache, UserId,
};
use stubs::{hub_over, init_tracing, submit_and_settle, temp_path};

/// A provider with one registered account, signed in.
fn signed_in_provider() -> MemoryIdentity {
    init_tracing();
    let mut provider = MemoryIdentity::new();
    provider
        .sign_up("ada", "ada@example.com", "hunter42")
        .expect("sign up accepted");
    provider
        .sign_in("ada@example.com", "hunter42")
        .expect("sign in accepted");
    provider
}

#[test]
fn reconcile_mirrors_the_live_sign_in() {
    let provider = signed_in_provider();
    let mut cache = SessionCache::in_memory();

    cache.reconcile(&provider);

    let session = cache.current().expect("session cached");
    assert_eq!(session.username, "ada");
    assert_eq!(session.email, "ada@example.com");
    assert_eq!(
        Some(session.user_id.clone()),
        provider.current_user().map(|user| user.user_id)
    );
}

#[test]
fn the_cache_is_never_authoritative() {
    let mut provider = signed_in_provider();
    let mut cache = SessionCache::in_memory();
    cache.reconcile(&provider);
    assert!(cache.is_logged_in());

    // The provider handle is shared, so signing out here signs the hub's
    // copy out too. The stale cache must not let a submission through.
    let mut hub = hub_over(MemoryStore::new(), provider.clone());
    provider.sign_out();

    assert!(cache.is_logged_in(), "cache is stale by design");
    assert_eq!(
        hub.submit_score(GameId::Guess, Score::new(5)).unwrap_err(),
        HubError::NotAuthenticated
    );

    cache.reconcile(&provider);
    assert!(!cache.is_logged_in());
}

#[test]
fn provider_assigned_ids_key_the_store() {
    let provider = signed_in_provider();
    let user_id = provider
        .current_user()
        .map(|user| user.user_id)
        .expect("signed in");

    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), provider);
    submit_and_settle(&mut hub, GameId::Memory, 6);

    let history = store.score_history(&user_id, GameId::Memory);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].display_name, "ada");
}

#[test]
fn a_cached_session_survives_a_restart_until_reconciled() {
    let path = temp_path("restart");

    // First launch: sign in and cache to the file.
    {
        let provider = signed_in_provider();
        let mut cache = SessionCache::with_file(&path);
        cache.reconcile(&provider);
        assert!(cache.is_logged_in());
    }

    // Second launch: the file lets the UI skip the login screen.
    let mut cache = SessionCache::with_file(&path);
    assert!(cache.is_logged_in());
    assert_eq!(cache.current().map(|s| s.username.as_str()), Some("ada"));

    // But the provider signed the user out while we were away, and
    // reconciling drops both the memory and the file copy.
    let provider = MemoryIdentity::new();
    cache.reconcile(&provider);
    assert!(!cache.is_logged_in());

    let reopened = SessionCache::with_file(&path);
    assert!(!reopened.is_logged_in());
    let _ = fs::remove_file(&path);
}

#[test]
fn sign_up_alone_does_not_create_a_session() {
    init_tracing();
    let mut provider = MemoryIdentity::new();
    let user_id = provider
        .sign_up("grace", "grace@example.com", "hunter42")
        .expect("sign up accepted");
    assert_eq!(user_id, UserId::new("user-0001"));

    // Registration leaves the account signed out until a real sign-in.
    assert!(provider.current_user().is_none());
    let mut cache = SessionCache::in_memory();
    cache.reconcile(&provider);
    assert!(!cache.is_logged_in());
}
