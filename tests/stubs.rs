use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use arcade_hub::{
    GameId, HubBuilder, HubConfig, HubEvent, LeaderboardRecord, MemoryIdentity, Score, ScoreHub,
    StoreTransport, UserId, UserIdentity,
};

/// How many polls a settle helper tries before giving up; far beyond what
/// any fixture store needs to answer.
const MAX_POLLS: usize = 32;

/// Routes the hub's telemetry into the per-test output capture.
///
/// The first caller in a test binary installs the subscriber; later calls
/// lose the set-default race and are no-ops.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish(),
    );
}

/// A provider already signed in with the given profile fields.
#[allow(dead_code)]
#[must_use]
pub fn identity_for(id: &str, name: Option<&str>, email: Option<&str>) -> MemoryIdentity {
    MemoryIdentity::signed_in_as(UserIdentity {
        user_id: UserId::new(id),
        display_name: name.map(str::to_owned),
        email: email.map(str::to_owned),
    })
}

/// A fully profiled signed-in player with a derived example email.
#[allow(dead_code)]
#[must_use]
pub fn player(id: &str, name: &str) -> MemoryIdentity {
    let email = format!("{name}@example.com");
    identity_for(id, Some(name), Some(&email))
}

/// Wires a hub over the given transport with the short testing deadlines.
#[allow(dead_code)]
#[must_use]
pub fn hub_over(store: impl StoreTransport + 'static, identity: MemoryIdentity) -> ScoreHub {
    init_tracing();
    HubBuilder::new()
        .with_config(HubConfig::testing())
        .with_identity(identity)
        .connect(store)
        .expect("test hub wiring is valid")
}

/// Polls until every in-flight request settles and returns the drained
/// events in arrival order.
///
/// Polls without sleeping, so a silent store that needs its deadline to
/// expire will exhaust the poll budget instead; timeout tests drive the
/// loop themselves.
#[allow(dead_code)]
pub fn settle(hub: &mut ScoreHub) -> Vec<HubEvent> {
    let mut events = Vec::new();
    for _ in 0..MAX_POLLS {
        hub.poll_store();
        events.extend(hub.events());
        if hub.pending_requests() == 0 {
            return events;
        }
    }
    panic!("requests still pending after {MAX_POLLS} polls");
}

/// Submits a score and settles, returning the drained events.
#[allow(dead_code)]
pub fn submit_and_settle(hub: &mut ScoreHub, game: GameId, points: u32) -> Vec<HubEvent> {
    hub.submit_score(game, Score::new(points))
        .expect("submission accepted");
    settle(hub)
}

/// Fetches a snapshot and settles, returning the delivered records.
///
/// Panics unless the fetch is the only thing in flight and it succeeds.
#[allow(dead_code)]
pub fn fetch_and_settle(hub: &mut ScoreHub, game: GameId, limit: usize) -> Vec<LeaderboardRecord> {
    hub.fetch_leaderboard(game, limit).expect("fetch accepted");
    let events = settle(hub);
    match events.as_slice() {
        [HubEvent::LeaderboardReady { records, .. }] => records.clone(),
        other => panic!("expected exactly one LeaderboardReady, got {other:?}"),
    }
}

/// A unique temp file path for file-backed session tests.
#[allow(dead_code)]
#[must_use]
pub fn temp_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "arcade-hub-test-{}-{tag}-{unique}.json",
        std::process::id()
    ))
}
