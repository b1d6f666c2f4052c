mod stubs;

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arcade_hub::leaderboard::rank_of;
use arcade_hub::store::chaos::INJECTED_FAILURE;
use arcade_hub::{
    ChaosConfig, ChaosStore, GameId, HubError, HubEvent, MemoryStore, RawRecord, Score, ScoreHub,
    UserId,
};
use parking_lot::Mutex;
use stubs::{fetch_and_settle, hub_over, player, settle};
use tracing_subscriber::fmt::MakeWriter;

/// Seeds one best record per `(id, name, points)` triple through the public
/// admin write.
fn seed_board(hub: &mut ScoreHub, game: GameId, rows: &[(&str, &str, u32)]) {
    for (id, name, points) in rows {
        hub.update_leaderboard(game, UserId::new(*id), *name, Score::new(*points))
            .expect("seed accepted");
        settle(hub);
    }
}

#[test]
fn a_generous_limit_returns_everyone_descending() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store, player("uid-admin", "admin"));
    seed_board(
        &mut hub,
        GameId::Guess,
        &[
            ("u1", "Ada", 12),
            ("u2", "Grace", 31),
            ("u3", "Edsger", 7),
            ("u4", "Barbara", 24),
            ("u5", "Donald", 18),
        ],
    );

    let records = fetch_and_settle(&mut hub, GameId::Guess, 50);

    assert_eq!(records.len(), 5);
    let points: Vec<u32> = records.iter().map(|r| r.high_score.points()).collect();
    assert_eq!(points, vec![31, 24, 18, 12, 7]);
    for pair in records.windows(2) {
        assert!(pair[0].high_score > pair[1].high_score, "not strictly descending");
    }
}

#[test]
fn a_small_limit_returns_exactly_the_top_slice() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store, player("uid-admin", "admin"));
    seed_board(
        &mut hub,
        GameId::Memory,
        &[
            ("u1", "Ada", 12),
            ("u2", "Grace", 31),
            ("u3", "Edsger", 7),
            ("u4", "Barbara", 24),
            ("u5", "Donald", 18),
        ],
    );

    let records = fetch_and_settle(&mut hub, GameId::Memory, 3);

    let names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["Grace", "Barbara", "Donald"]);
}

#[test]
fn a_cut_of_two_from_three_players_keeps_the_top_pair_in_order() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store, player("uid-admin", "admin"));
    seed_board(
        &mut hub,
        GameId::Rps,
        &[("a", "A", 10), ("b", "B", 30), ("c", "C", 20)],
    );

    let records = fetch_and_settle(&mut hub, GameId::Rps, 2);

    let board: Vec<(&str, u32)> = records
        .iter()
        .map(|r| (r.display_name.as_str(), r.high_score.points()))
        .collect();
    assert_eq!(board, vec![("B", 30), ("C", 20)]);
}

#[test]
fn boards_are_kept_per_game() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store, player("uid-admin", "admin"));
    seed_board(&mut hub, GameId::Guess, &[("u1", "Ada", 40)]);
    seed_board(&mut hub, GameId::Memory, &[("u2", "Grace", 9)]);

    let guess = fetch_and_settle(&mut hub, GameId::Guess, 10);
    assert_eq!(guess.len(), 1);
    assert_eq!(guess[0].display_name, "Ada");

    let memory = fetch_and_settle(&mut hub, GameId::Memory, 10);
    assert_eq!(memory.len(), 1);
    assert_eq!(memory[0].display_name, "Grace");

    assert!(fetch_and_settle(&mut hub, GameId::TicTacToe, 10).is_empty());
}

#[test]
fn partial_records_are_dropped_without_failing_the_fetch() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), player("uid-admin", "admin"));
    seed_board(&mut hub, GameId::Guess, &[("u1", "Ada", 12), ("u2", "Grace", 31)]);

    // Hand-edited rows: one lost its name, one its score.
    store.seed_record(
        GameId::Guess,
        "nameless",
        RawRecord {
            user_id: Some(UserId::new("nameless")),
            display_name: None,
            high_score: Some(Score::new(99)),
            updated_at_ms: Some(1),
        },
    );
    store.seed_record(
        GameId::Guess,
        "scoreless",
        RawRecord {
            user_id: Some(UserId::new("scoreless")),
            display_name: Some("Ghost".to_owned()),
            high_score: None,
            updated_at_ms: Some(1),
        },
    );

    let records = fetch_and_settle(&mut hub, GameId::Guess, 50);

    let names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["Grace", "Ada"]);
}

#[test]
fn a_partial_record_can_consume_a_limit_slot() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), player("uid-admin", "admin"));
    seed_board(&mut hub, GameId::Guess, &[("u1", "Ada", 10), ("u2", "Grace", 30)]);
    store.seed_record(
        GameId::Guess,
        "nameless",
        RawRecord {
            user_id: None,
            display_name: None,
            high_score: Some(Score::new(99)),
            updated_at_ms: None,
        },
    );

    // The store's top-2 slice is [Grace, nameless]; validation then drops
    // the nameless row, so the page comes back short rather than padded.
    let records = fetch_and_settle(&mut hub, GameId::Guess, 2);

    let names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["Grace"]);
}

/// Collects formatted log lines from every clone into one shared buffer.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn partial_record_drops_show_up_in_the_telemetry() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(capture.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let store = MemoryStore::new();
        store.seed_record(
            GameId::Guess,
            "nameless",
            RawRecord {
                user_id: Some(UserId::new("nameless")),
                display_name: None,
                high_score: Some(Score::new(99)),
                updated_at_ms: Some(1),
            },
        );
        let mut hub = hub_over(store, player("uid-1", "ada"));
        assert!(fetch_and_settle(&mut hub, GameId::Guess, 10).is_empty());
    });

    let log = capture.contents();
    assert!(
        log.contains("dropped partial leaderboard records"),
        "the drop diagnostic never reached the subscriber: {log}"
    );
}

#[test]
fn rank_follows_the_descending_order() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store, player("uid-admin", "admin"));
    seed_board(
        &mut hub,
        GameId::TicTacToe,
        &[("a", "A", 10), ("b", "B", 30), ("c", "C", 20)],
    );

    let records = fetch_and_settle(&mut hub, GameId::TicTacToe, 10);

    assert_eq!(rank_of(&records, &UserId::new("b")), Some(1));
    assert_eq!(rank_of(&records, &UserId::new("c")), Some(2));
    assert_eq!(rank_of(&records, &UserId::new("a")), Some(3));
    assert_eq!(rank_of(&records, &UserId::new("nobody")), None);
}

#[test]
fn a_silent_store_times_the_fetch_out() {
    let silent = ChaosStore::new(
        MemoryStore::new(),
        ChaosConfig::builder().drop_rate(1.0).seed(7).build(),
    );
    let mut hub = hub_over(silent, player("uid-1", "ada"));

    hub.fetch_leaderboard(GameId::Guess, 5).unwrap();
    assert_eq!(hub.pending_requests(), 1);

    // The testing preset deadline is 50 ms.
    thread::sleep(Duration::from_millis(60));
    hub.poll_store();

    let events: Vec<_> = hub.events().collect();
    match events.as_slice() {
        [HubEvent::LeaderboardFailed {
            game,
            error: HubError::FetchTimedOut { waited_ms },
        }] => {
            assert_eq!(*game, GameId::Guess);
            assert!(*waited_ms >= 50, "waited {waited_ms} ms");
        },
        other => panic!("expected one LeaderboardFailed timeout, got {other:?}"),
    }
    assert_eq!(hub.pending_requests(), 0);
}

#[test]
fn a_failing_store_is_reported_as_a_fetch_failure_not_a_timeout() {
    let broken = ChaosStore::new(MemoryStore::new(), ChaosConfig::unreachable());
    let mut hub = hub_over(broken, player("uid-1", "ada"));

    hub.fetch_leaderboard(GameId::Guess, 5).unwrap();
    let events = settle(&mut hub);

    match events.as_slice() {
        [HubEvent::LeaderboardFailed {
            error: HubError::FetchFailed { context },
            ..
        }] => assert_eq!(context, INJECTED_FAILURE),
        other => panic!("expected one LeaderboardFailed, got {other:?}"),
    }
}

#[test]
fn an_answer_that_arrives_after_the_deadline_is_dropped() {
    // Hold every response for three polls so the answer exists but cannot
    // arrive before the deadline check removes the query.
    let laggy = ChaosStore::new(
        MemoryStore::new(),
        ChaosConfig::builder().response_delay(3).seed(7).build(),
    );
    let mut hub = hub_over(laggy, player("uid-1", "ada"));

    hub.fetch_leaderboard(GameId::Guess, 5).unwrap();
    hub.poll_store();
    thread::sleep(Duration::from_millis(60));
    hub.poll_store();

    let events: Vec<_> = hub.events().collect();
    assert!(
        matches!(
            events.as_slice(),
            [HubEvent::LeaderboardFailed {
                error: HubError::FetchTimedOut { .. },
                ..
            }]
        ),
        "expected the timeout first, got {events:?}"
    );

    // Keep polling until the held answer is finally released; it must be
    // ignored, not turned into a second completion.
    for _ in 0..5 {
        hub.poll_store();
    }
    assert!(hub.events().next().is_none(), "late answer produced an event");
    assert_eq!(hub.pending_requests(), 0);
}

#[test]
fn equal_scores_do_not_overwrite_the_standing_record() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), player("uid-admin", "admin"));

    hub.update_leaderboard(GameId::Guess, UserId::new("u1"), "First", Score::new(20))
        .unwrap();
    settle(&mut hub);
    let first = store
        .best_record(GameId::Guess, &UserId::new("u1"))
        .expect("record written");

    hub.update_leaderboard(GameId::Guess, UserId::new("u1"), "Second", Score::new(20))
        .unwrap();
    let events = settle(&mut hub);

    // The equal update completes but writes nothing at all.
    assert!(
        matches!(
            events.as_slice(),
            [HubEvent::ScoreSubmitted {
                new_best: false,
                ..
            }]
        ),
        "got {events:?}"
    );
    let second = store
        .best_record(GameId::Guess, &UserId::new("u1"))
        .expect("record still there");
    assert_eq!(second, first, "name or timestamp changed on an equal score");
    assert_eq!(second.display_name.as_deref(), Some("First"));
}

#[test]
fn the_default_limit_caps_the_top_fetch() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store, player("uid-admin", "admin"));
    // Twelve players against the testing preset's default limit of ten.
    for index in 0..12u32 {
        let id = format!("u{index}");
        let name = format!("Player{index}");
        hub.update_leaderboard(GameId::Rps, UserId::new(id), name, Score::new(index + 1))
            .unwrap();
        settle(&mut hub);
    }

    hub.fetch_leaderboard_top(GameId::Rps).unwrap();
    let events = settle(&mut hub);
    match events.as_slice() {
        [HubEvent::LeaderboardReady { records, .. }] => {
            assert_eq!(records.len(), 10);
            // The two weakest players fell off the page.
            let points: Vec<u32> = records.iter().map(|r| r.high_score.points()).collect();
            assert_eq!(points, (3..=12).rev().collect::<Vec<u32>>());
        },
        other => panic!("expected one LeaderboardReady, got {other:?}"),
    }
}
