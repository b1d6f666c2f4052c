mod stubs;

use arcade_hub::{
    GameId, HubBuilder, HubConfig, HubError, HubEvent, MemoryIdentity, MemoryStore, RequestBody,
    ResponseBody, Score, StoreRequest, StoreResponse, StoreTransport, UserId,
};
use stubs::{hub_over, identity_for, player, settle, submit_and_settle};

#[test]
fn a_rising_pair_of_scores_raises_the_best() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), player("uid-1", "ada"));

    submit_and_settle(&mut hub, GameId::Guess, 5);
    submit_and_settle(&mut hub, GameId::Guess, 9);

    let record = store
        .best_record(GameId::Guess, &UserId::new("uid-1"))
        .expect("a best record was written");
    assert_eq!(record.high_score, Some(Score::new(9)));
    assert_eq!(record.display_name.as_deref(), Some("ada"));
}

#[test]
fn a_lower_late_score_appends_but_keeps_the_best() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), player("uid-1", "ada"));

    submit_and_settle(&mut hub, GameId::Guess, 9);
    let events = submit_and_settle(&mut hub, GameId::Guess, 5);

    // The lower submission still completes; it just did not become the best.
    assert_eq!(
        events,
        vec![HubEvent::ScoreSubmitted {
            game: GameId::Guess,
            score: Score::new(5),
            new_best: false,
        }]
    );

    let history = store.score_history(&UserId::new("uid-1"), GameId::Guess);
    let points: Vec<u32> = history.iter().map(|entry| entry.score.points()).collect();
    assert_eq!(points, vec![9, 5]);

    let record = store
        .best_record(GameId::Guess, &UserId::new("uid-1"))
        .expect("a best record was written");
    assert_eq!(record.high_score, Some(Score::new(9)));
}

#[test]
fn seven_five_twelve_keeps_full_history_and_the_right_best() {
    let store = MemoryStore::new();
    let mut hub = hub_over(store.clone(), player("uid-1", "ada"));
    let user = UserId::new("uid-1");

    submit_and_settle(&mut hub, GameId::Memory, 7);
    submit_and_settle(&mut hub, GameId::Memory, 5);

    // Mid-flight the board still shows the seven.
    let mid = store
        .best_record(GameId::Memory, &user)
        .expect("a best record was written");
    assert_eq!(mid.high_score, Some(Score::new(7)));

    submit_and_settle(&mut hub, GameId::Memory, 12);

    let history = store.score_history(&user, GameId::Memory);
    let points: Vec<u32> = history.iter().map(|entry| entry.score.points()).collect();
    assert_eq!(points, vec![7, 5, 12]);

    let best = store
        .best_record(GameId::Memory, &user)
        .expect("a best record was written");
    assert_eq!(best.high_score, Some(Score::new(12)));
}

#[test]
fn unauthenticated_submissions_send_nothing() {
    let store = MemoryStore::new();
    let mut hub = HubBuilder::new()
        .with_config(HubConfig::testing())
        .with_identity(MemoryIdentity::new())
        .connect(store.clone())
        .unwrap();

    let error = hub.submit_score(GameId::Rps, Score::new(3)).unwrap_err();
    assert_eq!(error, HubError::NotAuthenticated);

    // Nothing went out, so nothing can ever come back.
    assert_eq!(hub.pending_requests(), 0);
    assert!(settle(&mut hub).is_empty());
    assert_eq!(format!("{store:?}"), format!("{:?}", MemoryStore::new()));
}

#[test]
fn scores_keep_every_submitters_entry_separate() {
    let store = MemoryStore::new();
    let mut ada = hub_over(store.clone(), player("uid-a", "ada"));
    let mut grace = hub_over(store.clone(), player("uid-g", "grace"));

    submit_and_settle(&mut ada, GameId::Rps, 4);
    submit_and_settle(&mut grace, GameId::Rps, 6);
    submit_and_settle(&mut ada, GameId::Rps, 2);

    let ada_history = store.score_history(&UserId::new("uid-a"), GameId::Rps);
    assert_eq!(ada_history.len(), 2);
    let grace_history = store.score_history(&UserId::new("uid-g"), GameId::Rps);
    assert_eq!(grace_history.len(), 1);
    assert_eq!(grace_history[0].display_name, "grace");
}

#[test]
fn two_clients_of_one_user_never_lower_the_best() {
    let store = MemoryStore::new();
    // The same account signed in on two devices, sharing one store.
    let mut phone = hub_over(store.clone(), player("uid-1", "ada"));
    let mut laptop = hub_over(store.clone(), player("uid-1", "ada"));

    // Interleave while both are in flight.
    phone.submit_score(GameId::TicTacToe, Score::new(10)).unwrap();
    laptop.submit_score(GameId::TicTacToe, Score::new(8)).unwrap();
    settle(&mut phone);
    settle(&mut laptop);

    let user = UserId::new("uid-1");
    let record = store
        .best_record(GameId::TicTacToe, &user)
        .expect("a best record was written");
    assert_eq!(record.high_score, Some(Score::new(10)));

    laptop.submit_score(GameId::TicTacToe, Score::new(20)).unwrap();
    phone.submit_score(GameId::TicTacToe, Score::new(15)).unwrap();
    settle(&mut laptop);
    settle(&mut phone);

    let record = store
        .best_record(GameId::TicTacToe, &user)
        .expect("a best record was written");
    assert_eq!(record.high_score, Some(Score::new(20)));
    assert_eq!(store.score_history(&user, GameId::TicTacToe).len(), 4);
}

#[test]
fn the_display_name_falls_back_through_the_chain() {
    let cases = [
        (Some("Ada"), Some("ada@example.com"), "Ada"),
        (None, Some("grace.hopper@example.com"), "grace.hopper"),
        (None, None, "Anonymous"),
    ];
    for (name, email, expected) in cases {
        let store = MemoryStore::new();
        let mut hub = hub_over(store.clone(), identity_for("uid-x", name, email));
        submit_and_settle(&mut hub, GameId::TicTacToe, 2);

        let user = UserId::new("uid-x");
        let record = store
            .best_record(GameId::TicTacToe, &user)
            .expect("a best record was written");
        assert_eq!(record.display_name.as_deref(), Some(expected));
        let history = store.score_history(&user, GameId::TicTacToe);
        assert_eq!(history[0].display_name, expected);
    }
}

/// A transport that lets history appends through but rejects every
/// leaderboard write, for exercising the no-rollback rule.
#[derive(Debug)]
struct BestRejectingStore {
    inner: MemoryStore,
    rejections: Vec<StoreResponse>,
}

impl BestRejectingStore {
    fn over(inner: MemoryStore) -> Self {
        Self {
            inner,
            rejections: Vec::new(),
        }
    }
}

impl StoreTransport for BestRejectingStore {
    fn send(&mut self, request: &StoreRequest) {
        if matches!(request.body, RequestBody::RecordBest { .. }) {
            self.rejections.push(StoreResponse {
                id: request.id,
                body: ResponseBody::Failed {
                    message: "leaderboard index offline".to_owned(),
                },
            });
        } else {
            self.inner.send(request);
        }
    }

    fn receive_all_responses(&mut self) -> Vec<StoreResponse> {
        let mut responses = self.inner.receive_all_responses();
        responses.append(&mut self.rejections);
        responses
    }
}

#[test]
fn history_appends_survive_a_failed_leaderboard_write() {
    let tables = MemoryStore::new();
    let mut hub = hub_over(BestRejectingStore::over(tables.clone()), player("uid-1", "ada"));

    let events = submit_and_settle(&mut hub, GameId::Guess, 6);
    match events.as_slice() {
        [HubEvent::SubmitFailed {
            game,
            score,
            error: HubError::StoreUnavailable { context },
        }] => {
            assert_eq!(*game, GameId::Guess);
            assert_eq!(*score, Score::new(6));
            assert_eq!(context, "leaderboard index offline");
        },
        other => panic!("expected one SubmitFailed, got {other:?}"),
    }

    // The append landed before the leaderboard write failed and it stays.
    let user = UserId::new("uid-1");
    let history = tables.score_history(&user, GameId::Guess);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, Score::new(6));
    assert!(tables.best_record(GameId::Guess, &user).is_none());
}
