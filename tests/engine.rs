//! End-to-end scenarios for the quiz session engine: answer races, decaying
//! scores, advance timers, and resource teardown.

use std::{io, sync::Arc, time::Duration};

use anyhow::Result;
use futures::future::{BoxFuture, ready};
use uuid::Uuid;

use trivia_treck_engine::{
    config::EngineConfig,
    dao::{
        models::GameSessionEntity,
        session_store::{SessionStore, memory::MemorySessionStore},
        storage::{StorageError, StorageResult},
    },
    dto::{
        events::EventPayload,
        game::{
            AnswerSubmission, JokerRequest, JokerType, ParticipantInput, QuestionInput,
            StartGameRequest,
        },
    },
    error::EngineError,
    services::{answer_service, broadcast::SnapshotHub, session_service},
    state::{EngineState, SharedEngine},
};

fn test_engine(
    config: EngineConfig,
) -> (SharedEngine, Arc<MemorySessionStore>, Arc<SnapshotHub>) {
    let store = Arc::new(MemorySessionStore::new());
    let hub = Arc::new(SnapshotHub::new(config.snapshot_capacity));
    let engine = EngineState::new(config, store.clone(), hub.clone());
    (engine, store, hub)
}

fn participant(username: &str) -> ParticipantInput {
    ParticipantInput {
        id: Uuid::new_v4(),
        username: username.into(),
    }
}

fn question(difficulty: &str, correct: &str) -> QuestionInput {
    QuestionInput {
        prompt: format!("which is it ({correct})?"),
        category: None,
        difficulty: difficulty.into(),
        correct_answer: correct.into(),
        incorrect_answers: vec!["wrong-a".into(), "wrong-b".into()],
    }
}

fn start_request(participants: &[ParticipantInput], questions: Vec<QuestionInput>) -> StartGameRequest {
    StartGameRequest {
        room_id: "room-1".into(),
        participants: participants.to_vec(),
        questions,
    }
}

fn answer(participant: &ParticipantInput, value: &str) -> AnswerSubmission {
    AnswerSubmission {
        participant_id: participant.id,
        answer: value.into(),
    }
}

fn score_of(snapshot: &trivia_treck_engine::dto::game::GameSnapshot, player: &str) -> Option<i64> {
    snapshot
        .scores
        .iter()
        .find(|entry| entry.player == player)
        .map(|entry| entry.score)
}

#[tokio::test(start_paused = true)]
async fn two_players_race_on_a_single_question() -> Result<()> {
    let (engine, _store, hub) = test_engine(EngineConfig::default());
    let mut events = hub.subscribe();

    let p1 = participant("alice");
    let p2 = participant("bob");
    let opening = session_service::start_game(
        &engine,
        "g1",
        start_request(&[p1.clone(), p2.clone()], vec![question("easy", "Paris")]),
    )
    .await?;
    assert_eq!(opening.current_question_index, 0);
    assert!(!opening.finished);

    let after_p1 = answer_service::submit_answer(&engine, "g1", answer(&p1, "Paris")).await?;
    assert_eq!(score_of(&after_p1, "alice"), Some(1));
    assert!(after_p1.waiting_for_next);

    // base 1 decays by floor(1/20) == 0, so bob also earns the full point.
    let after_p2 = answer_service::submit_answer(&engine, "g1", answer(&p2, "Paris")).await?;
    assert_eq!(score_of(&after_p2, "alice"), Some(1));
    assert_eq!(score_of(&after_p2, "bob"), Some(1));

    // Everyone answered: the secondary grace delay advances the only
    // question, finishing the game.
    tokio::time::sleep(Duration::from_secs(11)).await;

    let final_snapshot = session_service::get_snapshot(&engine, "g1").await?;
    assert!(final_snapshot.finished);
    assert_eq!(final_snapshot.current_question_index, 1);
    assert_eq!(engine.live_games(), 0);

    // Snapshots arrived in commit order: start, two answers, the advance.
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EventPayload::Game(snapshot) = event.payload {
            seen.push((snapshot.current_question_index, snapshot.finished));
        }
    }
    assert_eq!(seen, vec![(0, false), (0, false), (0, false), (1, true)]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicate_correct_submission_scores_once() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let p2 = participant("bob");
    session_service::start_game(
        &engine,
        "g1",
        start_request(&[p1.clone(), p2.clone()], vec![question("medium", "42")]),
    )
    .await?;

    answer_service::submit_answer(&engine, "g1", answer(&p1, "42")).await?;
    let repeated = answer_service::submit_answer(&engine, "g1", answer(&p1, "42")).await?;

    assert_eq!(score_of(&repeated, "alice"), Some(2));
    assert_eq!(score_of(&repeated, "bob"), None);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn decay_applies_by_arrival_position() -> Result<()> {
    // easy base 1 scaled by 40 gives a decrement of 2 per position.
    let config = EngineConfig {
        score_multiplier: 40,
        ..EngineConfig::default()
    };
    let (engine, _store, _hub) = test_engine(config);

    let players: Vec<_> = ["alice", "bob", "carol"].map(participant).into();
    session_service::start_game(
        &engine,
        "g1",
        start_request(&players, vec![question("easy", "Paris")]),
    )
    .await?;

    for player in &players {
        answer_service::submit_answer(&engine, "g1", answer(player, "Paris")).await?;
    }

    let snapshot = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(score_of(&snapshot, "alice"), Some(40));
    assert_eq!(score_of(&snapshot, "bob"), Some(38));
    assert_eq!(score_of(&snapshot, "carol"), Some(36));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn correct_answer_after_advance_scores_nothing() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let p2 = participant("bob");
    session_service::start_game(
        &engine,
        "g1",
        start_request(
            &[p1.clone(), p2.clone()],
            vec![question("easy", "Paris"), question("easy", "Rome")],
        ),
    )
    .await?;

    answer_service::submit_answer(&engine, "g1", answer(&p1, "Paris")).await?;

    // Only alice answered; the window timer expires and the game moves on.
    tokio::time::sleep(Duration::from_secs(11)).await;
    let advanced = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(advanced.current_question_index, 1);
    assert!(!advanced.finished);

    // Bob's answer was right for the previous question but the window is
    // long gone; it is accepted without reward.
    let late = answer_service::submit_answer(&engine, "g1", answer(&p2, "Paris")).await?;
    assert_eq!(score_of(&late, "bob"), None);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timer_advances_when_not_everyone_answers() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let p2 = participant("bob");
    session_service::start_game(
        &engine,
        "g1",
        start_request(&[p1.clone(), p2], vec![question("hard", "X"), question("hard", "Y")]),
    )
    .await?;

    let first = answer_service::submit_answer(&engine, "g1", answer(&p1, "X")).await?;
    assert_eq!(score_of(&first, "alice"), Some(3));
    assert!(first.waiting_for_next);

    tokio::time::sleep(Duration::from_secs(11)).await;

    let advanced = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(advanced.current_question_index, 1);
    assert!(!advanced.waiting_for_next);
    assert!(!advanced.finished);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn index_is_monotone_and_finishes_exactly_at_the_end() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let questions = vec![
        question("easy", "a"),
        question("easy", "b"),
        question("easy", "c"),
    ];
    session_service::start_game(&engine, "g1", start_request(&[p1.clone()], questions)).await?;

    let mut last_index = 0;
    for expected_answer in ["a", "b", "c"] {
        let snapshot = session_service::get_snapshot(&engine, "g1").await?;
        assert!(snapshot.current_question_index >= last_index);
        last_index = snapshot.current_question_index;

        answer_service::submit_answer(&engine, "g1", answer(&p1, expected_answer)).await?;
        tokio::time::sleep(Duration::from_secs(11)).await;
    }

    let final_snapshot = session_service::get_snapshot(&engine, "g1").await?;
    assert!(final_snapshot.finished);
    assert_eq!(final_snapshot.current_question_index, 3);
    assert_eq!(score_of(&final_snapshot, "alice"), Some(3));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn last_leaver_tears_down_every_resource() -> Result<()> {
    let (engine, store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let p2 = participant("bob");
    session_service::start_game(
        &engine,
        "g1",
        start_request(&[p1.clone(), p2.clone()], vec![question("easy", "Paris")]),
    )
    .await?;

    // Arm the advance timer, then drain the game.
    answer_service::submit_answer(&engine, "g1", answer(&p1, "Paris")).await?;

    let remaining = session_service::leave_game(&engine, "g1", p1.id).await?;
    assert!(remaining.is_some());

    let empty = session_service::leave_game(&engine, "g1", p2.id).await?;
    assert!(empty.is_none());
    assert_eq!(engine.live_games(), 0);
    assert!(store.is_empty());

    // The armed timer was aborted with the context; nothing fires later.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(store.is_empty());
    let err = session_service::get_snapshot(&engine, "g1").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn finished_game_answers_status_after_context_retirement() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    session_service::start_game(&engine, "g1", start_request(&[p1.clone()], vec![question("easy", "a")]))
        .await?;

    answer_service::submit_answer(&engine, "g1", answer(&p1, "a")).await?;
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(engine.live_games(), 0);

    // Status survives through the store.
    let snapshot = session_service::get_snapshot(&engine, "g1").await?;
    assert!(snapshot.finished);

    // And a late answer is benign: same snapshot, no error, no score change.
    let late = answer_service::submit_answer(&engine, "g1", answer(&p1, "a")).await?;
    assert!(late.finished);
    assert_eq!(score_of(&late, "alice"), Some(1));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn joiner_counts_toward_all_answered() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let p2 = participant("bob");
    session_service::start_game(
        &engine,
        "g1",
        start_request(&[p1.clone()], vec![question("easy", "a"), question("easy", "b")]),
    )
    .await?;

    session_service::join_game(&engine, "g1", p2.clone()).await?;

    // Alice alone no longer completes the round.
    answer_service::submit_answer(&engine, "g1", answer(&p1, "a")).await?;
    let partial = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(partial.participants.len(), 2);
    assert_eq!(partial.current_question_index, 0);

    answer_service::submit_answer(&engine, "g1", answer(&p2, "a")).await?;
    tokio::time::sleep(Duration::from_secs(11)).await;
    let advanced = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(advanced.current_question_index, 1);

    Ok(())
}

#[tokio::test]
async fn unknown_game_and_participant_are_rejected_cleanly() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let ghost = participant("ghost");
    let err = answer_service::submit_answer(&engine, "nope", answer(&ghost, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let p1 = participant("alice");
    session_service::start_game(&engine, "g1", start_request(&[p1.clone()], vec![question("easy", "a")]))
        .await?;

    let err = answer_service::submit_answer(&engine, "g1", answer(&ghost, "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // The rejected stranger changed nothing.
    let snapshot = session_service::get_snapshot(&engine, "g1").await?;
    assert!(snapshot.scores.is_empty());

    Ok(())
}

#[tokio::test]
async fn start_validation_and_double_start() -> Result<()> {
    let (engine, _hub) = EngineState::in_memory(EngineConfig::default());
    let p1 = participant("alice");

    let err = session_service::start_game(&engine, "g1", start_request(&[p1.clone()], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));

    let err = session_service::start_game(
        &engine,
        "g1",
        start_request(&[], vec![question("easy", "a")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));

    session_service::start_game(&engine, "g1", start_request(&[p1.clone()], vec![question("easy", "a")]))
        .await?;
    let err = session_service::start_game(
        &engine,
        "g1",
        start_request(&[p1.clone()], vec![question("easy", "a")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn joker_fans_out_on_the_joker_topic() -> Result<()> {
    let (engine, hub) = EngineState::in_memory(EngineConfig::default());

    let p1 = participant("alice");
    session_service::start_game(&engine, "g1", start_request(&[p1.clone()], vec![question("easy", "a")]))
        .await?;

    // Subscribe after the start commit so the joker is the next event.
    let mut events = hub.subscribe();
    let request = JokerRequest {
        participant_id: p1.id,
        username: p1.username.clone(),
        joker_type: JokerType::PriorityAnswer,
    };
    session_service::use_joker(&engine, "g1", request.clone()).await?;

    let event = events.recv().await?;
    assert_eq!(event.topic, "game/joker/g1");
    match event.payload {
        EventPayload::Joker(joker) => {
            assert_eq!(joker.username, "alice");
            assert_eq!(joker.participant_id, p1.id);
            assert_eq!(joker.joker_type, JokerType::PriorityAnswer);
        }
        other => panic!("expected a joker event, got {other:?}"),
    }

    // Jokers are only relayed for live games.
    let err = session_service::use_joker(&engine, "nope", request).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn withdrawal_of_the_last_holdout_advances_the_round() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let p1 = participant("alice");
    let p2 = participant("bob");
    session_service::start_game(
        &engine,
        "g1",
        start_request(
            &[p1.clone(), p2.clone()],
            vec![question("easy", "Paris"), question("easy", "Rome")],
        ),
    )
    .await?;

    // Alice misses; no timer is armed because bob has not answered yet.
    answer_service::submit_answer(&engine, "g1", answer(&p1, "wrong-a")).await?;
    tokio::time::sleep(Duration::from_secs(11)).await;
    let stalled = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(stalled.current_question_index, 0);

    // Bob leaves, making alice the whole round; the advance must fire.
    session_service::leave_game(&engine, "g1", p2.id).await?;
    tokio::time::sleep(Duration::from_secs(11)).await;

    let advanced = session_service::get_snapshot(&engine, "g1").await?;
    assert_eq!(advanced.current_question_index, 1);
    assert!(!advanced.finished);

    Ok(())
}

/// Store double standing in for a durable backend that is down.
struct UnavailableStore;

impl UnavailableStore {
    fn offline() -> StorageError {
        StorageError::unavailable(
            "session store offline".into(),
            io::Error::other("connection refused"),
        )
    }
}

impl SessionStore for UnavailableStore {
    fn save(&self, _session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Err(Self::offline())))
    }

    fn find(&self, _game_id: &str) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        Box::pin(ready(Err(Self::offline())))
    }

    fn delete(&self, _game_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Err(Self::offline())))
    }
}

#[tokio::test]
async fn storage_failures_surface_as_storage_errors() -> Result<()> {
    let hub = Arc::new(SnapshotHub::new(4));
    let engine = EngineState::new(EngineConfig::default(), Arc::new(UnavailableStore), hub);

    let p1 = participant("alice");
    let err = session_service::start_game(&engine, "g1", start_request(&[p1], vec![question("easy", "a")]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_apply_exactly_once() -> Result<()> {
    let (engine, _store, _hub) = test_engine(EngineConfig::default());

    let players: Vec<_> = (0..8).map(|i| participant(&format!("player-{i}"))).collect();
    session_service::start_game(
        &engine,
        "race",
        start_request(&players, vec![question("easy", "Paris")]),
    )
    .await?;

    // Every player fires the same correct answer twice, all in parallel.
    let mut handles = Vec::new();
    for player in &players {
        for _ in 0..2 {
            let engine = engine.clone();
            let submission = answer(player, "Paris");
            handles.push(tokio::spawn(async move {
                answer_service::submit_answer(&engine, "race", submission).await
            }));
        }
    }
    for handle in handles {
        handle.await?.expect("submission must succeed");
    }

    // base 1 means no decay: exactly one point per player, none lost, none
    // doubled, regardless of interleaving.
    let snapshot = session_service::get_snapshot(&engine, "race").await?;
    assert_eq!(snapshot.scores.len(), 8);
    for player in &players {
        assert_eq!(score_of(&snapshot, &player.username), Some(1));
    }
    assert!(snapshot.waiting_for_next);

    Ok(())
}
