use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::GameSessionEntity,
    dto::game::{GameSnapshot, JokerRequest, ParticipantInput, StartGameRequest},
    error::{EngineError, EngineResult},
    services::{answer_service, broadcast},
    state::{
        GameContext, SharedEngine,
        game::{GameSession, Participant, Question},
        state_machine::SessionEvent,
    },
};

/// Bootstrap a new game for a room.
///
/// The participant list is the room's membership snapshot at start time and
/// the question set is capped at the configured per-game maximum. A game id
/// that is already live is rejected.
pub async fn start_game(
    engine: &SharedEngine,
    game_id: &str,
    request: StartGameRequest,
) -> EngineResult<GameSnapshot> {
    let StartGameRequest {
        room_id,
        participants,
        questions,
    } = request;

    if participants.is_empty() {
        return Err(EngineError::Configuration(
            "a game requires at least one participant".into(),
        ));
    }
    if questions.is_empty() {
        return Err(EngineError::Configuration(
            "a game requires a non-empty question set".into(),
        ));
    }

    let mut questions = questions
        .into_iter()
        .map(Question::try_from)
        .collect::<EngineResult<Vec<_>>>()?;
    questions.truncate(engine.config().questions_per_game);

    let participants: Vec<Participant> = participants.into_iter().map(Into::into).collect();

    let mut session = GameSession::new(
        game_id.to_string(),
        room_id,
        participants,
        questions,
    );
    session.apply(SessionEvent::Start)?;

    let context = Arc::new(GameContext::new(session));
    if !engine.insert_context(game_id.to_string(), context.clone()) {
        return Err(EngineError::InvalidState(format!(
            "game `{game_id}` is already running"
        )));
    }

    let guard = context.session().lock().await;
    let snapshot = commit_and_broadcast(engine, &guard).await?;
    info!(
        game_id,
        participants = snapshot.participants.len(),
        questions = snapshot.question_count,
        "game started"
    );
    Ok(snapshot)
}

/// Enroll a participant into a running game.
///
/// Joining a game one is already enrolled in is a benign no-op returning the
/// current snapshot, as is joining a game that just finished but has not been
/// retired yet.
pub async fn join_game(
    engine: &SharedEngine,
    game_id: &str,
    participant: ParticipantInput,
) -> EngineResult<GameSnapshot> {
    let context = engine
        .context(game_id)
        .ok_or_else(|| EngineError::NotFound(format!("game `{game_id}` not found")))?;

    let mut session = context.session().lock().await;
    if session.is_finished() {
        return Ok(GameSnapshot::from(&*session));
    }

    let participant: Participant = participant.into();
    let participant_id = participant.id;
    if !session.enroll(participant) {
        debug!(game_id, %participant_id, "participant already enrolled");
        return Ok(GameSnapshot::from(&*session));
    }

    let snapshot = commit_and_broadcast(engine, &session).await?;
    info!(game_id, %participant_id, "participant joined");
    Ok(snapshot)
}

/// Remove a participant from a running game.
///
/// Removing the last participant terminates the game and releases every
/// resource held for it: lock context, pending advance timer, and the stored
/// session. `None` is returned in that case. If the withdrawal leaves every
/// remaining participant already answered, the advance timer is armed so the
/// round does not wait on the departed player.
pub async fn leave_game(
    engine: &SharedEngine,
    game_id: &str,
    participant_id: Uuid,
) -> EngineResult<Option<GameSnapshot>> {
    let context = engine
        .context(game_id)
        .ok_or_else(|| EngineError::NotFound(format!("game `{game_id}` not found")))?;

    let mut session = context.session().lock().await;
    if session.is_finished() {
        return Ok(Some(GameSnapshot::from(&*session)));
    }
    if !session.withdraw(&participant_id) {
        return Err(EngineError::NotFound(format!(
            "participant `{participant_id}` not found in game `{game_id}`"
        )));
    }

    if session.participants.is_empty() {
        let _ = session.apply(SessionEvent::Terminate);
        engine.store().delete(game_id).await?;
        drop(session);
        engine.remove_context(game_id);
        info!(game_id, "last participant left; game terminated");
        return Ok(None);
    }

    let snapshot = commit_and_broadcast(engine, &session).await?;

    if session.all_answered() {
        // The leaver was the last holdout of the round; arm the advance so
        // the remaining players are not stuck waiting for an answer that
        // will never come.
        debug!(game_id, "withdrawal completed the round; scheduling advance");
        answer_service::schedule_advance(
            engine,
            &context,
            &mut session,
            engine.config().grace_period,
        );
    }

    info!(game_id, %participant_id, "participant left");
    Ok(Some(snapshot))
}

/// Current snapshot of a game.
///
/// Live games answer from their session under the lock; finished games whose
/// context has been retired are served from the store.
pub async fn get_snapshot(engine: &SharedEngine, game_id: &str) -> EngineResult<GameSnapshot> {
    if let Some(context) = engine.context(game_id) {
        let session = context.session().lock().await;
        return Ok(GameSnapshot::from(&*session));
    }

    match engine.store().find(game_id).await? {
        Some(entity) => Ok(GameSnapshot::from(&GameSession::from(entity))),
        None => Err(EngineError::NotFound(format!("game `{game_id}` not found"))),
    }
}

/// Relay a joker played by a participant to the game's joker topic.
///
/// Jokers carry no scoring effect; the engine only fans them out.
pub async fn use_joker(
    engine: &SharedEngine,
    game_id: &str,
    request: JokerRequest,
) -> EngineResult<()> {
    if engine.context(game_id).is_none() {
        return Err(EngineError::NotFound(format!("game `{game_id}` not found")));
    }

    debug!(game_id, username = %request.username, joker = ?request.joker_type, "joker played");
    broadcast::broadcast_joker(engine, game_id, request.into());
    Ok(())
}

/// Commit the session to the store and publish its snapshot.
///
/// Called while the game's lock is held, so snapshots leave in commit order.
pub(crate) async fn commit_and_broadcast(
    engine: &SharedEngine,
    session: &GameSession,
) -> EngineResult<GameSnapshot> {
    engine
        .store()
        .save(GameSessionEntity::from(session))
        .await?;
    let snapshot = GameSnapshot::from(session);
    broadcast::broadcast_game_snapshot(engine, snapshot.clone());
    Ok(snapshot)
}
