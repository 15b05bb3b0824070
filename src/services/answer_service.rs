//! Answer race resolution and advance-timer scheduling.
//!
//! Every mutation for one game runs under that game's fair lock; the order in
//! which submissions acquire it *is* the arrival order used for scoring, so
//! no client-supplied timestamp can reorder a race.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::{
    dto::game::{AnswerSubmission, GameSnapshot},
    error::{EngineError, EngineResult},
    services::session_service::commit_and_broadcast,
    state::{
        AdvanceTimer, GameContext, SharedEngine, game::GameSession, scoring,
        state_machine::SessionEvent,
    },
};

/// Process one answer submission for the current question of a game.
///
/// Implements the full race protocol: the first correct answer opens the
/// answer window, scores full points and arms the grace-period advance;
/// later correct answers inside the open window score decaying points once
/// per participant; correct answers outside the window and repeats score
/// nothing. Every submission marks its participant as answered, and once all
/// enrolled participants have answered the pending timer is replaced by a
/// short secondary delay so slow clients still receive the final snapshot
/// before the question changes.
///
/// A submission to a finished game is benign and returns the last committed
/// snapshot unchanged.
pub async fn submit_answer(
    engine: &SharedEngine,
    game_id: &str,
    submission: AnswerSubmission,
) -> EngineResult<GameSnapshot> {
    let Some(context) = engine.context(game_id) else {
        // Finished games outlive their lock context in the store; a late
        // answer for one of those is not an error.
        if let Some(entity) = engine.store().find(game_id).await? {
            if entity.finished {
                return Ok(GameSnapshot::from(&GameSession::from(entity)));
            }
        }
        return Err(EngineError::NotFound(format!("game `{game_id}` not found")));
    };

    let mut session = context.session().lock().await;

    if session.is_finished() {
        return Ok(GameSnapshot::from(&*session));
    }

    let Some((difficulty, correct)) = session
        .current_question()
        .map(|question| (question.difficulty, question.is_correct(&submission.answer)))
    else {
        // Question index ran past the set without finishing; close the game
        // instead of leaving it wedged.
        warn!(game_id, "no current question; finishing session");
        let _ = session.apply(SessionEvent::Terminate);
        let snapshot = commit_and_broadcast(engine, &session).await?;
        drop(session);
        engine.remove_context(game_id);
        return Ok(snapshot);
    };

    let Some(username) = session
        .participants
        .get(&submission.participant_id)
        .map(|participant| participant.username.clone())
    else {
        return Err(EngineError::NotFound(format!(
            "participant `{}` not found in game `{game_id}`",
            submission.participant_id
        )));
    };

    let base = difficulty.base_points() * engine.config().score_multiplier;
    let floor = engine.config().score_floor;

    if correct {
        if session.round.correct_order.is_empty() {
            // First correct answer: full points, window opens, timer armed.
            session.push_correct(&username);
            session.add_score(&username, i64::from(base), floor);
            if let Err(invalid) = session.apply(SessionEvent::OpenWindow) {
                return force_terminate(engine, game_id, &mut session, &invalid.to_string()).await;
            }
            session.waiting_for_next = true;
            debug!(game_id, %username, points = base, "first correct answer; window opened");
            schedule_advance(engine, &context, &mut session, engine.config().grace_period);
        } else if session.phase.window_open() && session.correct_position(&username).is_none() {
            let position = session.push_correct(&username);
            let points = scoring::award(base, position);
            session.add_score(&username, i64::from(points), floor);
            session.waiting_for_next = true;
            debug!(game_id, %username, position, points, "correct answer within window");
        } else {
            // Repeat correct answer, or the window already closed: accepted
            // but unrewarded.
            session.waiting_for_next = true;
            debug!(game_id, %username, "correct answer outside window; no points");
        }
    }

    session.mark_answered(submission.participant_id);

    let snapshot = commit_and_broadcast(engine, &session).await?;

    if session.all_answered() {
        // Replace whatever timer is pending with the secondary grace delay so
        // slow clients receive the final-answer snapshot before the advance.
        debug!(game_id, "all participants answered; rescheduling advance");
        schedule_advance(engine, &context, &mut session, engine.config().grace_period);
    }

    Ok(snapshot)
}

/// Advance a game to its next question (or finish it).
///
/// This is the advance-timer callback. It re-acquires the game's lock and
/// checks, before touching anything, that its generation is still the
/// authoritative pending timer and that the game has not finished meanwhile;
/// a stale callback that lost a race simply returns. Errors are logged, never
/// propagated, so a failing callback cannot take down the scheduler.
pub async fn advance_question(engine: &SharedEngine, game_id: &str, generation: u64) {
    let Some(context) = engine.context(game_id) else {
        debug!(game_id, "advance fired for a retired game");
        return;
    };

    let mut session = context.session().lock().await;

    if session.is_finished() {
        return;
    }
    if session.timer_generation != generation {
        debug!(
            game_id,
            generation,
            current = session.timer_generation,
            "stale advance timer lost its race"
        );
        return;
    }

    session.waiting_for_next = false;
    if let Err(invalid) = session.apply(SessionEvent::Advance) {
        error!(game_id, error = %invalid, "advance raced an invalid phase; terminating");
        let _ = session.apply(SessionEvent::Terminate);
    }

    if let Err(err) = commit_and_broadcast(engine, &session).await {
        error!(game_id, error = %err, "failed to commit advanced session");
    }

    if session.is_finished() {
        debug!(game_id, "session finished; retiring context");
        drop(session);
        // Keeps the store entry so late status queries still resolve.
        engine.remove_context(game_id);
    }
}

/// Arm (or re-arm) the advance timer for a game.
///
/// Bumping the session's generation disowns any callback that already fired
/// and is waiting on the lock; installing the handle aborts any callback
/// that has not fired yet. Together they guarantee at most one effective
/// advance per schedule.
pub(crate) fn schedule_advance(
    engine: &SharedEngine,
    context: &Arc<GameContext>,
    session: &mut GameSession,
    delay: Duration,
) {
    let generation = session.next_timer_generation();
    let engine = engine.clone();
    let game_id = session.game_id.clone();

    let handle = tokio::spawn(async move {
        sleep(delay).await;
        advance_question(&engine, &game_id, generation).await;
    });

    context.install_timer(AdvanceTimer::new(generation, handle));
}

/// Force-terminate a session after an internal invariant breach.
///
/// Should be unreachable given the locking discipline; if it happens the
/// session is closed and committed rather than left inconsistent, and the
/// breach is surfaced to the caller.
async fn force_terminate(
    engine: &SharedEngine,
    game_id: &str,
    session: &mut GameSession,
    reason: &str,
) -> EngineResult<GameSnapshot> {
    error!(game_id, reason, "invariant breach; force-terminating session");
    let _ = session.apply(SessionEvent::Terminate);
    commit_and_broadcast(engine, session).await?;
    engine.remove_context(game_id);
    Err(EngineError::ConcurrencyViolation(format!(
        "game `{game_id}`: {reason}"
    )))
}
