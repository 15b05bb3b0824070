use thiserror::Error;

/// Whether the decaying-score answer window of the current question is open.
///
/// The window opens atomically with the first correct answer and closes when
/// the question advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerWindow {
    /// No correct answer has been recorded for the current question yet.
    Closed,
    /// The first correct answer arrived; later correct answers earn decayed
    /// points until the question advances.
    Open,
}

/// High-level phase of one quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session exists but the first question has not been dealt.
    Created,
    /// The session is on question `question` (0-based).
    InProgress {
        /// Index of the current question.
        question: usize,
        /// Answer-window sub-state for that question.
        window: AnswerWindow,
    },
    /// Terminal phase; no score or index mutation is permitted afterwards.
    Finished,
}

impl SessionPhase {
    /// Current question index, if the session is in progress.
    pub fn question_index(&self) -> Option<usize> {
        match self {
            SessionPhase::InProgress { question, .. } => Some(*question),
            _ => None,
        }
    }

    /// True once the session reached its terminal phase.
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionPhase::Finished)
    }

    /// True while the answer window of the current question is open.
    pub fn window_open(&self) -> bool {
        matches!(
            self,
            SessionPhase::InProgress {
                window: AnswerWindow::Open,
                ..
            }
        )
    }
}

/// Events that can be applied to a session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Deal the first question.
    Start,
    /// First correct answer for the current question opens its window.
    OpenWindow,
    /// Move to the next question, or finish after the last one.
    Advance,
    /// Early termination (e.g. the participant set became empty).
    Terminate,
}

/// Error returned when an event cannot be applied to the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the session was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Compute the phase that follows `event`, or reject the transition.
///
/// `question_count` decides whether an advance lands on the next question or
/// on [`SessionPhase::Finished`]. `Terminate` is accepted from every phase,
/// including `Finished`, so teardown paths stay idempotent.
pub fn next_phase(
    phase: SessionPhase,
    event: SessionEvent,
    question_count: usize,
) -> Result<SessionPhase, InvalidTransition> {
    let next = match (phase, event) {
        (SessionPhase::Created, SessionEvent::Start) if question_count > 0 => {
            SessionPhase::InProgress {
                question: 0,
                window: AnswerWindow::Closed,
            }
        }
        (
            SessionPhase::InProgress {
                question,
                window: AnswerWindow::Closed,
            },
            SessionEvent::OpenWindow,
        ) => SessionPhase::InProgress {
            question,
            window: AnswerWindow::Open,
        },
        (SessionPhase::InProgress { question, .. }, SessionEvent::Advance) => {
            if question + 1 >= question_count {
                SessionPhase::Finished
            } else {
                SessionPhase::InProgress {
                    question: question + 1,
                    window: AnswerWindow::Closed,
                }
            }
        }
        (_, SessionEvent::Terminate) => SessionPhase::Finished,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}
