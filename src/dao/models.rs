use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::{
    game::{GameSession, Participant, Question, RoundState},
    scoring::Difficulty,
    state_machine::{AnswerWindow, SessionPhase},
};

/// Persisted form of a [`Question`].
///
/// The shuffled option order and correct index are stored verbatim so a
/// reloaded session never reshuffles options already shown to clients.
#[derive(Debug, Clone)]
pub struct QuestionEntity {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub prompt: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Expected answer value.
    pub correct_answer: String,
    /// Distractor answers.
    pub incorrect_answers: Vec<String>,
    /// Cached option order as first shuffled.
    pub options: Vec<String>,
    /// Position of the correct answer within `options`.
    pub correct_index: usize,
}

/// Persisted form of a [`Participant`].
#[derive(Debug, Clone)]
pub struct ParticipantEntity {
    /// Participant identifier.
    pub id: Uuid,
    /// Display name.
    pub username: String,
}

/// Persisted form of a [`GameSession`].
///
/// Per-question ephemeral state (answered set, arrival order, window flag,
/// timer token) is deliberately absent: it never survives a question
/// boundary, let alone a restart.
#[derive(Debug, Clone)]
pub struct GameSessionEntity {
    /// Unique business key of the game.
    pub game_id: String,
    /// Owning room.
    pub room_id: String,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    /// Last commit timestamp.
    pub updated_at: OffsetDateTime,
    /// Ordered question sequence.
    pub questions: Vec<QuestionEntity>,
    /// Enrolled participants.
    pub participants: Vec<ParticipantEntity>,
    /// Cumulative score per username.
    pub scores: IndexMap<String, i64>,
    /// Index of the current question.
    pub current_question_index: usize,
    /// Whether the session reached its terminal phase.
    pub finished: bool,
    /// Whether the current answer window had been opened at commit time.
    pub waiting_for_next: bool,
}

impl From<&Question> for QuestionEntity {
    fn from(value: &Question) -> Self {
        Self {
            id: value.id,
            prompt: value.prompt.clone(),
            category: value.category.clone(),
            difficulty: value.difficulty,
            correct_answer: value.correct_answer.clone(),
            incorrect_answers: value.incorrect_answers.clone(),
            options: value.options().to_vec(),
            correct_index: value.correct_index(),
        }
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Question::restore(
            value.id,
            value.prompt,
            value.category,
            value.difficulty,
            value.correct_answer,
            value.incorrect_answers,
            value.options,
            value.correct_index,
        )
    }
}

impl From<&Participant> for ParticipantEntity {
    fn from(value: &Participant) -> Self {
        Self {
            id: value.id,
            username: value.username.clone(),
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            username: value.username,
        }
    }
}

impl From<&GameSession> for GameSessionEntity {
    fn from(value: &GameSession) -> Self {
        Self {
            game_id: value.game_id.clone(),
            room_id: value.room_id.clone(),
            created_at: value.created_at,
            updated_at: value.updated_at,
            questions: value.questions.iter().map(Into::into).collect(),
            participants: value.participants.values().map(Into::into).collect(),
            scores: value.scores.clone(),
            current_question_index: value.current_index().unwrap_or(value.questions.len()),
            finished: value.is_finished(),
            waiting_for_next: value.waiting_for_next,
        }
    }
}

impl From<GameSessionEntity> for GameSession {
    fn from(value: GameSessionEntity) -> Self {
        let phase = if value.finished {
            SessionPhase::Finished
        } else {
            SessionPhase::InProgress {
                question: value.current_question_index,
                window: AnswerWindow::Closed,
            }
        };

        Self {
            game_id: value.game_id,
            room_id: value.room_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            questions: value.questions.into_iter().map(Into::into).collect(),
            participants: value
                .participants
                .into_iter()
                .map(|p| (p.id, Participant::from(p)))
                .collect(),
            scores: value.scores,
            phase,
            waiting_for_next: value.waiting_for_next,
            round: RoundState::default(),
            timer_generation: 0,
        }
    }
}
