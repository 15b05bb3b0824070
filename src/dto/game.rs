use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::{
    error::EngineError,
    state::game::{GameSession, Participant, Question},
    state::scoring::Difficulty,
};

/// Payload used to start a fresh game in a room.
#[derive(Debug, Clone, Deserialize)]
pub struct StartGameRequest {
    /// Room hosting the game.
    pub room_id: String,
    /// Snapshot of the room's participants at start time.
    pub participants: Vec<ParticipantInput>,
    /// Question set drawn for this game.
    pub questions: Vec<QuestionInput>,
}

/// Incoming participant identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantInput {
    /// Room-scoped participant id.
    pub id: Uuid,
    /// Display name.
    pub username: String,
}

impl From<ParticipantInput> for Participant {
    fn from(value: ParticipantInput) -> Self {
        Self {
            id: value.id,
            username: value.username,
        }
    }
}

/// Incoming question definition, validated into a [`Question`] at load time.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    /// Question text.
    pub prompt: String,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Difficulty tier as a lowercase string (`easy`/`medium`/`hard`).
    pub difficulty: String,
    /// Expected answer value.
    pub correct_answer: String,
    /// Distractor answers; at least one is required.
    pub incorrect_answers: Vec<String>,
}

impl TryFrom<QuestionInput> for Question {
    type Error = EngineError;

    fn try_from(value: QuestionInput) -> Result<Self, Self::Error> {
        if value.prompt.trim().is_empty() {
            return Err(EngineError::Configuration(
                "question prompt must not be empty".into(),
            ));
        }
        if value.correct_answer.trim().is_empty() {
            return Err(EngineError::Configuration(
                "question correct answer must not be empty".into(),
            ));
        }
        if value.incorrect_answers.is_empty() {
            return Err(EngineError::Configuration(format!(
                "question `{}` needs at least one incorrect answer",
                value.prompt
            )));
        }
        let difficulty: Difficulty = value.difficulty.parse()?;

        Ok(Question::new(
            value.prompt,
            value.category,
            difficulty,
            value.correct_answer,
            value.incorrect_answers,
        ))
    }
}

/// A player's answer to the current question of a game.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSubmission {
    /// Id of the submitting participant.
    pub participant_id: Uuid,
    /// The answer value, compared verbatim.
    pub answer: String,
}

/// Joker kinds a player can play during a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JokerType {
    /// Asks other players to yield the next answer to the requester.
    PriorityAnswer,
}

/// Request to play a joker.
#[derive(Debug, Clone, Deserialize)]
pub struct JokerRequest {
    /// Id of the requesting participant.
    pub participant_id: Uuid,
    /// Display name of the requesting participant.
    pub username: String,
    /// Kind of joker played.
    pub joker_type: JokerType,
}

/// Joker notification relayed to every subscriber of the game's joker topic.
#[derive(Debug, Clone, Serialize)]
pub struct JokerEvent {
    /// Display name of the player who used the joker.
    pub username: String,
    /// Id of the player who used the joker.
    pub participant_id: Uuid,
    /// Kind of joker played.
    pub joker_type: JokerType,
}

impl From<JokerRequest> for JokerEvent {
    fn from(value: JokerRequest) -> Self {
        Self {
            username: value.username,
            participant_id: value.participant_id,
            joker_type: value.joker_type,
        }
    }
}

/// Client-facing projection of a question.
///
/// The correct answer text is never included; the answering UI gets its
/// position within the pre-shuffled options instead.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub prompt: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Answer options in their fixed, pre-shuffled order.
    pub options: Vec<String>,
    /// Position of the correct answer within `options`.
    pub correct_index: usize,
}

impl From<&Question> for QuestionView {
    fn from(value: &Question) -> Self {
        Self {
            id: value.id,
            prompt: value.prompt.clone(),
            category: value.category.clone(),
            difficulty: value.difficulty,
            options: value.options().to_vec(),
            correct_index: value.correct_index(),
        }
    }
}

/// One row of the score board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    /// Player username.
    pub player: String,
    /// Cumulative score.
    pub score: i64,
}

/// Public projection of an enrolled participant.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    /// Participant id.
    pub id: Uuid,
    /// Display name.
    pub username: String,
}

impl From<&Participant> for ParticipantView {
    fn from(value: &Participant) -> Self {
        Self {
            id: value.id,
            username: value.username.clone(),
        }
    }
}

/// Full-state snapshot emitted after every committed mutation of a game.
///
/// Snapshots are idempotent replacements, not deltas; at-least-once delivery
/// is acceptable.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    /// Unique business key of the game.
    pub game_id: String,
    /// Owning room.
    pub room_id: String,
    /// Index of the current question (equals the question count once
    /// finished).
    pub current_question_index: usize,
    /// Projection of the question being played, if any.
    pub current_question: Option<QuestionView>,
    /// Number of questions in the session.
    pub question_count: usize,
    /// Score board in insertion order.
    pub scores: Vec<ScoreEntry>,
    /// Currently enrolled participants.
    pub participants: Vec<ParticipantView>,
    /// Whether the session has finished.
    pub finished: bool,
    /// Whether the current answer window has been opened.
    pub waiting_for_next: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the commit that produced this snapshot.
    pub updated_at: String,
}

impl From<&GameSession> for GameSnapshot {
    fn from(value: &GameSession) -> Self {
        Self {
            game_id: value.game_id.clone(),
            room_id: value.room_id.clone(),
            current_question_index: value.current_index().unwrap_or(value.questions.len()),
            current_question: value.current_question().map(Into::into),
            question_count: value.questions.len(),
            scores: value
                .scores
                .iter()
                .map(|(player, score)| ScoreEntry {
                    player: player.clone(),
                    score: *score,
                })
                .collect(),
            participants: value.participants.values().map(Into::into).collect(),
            finished: value.is_finished(),
            waiting_for_next: value.waiting_for_next,
            created_at: format_timestamp(value.created_at),
            updated_at: format_timestamp(value.updated_at),
        }
    }
}

/// Render a timestamp as RFC 3339, falling back to an empty string if the
/// formatter ever fails.
fn format_timestamp(timestamp: time::OffsetDateTime) -> String {
    timestamp.format(&Rfc3339).unwrap_or_default()
}
