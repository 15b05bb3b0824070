use std::collections::HashSet;

use indexmap::IndexMap;
use rand::Rng;
use rand::seq::SliceRandom;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::scoring::{self, Difficulty};
use crate::state::state_machine::{InvalidTransition, SessionEvent, SessionPhase, next_phase};

/// Immutable quiz question.
///
/// The shuffled `options` list and the position of the correct answer inside
/// it are computed exactly once at construction, so every DTO issued for this
/// question sees the same ordering.
#[derive(Debug, Clone)]
pub struct Question {
    /// Stable identifier for the question.
    pub id: Uuid,
    /// The question text shown to players.
    pub prompt: String,
    /// Optional category label (e.g. "Geography").
    pub category: Option<String>,
    /// Difficulty tier driving the base point value.
    pub difficulty: Difficulty,
    /// The expected answer, compared verbatim against submissions.
    pub correct_answer: String,
    /// Distractor answers mixed into the options.
    pub incorrect_answers: Vec<String>,
    options: Vec<String>,
    correct_index: usize,
}

impl Question {
    /// Build a question, shuffling its answer options once.
    pub fn new(
        prompt: String,
        category: Option<String>,
        difficulty: Difficulty,
        correct_answer: String,
        incorrect_answers: Vec<String>,
    ) -> Self {
        let mut rng = rand::rng();
        let mut options = incorrect_answers.clone();
        options.shuffle(&mut rng);
        let correct_index = rng.random_range(0..=options.len());
        options.insert(correct_index, correct_answer.clone());

        Self {
            id: Uuid::new_v4(),
            prompt,
            category,
            difficulty,
            correct_answer,
            incorrect_answers,
            options,
            correct_index,
        }
    }

    /// Rebuild a question from persisted parts, keeping the cached option
    /// order and correct index exactly as they were first computed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid,
        prompt: String,
        category: Option<String>,
        difficulty: Difficulty,
        correct_answer: String,
        incorrect_answers: Vec<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Self {
        Self {
            id,
            prompt,
            category,
            difficulty,
            correct_answer,
            incorrect_answers,
            options,
            correct_index,
        }
    }

    /// All answer options in their fixed, pre-shuffled order.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Position of the correct answer within [`Self::options`].
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Whether a submitted answer value matches the correct answer.
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

/// A player enrolled in a session. Identity is owned by the room layer; the
/// session only references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Room-scoped participant identifier.
    pub id: Uuid,
    /// Display name, also the key of the score map.
    pub username: String,
}

/// Per-question ephemeral tracking, discarded whenever the question index
/// changes.
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    /// Usernames that answered correctly this question, in arrival order.
    /// Each username appears at most once.
    pub correct_order: Vec<String>,
    /// Ids of participants who submitted any answer this question.
    pub answered: HashSet<Uuid>,
}

/// Aggregated state for one running quiz session.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Unique business key of the game.
    pub game_id: String,
    /// Back-reference to the owning room (not ownership).
    pub room_id: String,
    /// Creation timestamp for auditing/debugging.
    pub created_at: OffsetDateTime,
    /// Last time the session was committed.
    pub updated_at: OffsetDateTime,
    /// Ordered question sequence, fixed at creation.
    pub questions: Vec<Question>,
    /// Currently enrolled participants, in enrollment order.
    pub participants: IndexMap<Uuid, Participant>,
    /// Cumulative score per username.
    pub scores: IndexMap<String, i64>,
    /// Phase of the session state machine.
    pub phase: SessionPhase,
    /// True once the first correct answer opened the current answer window.
    pub waiting_for_next: bool,
    /// Ephemeral tracking for the current question.
    pub round: RoundState,
    /// Token identifying the authoritative pending advance timer. A fired
    /// callback whose generation no longer matches lost a race and must not
    /// mutate the session.
    pub timer_generation: u64,
}

impl GameSession {
    /// Build a fresh session in the [`SessionPhase::Created`] phase.
    pub fn new(
        game_id: String,
        room_id: String,
        participants: Vec<Participant>,
        questions: Vec<Question>,
    ) -> Self {
        let timestamp = OffsetDateTime::now_utc();
        let participants = participants.into_iter().map(|p| (p.id, p)).collect();

        Self {
            game_id,
            room_id,
            created_at: timestamp,
            updated_at: timestamp,
            questions,
            participants,
            scores: IndexMap::new(),
            phase: SessionPhase::Created,
            waiting_for_next: false,
            round: RoundState::default(),
            timer_generation: 0,
        }
    }

    /// Apply a state-machine event, resetting per-question tracking whenever
    /// the question index changes.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), InvalidTransition> {
        let next = next_phase(self.phase, event, self.questions.len())?;
        if next.question_index() != self.phase.question_index() {
            self.round = RoundState::default();
            self.waiting_for_next = false;
        }
        self.phase = next;
        self.touch();
        Ok(())
    }

    /// The question currently being played, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.phase
            .question_index()
            .and_then(|index| self.questions.get(index))
    }

    /// Index of the current question, if the session is in progress.
    pub fn current_index(&self) -> Option<usize> {
        self.phase.question_index()
    }

    /// True once the session reached its terminal phase.
    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    /// Enroll a participant. Returns false if the id was already enrolled.
    pub fn enroll(&mut self, participant: Participant) -> bool {
        if self.participants.contains_key(&participant.id) {
            return false;
        }
        self.participants.insert(participant.id, participant);
        self.touch();
        true
    }

    /// Remove a participant. Returns false if the id was not enrolled.
    pub fn withdraw(&mut self, participant_id: &Uuid) -> bool {
        let removed = self.participants.shift_remove(participant_id).is_some();
        if removed {
            self.round.answered.remove(participant_id);
            self.touch();
        }
        removed
    }

    /// Whether the given participant id is currently enrolled.
    pub fn is_enrolled(&self, participant_id: &Uuid) -> bool {
        self.participants.contains_key(participant_id)
    }

    /// Record that a participant submitted an answer for the current question.
    /// Returns false if they had already been marked (idempotence guard).
    pub fn mark_answered(&mut self, participant_id: Uuid) -> bool {
        self.round.answered.insert(participant_id)
    }

    /// True iff every currently enrolled participant has answered the current
    /// question. An empty session never counts as fully answered.
    pub fn all_answered(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .keys()
                .all(|id| self.round.answered.contains(id))
    }

    /// 1-based position of a username in the correct-answer arrival order.
    pub fn correct_position(&self, username: &str) -> Option<usize> {
        self.round
            .correct_order
            .iter()
            .position(|name| name == username)
            .map(|index| index + 1)
    }

    /// Append a username to the correct-answer arrival order and return its
    /// 1-based position. Appending an already-listed username is a no-op that
    /// returns the existing position.
    pub fn push_correct(&mut self, username: &str) -> usize {
        if let Some(position) = self.correct_position(username) {
            return position;
        }
        self.round.correct_order.push(username.to_string());
        self.round.correct_order.len()
    }

    /// Add a (possibly negative) delta to a player's cumulative score,
    /// clamping the resulting total at `floor`.
    pub fn add_score(&mut self, username: &str, delta: i64, floor: i64) {
        let current = self.scores.get(username).copied().unwrap_or(0);
        self.scores
            .insert(username.to_string(), scoring::apply_delta(current, delta, floor));
        self.touch();
    }

    /// Bump and return the authoritative timer generation. Any previously
    /// scheduled advance callback is thereby disowned.
    pub fn next_timer_generation(&mut self) -> u64 {
        self.timer_generation += 1;
        self.timer_generation
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::AnswerWindow;

    fn question(correct: &str, wrong: &[&str]) -> Question {
        Question::new(
            "prompt".into(),
            None,
            Difficulty::Easy,
            correct.into(),
            wrong.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn participant(name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            username: name.into(),
        }
    }

    fn session(participants: Vec<Participant>, questions: Vec<Question>) -> GameSession {
        GameSession::new("game-1".into(), "room-1".into(), participants, questions)
    }

    #[test]
    fn options_contain_correct_answer_at_stable_index() {
        let q = question("Paris", &["London", "Rome", "Berlin"]);
        assert_eq!(q.options().len(), 4);
        assert_eq!(q.options()[q.correct_index()], "Paris");
        // The cached ordering never changes across reads.
        let first: Vec<String> = q.options().to_vec();
        assert_eq!(q.options(), first.as_slice());
    }

    #[test]
    fn enroll_and_withdraw_are_idempotent() {
        let p = participant("alice");
        let mut game = session(vec![], vec![question("a", &["b"])]);

        assert!(game.enroll(p.clone()));
        assert!(!game.enroll(p.clone()));
        assert!(game.withdraw(&p.id));
        assert!(!game.withdraw(&p.id));
    }

    #[test]
    fn mark_answered_guards_against_repeats() {
        let p = participant("alice");
        let mut game = session(vec![p.clone()], vec![question("a", &["b"])]);
        game.apply(SessionEvent::Start).unwrap();

        assert!(game.mark_answered(p.id));
        assert!(!game.mark_answered(p.id));
        assert!(game.all_answered());
    }

    #[test]
    fn all_answered_tracks_current_enrollment() {
        let p1 = participant("alice");
        let p2 = participant("bob");
        let mut game = session(vec![p1.clone(), p2.clone()], vec![question("a", &["b"])]);
        game.apply(SessionEvent::Start).unwrap();

        game.mark_answered(p1.id);
        assert!(!game.all_answered());

        // The laggard leaving makes the remaining set fully answered.
        game.withdraw(&p2.id);
        assert!(game.all_answered());
    }

    #[test]
    fn advance_resets_round_state() {
        let p = participant("alice");
        let mut game = session(
            vec![p.clone()],
            vec![question("a", &["b"]), question("c", &["d"])],
        );
        game.apply(SessionEvent::Start).unwrap();

        game.push_correct("alice");
        game.mark_answered(p.id);
        game.apply(SessionEvent::OpenWindow).unwrap();
        game.waiting_for_next = true;

        game.apply(SessionEvent::Advance).unwrap();
        assert!(game.round.correct_order.is_empty());
        assert!(game.round.answered.is_empty());
        assert!(!game.waiting_for_next);
        assert_eq!(
            game.phase,
            SessionPhase::InProgress {
                question: 1,
                window: AnswerWindow::Closed
            }
        );
    }

    #[test]
    fn push_correct_is_idempotent_per_username() {
        let mut game = session(vec![], vec![question("a", &["b"])]);
        game.apply(SessionEvent::Start).unwrap();

        assert_eq!(game.push_correct("alice"), 1);
        assert_eq!(game.push_correct("bob"), 2);
        assert_eq!(game.push_correct("alice"), 1);
        assert_eq!(game.round.correct_order, vec!["alice", "bob"]);
    }

    #[test]
    fn scores_are_clamped_at_the_floor() {
        let mut game = session(vec![], vec![question("a", &["b"])]);
        game.add_score("alice", 3, 0);
        game.add_score("alice", -10, 0);
        assert_eq!(game.scores["alice"], 0);
    }

    #[test]
    fn timer_generation_is_monotonic() {
        let mut game = session(vec![], vec![question("a", &["b"])]);
        let first = game.next_timer_generation();
        let second = game.next_timer_generation();
        assert!(second > first);
    }
}
