use rand::seq::SliceRandom;

use crate::{
    dto::game::QuestionInput,
    error::{EngineError, EngineResult},
    state::game::Question,
};

/// Collaborator contract expected from a question supplier.
///
/// Returned sets are pre-shuffled and every question already carries its
/// stable option order and correct index.
pub trait QuestionSource: Send + Sync {
    /// Draw an ordered, shuffled question set of at most `max_count` entries.
    fn load_question_set(&self, max_count: usize) -> Vec<Question>;
}

/// Immutable, validated question catalog.
///
/// Validation happens once at load time; in particular an unknown difficulty
/// tier rejects the whole set here instead of blowing up during scoring.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Build a catalog from already-constructed questions.
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Validate raw question payloads into a catalog.
    pub fn from_inputs(inputs: Vec<QuestionInput>) -> EngineResult<Self> {
        if inputs.is_empty() {
            return Err(EngineError::Configuration(
                "question catalog must not be empty".into(),
            ));
        }
        let questions = inputs
            .into_iter()
            .map(Question::try_from)
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { questions })
    }

    /// Number of questions in the catalog.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// True when the catalog holds no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionSource for QuestionCatalog {
    fn load_question_set(&self, max_count: usize) -> Vec<Question> {
        let mut drawn = self.questions.clone();
        let mut rng = rand::rng();
        drawn.shuffle(&mut rng);
        drawn.truncate(max_count);
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(count: usize) -> Vec<QuestionInput> {
        (0..count)
            .map(|i| QuestionInput {
                prompt: format!("question {i}"),
                category: None,
                difficulty: "easy".into(),
                correct_answer: "yes".into(),
                incorrect_answers: vec!["no".into()],
            })
            .collect()
    }

    #[test]
    fn empty_catalog_is_a_configuration_error() {
        let err = QuestionCatalog::from_inputs(vec![]).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn invalid_difficulty_rejects_the_whole_set() {
        let mut bad = inputs(3);
        bad[1].difficulty = "nightmare".into();
        assert!(QuestionCatalog::from_inputs(bad).is_err());
    }

    #[test]
    fn draw_caps_at_max_count() {
        let catalog = QuestionCatalog::from_inputs(inputs(30)).unwrap();
        assert_eq!(catalog.load_question_set(20).len(), 20);
    }

    #[test]
    fn draw_returns_everything_when_catalog_is_small() {
        let catalog = QuestionCatalog::from_inputs(inputs(4)).unwrap();
        assert_eq!(catalog.load_question_set(20).len(), 4);
    }
}
