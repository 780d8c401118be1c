use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::category::Category;
use crate::model::ids::{CategoryId, QuestionId, QuizId};
use crate::model::quiz::Quiz;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question content cannot be empty")]
    EmptyContent,

    #[error("answer content cannot be empty")]
    EmptyAnswer,
}

//
// ─── VARIANTS ──────────────────────────────────────────────────────────────────
//

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    content: String,
    correct: bool,
}

impl Answer {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyAnswer` if the content is blank.
    pub fn new(content: impl Into<String>, correct: bool) -> Result<Self, QuestionError> {
        let content = content.into();
        let content = content.trim();
        if content.is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }
        Ok(Self {
            content: content.to_owned(),
            correct,
        })
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice { answers: Vec<Answer> },
    TrueFalse { correct: bool },
}

impl QuestionKind {
    /// Short label used by storage and templates.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::TrueFalse { .. } => "true_false",
        }
    }
}

/// A user's answer to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guess {
    /// Zero-based position of the chosen multiple-choice answer.
    Choice(usize),
    TrueFalse(bool),
}

impl Guess {
    /// Parses a submitted form value: `true`/`false` or an answer position.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "true" => Some(Guess::TrueFalse(true)),
            "false" => Some(Guess::TrueFalse(false)),
            other => other.parse::<usize>().ok().map(Guess::Choice),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A question that can appear in one or more quizzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    quizzes: BTreeSet<QuizId>,
    category: Option<CategoryId>,
    content: String,
    explanation: Option<String>,
    kind: QuestionKind,
}

impl Question {
    /// Creates a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyContent` if content is blank.
    pub fn new(
        id: QuestionId,
        content: impl Into<String>,
        explanation: Option<String>,
        category: Option<CategoryId>,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let content = content.into();
        let content = content.trim();
        if content.is_empty() {
            return Err(QuestionError::EmptyContent);
        }

        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Self {
            id,
            quizzes: BTreeSet::new(),
            category,
            content: content.to_owned(),
            explanation,
            kind,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: QuestionId) -> Self {
        self.id = id;
        self
    }

    /// Attaches the question to a quiz. Adding the same quiz twice is a no-op.
    pub fn add_to_quiz(&mut self, quiz: QuizId) {
        self.quizzes.insert(quiz);
    }

    #[must_use]
    pub fn belongs_to(&self, quiz: QuizId) -> bool {
        self.quizzes.contains(&quiz)
    }

    /// Grades a guess. A guess of the wrong shape is never correct.
    #[must_use]
    pub fn check_if_correct(&self, guess: Guess) -> bool {
        match (&self.kind, guess) {
            (QuestionKind::MultipleChoice { answers }, Guess::Choice(idx)) => {
                answers.get(idx).is_some_and(Answer::is_correct)
            }
            (QuestionKind::TrueFalse { correct }, Guess::TrueFalse(value)) => *correct == value,
            _ => false,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn quizzes(&self) -> impl Iterator<Item = QuizId> + '_ {
        self.quizzes.iter().copied()
    }

    #[must_use]
    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    /// Multiple-choice answers; empty for true/false questions.
    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        match &self.kind {
            QuestionKind::MultipleChoice { answers } => answers,
            QuestionKind::TrueFalse { .. } => &[],
        }
    }
}

//
// ─── QUESTION REFERENCES ───────────────────────────────────────────────────────
//

/// Anything a caller may hand to a sitting where a question is expected.
///
/// Only question values resolve to an id; other domain objects are
/// recognized and rejected.
pub trait QuestionRef {
    fn question_id(&self) -> Option<QuestionId>;
}

impl QuestionRef for Question {
    fn question_id(&self) -> Option<QuestionId> {
        Some(self.id)
    }
}

impl QuestionRef for QuestionId {
    fn question_id(&self) -> Option<QuestionId> {
        Some(*self)
    }
}

impl QuestionRef for Quiz {
    fn question_id(&self) -> Option<QuestionId> {
        None
    }
}

impl QuestionRef for Category {
    fn question_id(&self) -> Option<QuestionId> {
        None
    }
}

impl<T: QuestionRef + ?Sized> QuestionRef for &T {
    fn question_id(&self) -> Option<QuestionId> {
        (**self).question_id()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
