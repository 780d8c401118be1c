use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{QuestionId, QuizId, SittingId, UserId};
use crate::model::progress::percent_of;
use crate::model::question::QuestionRef;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SittingError {
    #[error("too many questions for a single sitting: {len}")]
    TooManyQuestions { len: usize },

    #[error("completed_at is before started_at")]
    InvalidTimeRange,
}

//
// ─── QUESTION SEQUENCE ─────────────────────────────────────────────────────────
//

/// Ordered walk through a fixed set of questions with a running score.
///
/// The total is captured when the sequence is created and never changes,
/// so percentages stay comparable while questions are consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSequence {
    pending: VecDeque<QuestionId>,
    total: u32,
    score: u32,
    incorrect: Vec<QuestionId>,
}

impl QuestionSequence {
    /// # Errors
    ///
    /// Returns `SittingError::TooManyQuestions` if the count cannot fit in `u32`.
    pub fn new(questions: Vec<QuestionId>) -> Result<Self, SittingError> {
        let total = u32::try_from(questions.len()).map_err(|_| SittingError::TooManyQuestions {
            len: questions.len(),
        })?;
        Ok(Self {
            pending: questions.into(),
            total,
            score: 0,
            incorrect: Vec::new(),
        })
    }

    /// Rehydrate a sequence from persisted state.
    #[must_use]
    pub fn from_persisted(
        pending: Vec<QuestionId>,
        total: u32,
        score: u32,
        incorrect: Vec<QuestionId>,
    ) -> Self {
        Self {
            pending: pending.into(),
            total,
            score,
            incorrect,
        }
    }

    /// The question to ask next, if any remain.
    #[must_use]
    pub fn next_question(&self) -> Option<QuestionId> {
        self.pending.front().copied()
    }

    /// Drops the question at the front. Does nothing once exhausted.
    pub fn remove_first_question(&mut self) {
        self.pending.pop_front();
    }

    pub fn add_to_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    #[must_use]
    pub fn current_score(&self) -> u32 {
        self.score
    }

    /// Score as a whole percentage of the fixed total, capped at 100.
    #[must_use]
    pub fn percent_correct(&self) -> u32 {
        percent_of(self.score, self.total)
    }

    /// Records a wrongly answered question.
    ///
    /// Returns `false` without touching state when `item` is not a question.
    pub fn add_incorrect_question(&mut self, item: &impl QuestionRef) -> bool {
        match item.question_id() {
            Some(id) => {
                self.incorrect.push(id);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn incorrect_questions(&self) -> &[QuestionId] {
        &self.incorrect
    }

    #[must_use]
    pub fn pending(&self) -> impl ExactSizeIterator<Item = QuestionId> + '_ {
        self.pending.iter().copied()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

//
// ─── SITTING ───────────────────────────────────────────────────────────────────
//

/// One user's attempt at one quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitting {
    id: SittingId,
    user_id: UserId,
    quiz_id: QuizId,
    sequence: QuestionSequence,
    complete: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Sitting {
    /// Starts a sitting over the given question order.
    ///
    /// # Errors
    ///
    /// Returns `SittingError::TooManyQuestions` if the count cannot fit in `u32`.
    pub fn new(
        id: SittingId,
        user_id: UserId,
        quiz_id: QuizId,
        questions: Vec<QuestionId>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SittingError> {
        Ok(Self {
            id,
            user_id,
            quiz_id,
            sequence: QuestionSequence::new(questions)?,
            complete: false,
            started_at,
            completed_at: None,
        })
    }

    /// Rehydrate a sitting from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SittingError::InvalidTimeRange` if `completed_at` precedes `started_at`.
    pub fn from_persisted(
        id: SittingId,
        user_id: UserId,
        quiz_id: QuizId,
        sequence: QuestionSequence,
        complete: bool,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SittingError> {
        if completed_at.is_some_and(|done| done < started_at) {
            return Err(SittingError::InvalidTimeRange);
        }
        Ok(Self {
            id,
            user_id,
            quiz_id,
            sequence,
            complete,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: SittingId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn next_question(&self) -> Option<QuestionId> {
        self.sequence.next_question()
    }

    pub fn remove_first_question(&mut self) {
        self.sequence.remove_first_question();
    }

    pub fn add_to_score(&mut self, points: u32) {
        self.sequence.add_to_score(points);
    }

    #[must_use]
    pub fn current_score(&self) -> u32 {
        self.sequence.current_score()
    }

    #[must_use]
    pub fn percent_correct(&self) -> u32 {
        self.sequence.percent_correct()
    }

    pub fn add_incorrect_question(&mut self, item: &impl QuestionRef) -> bool {
        self.sequence.add_incorrect_question(item)
    }

    #[must_use]
    pub fn incorrect_questions(&self) -> &[QuestionId] {
        self.sequence.incorrect_questions()
    }

    /// Marks the attempt as finished. There is no way back.
    pub fn mark_quiz_complete(&mut self, at: DateTime<Utc>) {
        if !self.complete {
            self.complete = true;
            self.completed_at = Some(at.max(self.started_at));
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SittingId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn sequence(&self) -> &QuestionSequence {
        &self.sequence
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
