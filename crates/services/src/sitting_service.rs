use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::model::{
    Guess, Question, QuestionId, QuestionSequence, Quiz, Sitting, SittingId, UserId,
};
use storage::repository::{QuestionRepository, SittingRepository};

use crate::Clock;
use crate::error::SittingServiceError;
use crate::progress_service::ProgressService;

/// What happened to one submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub question: Question,
    pub guess: Guess,
    pub correct: bool,
    /// No question is left after this one.
    pub finished: bool,
}

enum Graded {
    /// The submission was not for the question at the front of the queue.
    OutOfTurn,
    /// The pending question was deleted since the sitting started.
    Vanished,
    Answered { question: Question, correct: bool },
}

/// Drives quiz attempts: creating sittings, grading answers, keeping
/// progress in step and finishing attempts.
#[derive(Clone)]
pub struct SittingService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    sittings: Arc<dyn SittingRepository>,
    progress: ProgressService,
}

impl SittingService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        sittings: Arc<dyn SittingRepository>,
        progress: ProgressService,
    ) -> Self {
        Self {
            clock,
            questions,
            sittings,
            progress,
        }
    }

    async fn question_order(&self, quiz: &Quiz) -> Result<Vec<QuestionId>, SittingServiceError> {
        let mut ids: Vec<QuestionId> = self
            .questions
            .list_questions_for_quiz(quiz.id())
            .await?
            .iter()
            .map(Question::id)
            .collect();
        if quiz.random_order() {
            let mut rng = rng();
            ids.as_mut_slice().shuffle(&mut rng);
        }
        Ok(ids)
    }

    /// Start and persist a fresh sitting over a snapshot of the quiz's
    /// questions, shuffled when the quiz asks for random order.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError::Sitting` if the sitting cannot be built.
    /// Returns `SittingServiceError::Storage` if persistence fails.
    pub async fn new_sitting(
        &self,
        user: UserId,
        quiz: &Quiz,
    ) -> Result<Sitting, SittingServiceError> {
        let order = self.question_order(quiz).await?;
        let sitting = Sitting::new(SittingId::new(0), user, quiz.id(), order, self.clock.now())?;
        let id = self.sittings.insert_sitting(&sitting).await?;
        tracing::info!(sitting = %id, user = %user, quiz = quiz.url(), "sitting started");
        Ok(sitting.with_id(id))
    }

    /// The user's open sitting for this quiz, or a new one.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError` if loading or creating fails.
    pub async fn load_or_create(
        &self,
        user: UserId,
        quiz: &Quiz,
    ) -> Result<Sitting, SittingServiceError> {
        if let Some(open) = self.sittings.find_open_sitting(user, quiz.id()).await? {
            return Ok(open);
        }
        self.new_sitting(user, quiz).await
    }

    /// Question order for a visitor without an account. Nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError` if the questions cannot be loaded.
    pub async fn new_sequence(&self, quiz: &Quiz) -> Result<QuestionSequence, SittingServiceError> {
        Ok(QuestionSequence::new(self.question_order(quiz).await?)?)
    }

    async fn grade_next(
        &self,
        next: Option<QuestionId>,
        question_id: QuestionId,
        guess: Guess,
    ) -> Result<Graded, SittingServiceError> {
        if next != Some(question_id) {
            return Ok(Graded::OutOfTurn);
        }
        let Some(question) = self.questions.get_question(question_id).await? else {
            return Ok(Graded::Vanished);
        };
        let correct = question.check_if_correct(guess);
        Ok(Graded::Answered { question, correct })
    }

    /// Grade `guess` against the next pending question of a user's sitting.
    ///
    /// A correct answer adds a point; a wrong one is remembered as
    /// incorrect. Either way the question's category is scored in the user's
    /// progress and the question leaves the queue. Answers for any other
    /// question are ignored and yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError` if storage or progress updates fail.
    pub async fn answer(
        &self,
        sitting: &mut Sitting,
        quiz: &Quiz,
        question_id: QuestionId,
        guess: Guess,
    ) -> Result<Option<AnswerFeedback>, SittingServiceError> {
        let graded = self
            .grade_next(sitting.next_question(), question_id, guess)
            .await?;

        let feedback = match graded {
            Graded::OutOfTurn => {
                tracing::debug!(sitting = %sitting.id(), question = %question_id, "ignored out-of-turn answer");
                return Ok(None);
            }
            Graded::Vanished => {
                sitting.remove_first_question();
                None
            }
            Graded::Answered { question, correct } => {
                if correct {
                    sitting.add_to_score(1);
                } else {
                    sitting.add_incorrect_question(&question);
                }
                if let Some(category) = question.category() {
                    self.progress
                        .record_answer(sitting.user_id(), category, correct)
                        .await?;
                }
                sitting.remove_first_question();
                Some(AnswerFeedback {
                    question,
                    guess,
                    correct,
                    finished: sitting.next_question().is_none(),
                })
            }
        };

        if sitting.next_question().is_none() {
            self.finish(sitting, quiz).await?;
        } else {
            self.sittings.update_sitting(sitting).await?;
        }
        Ok(feedback)
    }

    /// Mark a sitting complete. Exam papers are kept for review, other
    /// sittings are deleted.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError::Storage` if persistence fails.
    pub async fn finish(&self, sitting: &mut Sitting, quiz: &Quiz) -> Result<(), SittingServiceError> {
        sitting.mark_quiz_complete(self.clock.now());
        if quiz.exam_paper() {
            self.sittings.update_sitting(sitting).await?;
        } else {
            self.sittings.delete_sitting(sitting.id()).await?;
        }
        tracing::info!(
            sitting = %sitting.id(),
            score = sitting.current_score(),
            percent = sitting.percent_correct(),
            kept = quiz.exam_paper(),
            "sitting complete"
        );
        Ok(())
    }

    /// The question a user's sitting is waiting on.
    ///
    /// Questions deleted since the sitting started are dropped from the
    /// queue and the sitting is saved. When nothing is left the sitting is
    /// finished and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError::Storage` if loading or saving fails.
    pub async fn pending_question(
        &self,
        sitting: &mut Sitting,
        quiz: &Quiz,
    ) -> Result<Option<Question>, SittingServiceError> {
        let mut skipped = false;
        while let Some(next) = sitting.next_question() {
            if let Some(question) = self.questions.get_question(next).await? {
                if skipped {
                    self.sittings.update_sitting(sitting).await?;
                }
                return Ok(Some(question));
            }
            tracing::warn!(sitting = %sitting.id(), question = %next, "skipping deleted question");
            sitting.remove_first_question();
            skipped = true;
        }
        if !sitting.is_complete() {
            self.finish(sitting, quiz).await?;
        }
        Ok(None)
    }

    /// Same as [`Self::pending_question`] for an in-memory sequence.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError::Storage` if a question cannot be loaded.
    pub async fn pending_question_anonymous(
        &self,
        sequence: &mut QuestionSequence,
    ) -> Result<Option<Question>, SittingServiceError> {
        while let Some(next) = sequence.next_question() {
            if let Some(question) = self.questions.get_question(next).await? {
                return Ok(Some(question));
            }
            sequence.remove_first_question();
        }
        Ok(None)
    }

    /// Anonymous counterpart of [`Self::answer`]: grades against an in-memory
    /// sequence and touches neither sittings nor progress.
    ///
    /// # Errors
    ///
    /// Returns `SittingServiceError::Storage` if the question cannot be loaded.
    pub async fn answer_anonymous(
        &self,
        sequence: &mut QuestionSequence,
        question_id: QuestionId,
        guess: Guess,
    ) -> Result<Option<AnswerFeedback>, SittingServiceError> {
        match self
            .grade_next(sequence.next_question(), question_id, guess)
            .await?
        {
            Graded::OutOfTurn => Ok(None),
            Graded::Vanished => {
                sequence.remove_first_question();
                Ok(None)
            }
            Graded::Answered { question, correct } => {
                if correct {
                    sequence.add_to_score(1);
                } else {
                    sequence.add_incorrect_question(&question);
                }
                sequence.remove_first_question();
                Ok(Some(AnswerFeedback {
                    question,
                    guess,
                    correct,
                    finished: sequence.is_exhausted(),
                }))
            }
        }
    }

    /// # Errors
    ///
    /// Returns `SittingServiceError::Storage` if repository access fails.
    pub async fn get_sitting(&self, id: SittingId) -> Result<Option<Sitting>, SittingServiceError> {
        Ok(self.sittings.get_sitting(id).await?)
    }
}
