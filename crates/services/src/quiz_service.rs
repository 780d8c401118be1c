use std::sync::Arc;

use quiz_core::model::{
    Category, CategoryId, CategoryName, Question, QuestionId, Quiz, QuizId, QuizOptions,
};
use storage::repository::{CategoryRepository, QuestionRepository, QuizRepository, StorageError};

use crate::error::QuizServiceError;

/// Orchestrates quiz and question creation and the read paths used by the
/// quiz pages.
#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            quizzes,
            questions,
            categories,
        }
    }

    /// Create a quiz, slugifying `url`, and persist it.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` for validation failures.
    /// Returns `QuizServiceError::DuplicateUrl` if another quiz owns the slug.
    /// Returns `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(
        &self,
        title: &str,
        description: &str,
        url: &str,
        category: Option<CategoryId>,
        options: QuizOptions,
    ) -> Result<Quiz, QuizServiceError> {
        let quiz = Quiz::new(QuizId::new(0), title, description, url, category, options)?;
        match self.quizzes.insert_quiz(&quiz).await {
            Ok(id) => {
                tracing::info!(quiz = %id, url = quiz.url(), "quiz created");
                Ok(quiz.with_id(id))
            }
            Err(StorageError::Conflict) => Err(QuizServiceError::DuplicateUrl {
                url: quiz.url().to_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Every quiz, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes(None).await?)
    }

    /// The category named `raw` with its quizzes.
    ///
    /// Returns `Ok(None)` when no such category exists.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn quizzes_in_category(
        &self,
        raw: &str,
    ) -> Result<Option<(Category, Vec<Quiz>)>, QuizServiceError> {
        let Some(category) = self
            .categories
            .find_category(&CategoryName::new(raw))
            .await?
        else {
            return Ok(None);
        };
        let quizzes = self.quizzes.list_quizzes(Some(category.id())).await?;
        Ok(Some((category, quizzes)))
    }

    /// Fetch a quiz by its url slug.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Quiz>, QuizServiceError> {
        Ok(self.quizzes.find_quiz_by_url(url).await?)
    }

    /// Persist a new question and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if it links to an unknown quiz.
    /// Returns `QuizServiceError::Storage` if persistence fails.
    pub async fn add_question(&self, question: Question) -> Result<Question, QuizServiceError> {
        for quiz in question.quizzes() {
            if self.quizzes.get_quiz(quiz).await?.is_none() {
                return Err(QuizServiceError::NotFound);
            }
        }
        let id = self.questions.insert_question(&question).await?;
        tracing::debug!(question = %id, "question added");
        Ok(question.with_id(id))
    }

    /// Questions of a quiz in their stored order.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn questions_for(&self, quiz: QuizId) -> Result<Vec<Question>, QuizServiceError> {
        Ok(self.questions.list_questions_for_quiz(quiz).await?)
    }

    /// Resolve a list of ids to questions, skipping ids that no longer exist.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn questions_by_id(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<Question>, QuizServiceError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(question) = self.questions.get_question(*id).await? {
                out.push(question);
            }
        }
        Ok(out)
    }
}
