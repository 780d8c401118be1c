use std::sync::Arc;

use quiz_core::model::{Answer, Question, QuestionId, QuestionKind, QuizOptions};
use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::AuthService;
use crate::category_service::CategoryService;
use crate::error::{AppServicesError, QuizServiceError};
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::sitting_service::SittingService;

/// Assembles the services the web layer talks to.
#[derive(Clone)]
pub struct AppServices {
    categories: Arc<CategoryService>,
    quizzes: Arc<QuizService>,
    progress: Arc<ProgressService>,
    sittings: Arc<SittingService>,
    auth: Arc<AuthService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over an already wired storage aggregate.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let progress = ProgressService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.categories),
        );
        let sittings = SittingService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.sittings),
            progress.clone(),
        );

        Self {
            categories: Arc::new(CategoryService::new(Arc::clone(&storage.categories))),
            quizzes: Arc::new(QuizService::new(
                Arc::clone(&storage.quizzes),
                Arc::clone(&storage.questions),
                Arc::clone(&storage.categories),
            )),
            progress: Arc::new(progress),
            sittings: Arc::new(sittings),
            auth: Arc::new(AuthService::new(clock, Arc::clone(&storage.users))),
        }
    }

    #[must_use]
    pub fn categories(&self) -> Arc<CategoryService> {
        Arc::clone(&self.categories)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn sittings(&self) -> Arc<SittingService> {
        Arc::clone(&self.sittings)
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    /// Load a small demo quiz unless one is already present.
    ///
    /// Returns whether anything was created.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if any creation step fails.
    pub async fn seed_demo(&self) -> Result<bool, AppServicesError> {
        if self.quizzes.get_by_url("berry-basics").await?.is_some() {
            return Ok(false);
        }

        let berries = self.categories.new_category("berries").await?;
        let quiz = self
            .quizzes
            .create_quiz(
                "Berry basics",
                "A few questions about berries.",
                "berry basics",
                Some(berries.id()),
                QuizOptions::default(),
            )
            .await?;

        let samples = [
            (
                "Which of these is a berry in the botanical sense?",
                QuestionKind::MultipleChoice {
                    answers: vec![
                        Answer::new("Banana", true).map_err(QuizServiceError::from)?,
                        Answer::new("Strawberry", false).map_err(QuizServiceError::from)?,
                        Answer::new("Raspberry", false).map_err(QuizServiceError::from)?,
                    ],
                },
                Some("Strawberries and raspberries are aggregate fruits."),
            ),
            (
                "Elderberries should be cooked before eating.",
                QuestionKind::TrueFalse { correct: true },
                None,
            ),
        ];

        for (content, kind, explanation) in samples {
            let mut question = Question::new(
                QuestionId::new(0),
                content,
                explanation.map(str::to_owned),
                Some(berries.id()),
                kind,
            )
            .map_err(QuizServiceError::from)?;
            question.add_to_quiz(quiz.id());
            self.quizzes.add_question(question).await?;
        }

        tracing::info!(quiz = quiz.url(), "demo data loaded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    #[tokio::test]
    async fn seed_demo_runs_once() {
        let services = AppServices::from_storage(&Storage::in_memory(), Clock::fixed(fixed_now()));
        assert!(services.seed_demo().await.unwrap());
        assert!(!services.seed_demo().await.unwrap());

        let quiz = services
            .quizzes()
            .get_by_url("berry-basics")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(services.quizzes().questions_for(quiz.id()).await.unwrap().len(), 2);
    }
}
