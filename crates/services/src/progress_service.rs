use std::collections::BTreeMap;
use std::sync::Arc;

use quiz_core::model::{
    CategoryId, CategoryName, CategoryScore, Progress, ProgressError, UserId, parse_score_delta,
};
use storage::repository::{CategoryRepository, ProgressRepository};

use crate::error::ProgressServiceError;

/// Per-user, per-category score keeping.
///
/// Every mutating call persists the progress record before returning.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            progress,
            categories,
        }
    }

    /// The user's progress record, created empty on first use.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn new_progress(&self, user: UserId) -> Result<Progress, ProgressServiceError> {
        if let Some(existing) = self.progress.get_progress(user).await? {
            return Ok(existing);
        }
        let progress = Progress::new(user);
        self.progress.upsert_progress(&progress).await?;
        tracing::debug!(user = %user, "progress created");
        Ok(progress)
    }

    /// Scores for every known category, filling in `(0, 0)` for categories
    /// the user has not answered yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn list_all_cat_scores(
        &self,
        user: UserId,
    ) -> Result<BTreeMap<CategoryName, CategoryScore>, ProgressServiceError> {
        let mut progress = self.new_progress(user).await?;
        let categories = self.categories.list_categories().await?;
        let (added, scores) = progress.list_all_cat_scores(&categories);
        let scores = scores.clone();
        if added {
            self.progress.upsert_progress(&progress).await?;
        }
        Ok(scores)
    }

    /// The `(correct, possible)` tally for one category.
    ///
    /// A category that exists but has not been recorded yet is added with
    /// `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` with
    /// `ProgressError::UnknownCategory` if no such category exists.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn check_cat_score(
        &self,
        user: UserId,
        category: &str,
    ) -> Result<CategoryScore, ProgressServiceError> {
        let mut progress = self.new_progress(user).await?;
        if let Ok(score) = progress.check_cat_score(category) {
            return Ok(score);
        }

        let Some(known) = self
            .categories
            .find_category(&CategoryName::new(category))
            .await?
        else {
            return Err(ProgressError::UnknownCategory.into());
        };
        progress.update_score(&known, 0, 0);
        self.progress.upsert_progress(&progress).await?;
        Ok(progress.check_cat_score(category)?)
    }

    /// Add to the tally of an existing category.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` with
    /// `ProgressError::UnknownCategory` if no such category exists.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn update_score(
        &self,
        user: UserId,
        category: &str,
        correct: u32,
        possible: u32,
    ) -> Result<(), ProgressServiceError> {
        let Some(known) = self
            .categories
            .find_category(&CategoryName::new(category))
            .await?
        else {
            tracing::warn!(category, "score update for unknown category");
            return Err(ProgressError::UnknownCategory.into());
        };

        let mut progress = self.new_progress(user).await?;
        progress.update_score(&known, correct, possible);
        self.progress.upsert_progress(&progress).await?;
        Ok(())
    }

    /// Same as [`Self::update_score`] for raw, unvalidated deltas.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` with
    /// `ProgressError::InvalidScore` if a delta is not a non-negative integer,
    /// and everything [`Self::update_score`] returns.
    pub async fn update_score_from_input(
        &self,
        user: UserId,
        category: &str,
        correct: &str,
        possible: &str,
    ) -> Result<(), ProgressServiceError> {
        let correct = parse_score_delta(correct)?;
        let possible = parse_score_delta(possible)?;
        self.update_score(user, category, correct, possible).await
    }

    /// Records one answered question against its category, if it still
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn record_answer(
        &self,
        user: UserId,
        category: CategoryId,
        correct: bool,
    ) -> Result<(), ProgressServiceError> {
        let Some(known) = self.categories.get_category(category).await? else {
            return Ok(());
        };
        let mut progress = self.new_progress(user).await?;
        progress.update_score(&known, u32::from(correct), 1);
        self.progress.upsert_progress(&progress).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> ProgressService {
        ProgressService::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn new_progress_is_reused() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let user = UserId::new(1);

        let first = svc.new_progress(user).await.unwrap();
        assert_eq!(first.score(), "");
        assert!(repo.get_progress(user).await.unwrap().is_some());

        let again = svc.new_progress(user).await.unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn lists_every_category() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let user = UserId::new(1);
        repo.insert_category(&CategoryName::new("elderberries"))
            .await
            .unwrap();

        let scores = svc.list_all_cat_scores(user).await.unwrap();
        assert_eq!(scores.len(), 1);

        repo.insert_category(&CategoryName::new("cheese"))
            .await
            .unwrap();
        let scores = svc.list_all_cat_scores(user).await.unwrap();
        assert!(scores.contains_key(&CategoryName::new("cheese")));

        let stored = repo.get_progress(user).await.unwrap().unwrap();
        assert!(stored.score().contains("cheese"));
        assert!(stored.score().contains("elderberries"));
    }

    #[tokio::test]
    async fn check_cat_score_adds_known_categories_lazily() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let user = UserId::new(1);
        svc.new_progress(user).await.unwrap();
        repo.insert_category(&CategoryName::new("cheese"))
            .await
            .unwrap();

        let score = svc.check_cat_score(user, "cheese").await.unwrap();
        assert_eq!(score, CategoryScore::new(0, 0));
        let stored = repo.get_progress(user).await.unwrap().unwrap();
        assert!(stored.score().contains("cheese"));

        let err = svc.check_cat_score(user, "monkey").await.unwrap_err();
        assert!(err.to_string().contains("category does not exist"));
    }

    #[tokio::test]
    async fn update_score_validates_input() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let user = UserId::new(1);
        repo.insert_category(&CategoryName::new("elderberries"))
            .await
            .unwrap();

        svc.update_score(user, "elderberries", 1, 2).await.unwrap();
        svc.update_score_from_input(user, "elderberries", "3", "4")
            .await
            .unwrap();
        assert_eq!(
            svc.check_cat_score(user, "elderberries").await.unwrap(),
            CategoryScore::new(4, 6)
        );

        let err = svc
            .update_score(user, "monkey", 1, 1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("error"));

        let err = svc
            .update_score_from_input(user, "elderberries", "a", "1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Progress(ProgressError::InvalidScore { .. })
        ));
        assert_eq!(
            svc.check_cat_score(user, "elderberries").await.unwrap(),
            CategoryScore::new(4, 6)
        );
    }

    #[tokio::test]
    async fn record_answer_tracks_possible_and_correct() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let user = UserId::new(7);
        let cat = repo
            .insert_category(&CategoryName::new("elderberries"))
            .await
            .unwrap();

        svc.record_answer(user, cat.id(), true).await.unwrap();
        svc.record_answer(user, cat.id(), false).await.unwrap();
        svc.record_answer(user, CategoryId::new(99), true)
            .await
            .unwrap();

        assert_eq!(
            svc.check_cat_score(user, "elderberries").await.unwrap(),
            CategoryScore::new(1, 2)
        );
    }
}
