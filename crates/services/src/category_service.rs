use std::sync::Arc;

use quiz_core::model::{Category, CategoryName};
use storage::repository::{CategoryRepository, StorageError};

use crate::error::CategoryServiceError;

/// Creates and looks up categories by their normalized name.
#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    #[must_use]
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    /// Normalize `raw` and return the matching category, creating it when
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `CategoryServiceError::EmptyName` if nothing remains after
    /// normalization.
    /// Returns `CategoryServiceError::Storage` if persistence fails.
    pub async fn new_category(&self, raw: &str) -> Result<Category, CategoryServiceError> {
        let name = CategoryName::new(raw);
        if name.as_str().is_empty() {
            return Err(CategoryServiceError::EmptyName);
        }

        if let Some(existing) = self.categories.find_category(&name).await? {
            return Ok(existing);
        }

        match self.categories.insert_category(&name).await {
            Ok(category) => {
                tracing::info!(category = %category.name(), "category created");
                Ok(category)
            }
            // Lost a race with a concurrent insert of the same name.
            Err(StorageError::Conflict) => self
                .categories
                .find_category(&name)
                .await?
                .ok_or(CategoryServiceError::Storage(StorageError::NotFound)),
            Err(e) => Err(e.into()),
        }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `CategoryServiceError::Storage` if repository access fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.categories.list_categories().await?)
    }

    /// Find a category by name, normalizing the lookup key first.
    ///
    /// # Errors
    ///
    /// Returns `CategoryServiceError::Storage` if repository access fails.
    pub async fn find_category(
        &self,
        raw: &str,
    ) -> Result<Option<Category>, CategoryServiceError> {
        Ok(self
            .categories
            .find_category(&CategoryName::new(raw))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    fn service() -> CategoryService {
        CategoryService::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn new_category_normalizes_whitespace() {
        let svc = service();
        let black = svc.new_category("black  berries").await.unwrap();
        assert_eq!(black.name().as_str(), "black-berries");

        let straw = svc.new_category("straw.berries").await.unwrap();
        assert_eq!(straw.name().as_str(), "straw.berries");
    }

    #[tokio::test]
    async fn new_category_returns_existing_entry() {
        let svc = service();
        let first = svc.new_category("elderberries").await.unwrap();
        let again = svc.new_category("  elderberries ").await.unwrap();
        assert_eq!(first, again);
        assert_eq!(svc.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let err = service().new_category("   ").await.unwrap_err();
        assert!(matches!(err, CategoryServiceError::EmptyName));
    }

    #[tokio::test]
    async fn find_category_uses_normalized_key() {
        let svc = service();
        svc.new_category("black berries").await.unwrap();
        assert!(svc.find_category("black berries").await.unwrap().is_some());
        assert!(svc.find_category("black-berries").await.unwrap().is_some());
        assert!(svc.find_category("monkey").await.unwrap().is_none());
    }
}
