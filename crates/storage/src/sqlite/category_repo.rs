use quiz_core::model::{Category, CategoryId, CategoryName};

use super::SqliteRepository;
use super::mapping::{category_id_from_i64, db_err, id_to_i64, map_category_row};
use crate::repository::{CategoryRepository, StorageError};

#[async_trait::async_trait]
impl CategoryRepository for SqliteRepository {
    async fn insert_category(&self, name: &CategoryName) -> Result<Category, StorageError> {
        let res = sqlx::query("INSERT INTO categories (name) VALUES (?1)")
            .bind(name.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let id = category_id_from_i64(res.last_insert_rowid())?;
        Ok(Category::new(id, name.clone()))
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StorageError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?1")
            .bind(id_to_i64("category_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_category_row).transpose()
    }

    async fn find_category(
        &self,
        name: &CategoryName,
    ) -> Result<Option<Category>, StorageError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE name = ?1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_category_row).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_category_row).collect()
    }
}
