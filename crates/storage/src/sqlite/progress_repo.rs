use quiz_core::model::{Progress, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(&self, user: UserId) -> Result<Option<Progress>, StorageError> {
        let row = sqlx::query("SELECT user_id, score FROM progress WHERE user_id = ?1")
            .bind(id_to_i64("user_id", user.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (user_id, score)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET score = excluded.score
            ",
        )
        .bind(id_to_i64("user_id", progress.user_id().value())?)
        .bind(progress.score())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
