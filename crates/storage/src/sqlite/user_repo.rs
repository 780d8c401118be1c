use quiz_core::model::{User, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_user_row, user_id_from_i64};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: &User) -> Result<UserId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (username, email, password_hash, date_joined)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.date_joined())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        user_id_from_i64(res.last_insert_rowid())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, date_joined FROM users WHERE id = ?1",
        )
        .bind(id_to_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, date_joined FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_user_row).transpose()
    }
}
