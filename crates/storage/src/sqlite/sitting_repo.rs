use quiz_core::model::{QuizId, Sitting, SittingId, UserId};

use super::SqliteRepository;
use super::mapping::{
    bool_to_i64, db_err, encode_id_list, id_to_i64, map_sitting_row, sitting_id_from_i64,
};
use crate::repository::{SittingRepository, StorageError};

const SITTING_COLUMNS: &str = "id, user_id, quiz_id, question_list, total_questions, \
     current_score, incorrect_questions, complete, started_at, completed_at";

#[async_trait::async_trait]
impl SittingRepository for SqliteRepository {
    async fn insert_sitting(&self, sitting: &Sitting) -> Result<SittingId, StorageError> {
        let sequence = sitting.sequence();
        let res = sqlx::query(
            r"
            INSERT INTO sittings (
                user_id, quiz_id, question_list, total_questions, current_score,
                incorrect_questions, complete, started_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(id_to_i64("user_id", sitting.user_id().value())?)
        .bind(id_to_i64("quiz_id", sitting.quiz_id().value())?)
        .bind(encode_id_list(sequence.pending()))
        .bind(i64::from(sequence.total()))
        .bind(i64::from(sequence.current_score()))
        .bind(encode_id_list(sequence.incorrect_questions().iter().copied()))
        .bind(bool_to_i64(sitting.is_complete()))
        .bind(sitting.started_at())
        .bind(sitting.completed_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sitting_id_from_i64(res.last_insert_rowid())
    }

    async fn get_sitting(&self, id: SittingId) -> Result<Option<Sitting>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SITTING_COLUMNS} FROM sittings WHERE id = ?1"
        ))
        .bind(id_to_i64("sitting_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_sitting_row).transpose()
    }

    async fn find_open_sitting(
        &self,
        user: UserId,
        quiz: QuizId,
    ) -> Result<Option<Sitting>, StorageError> {
        let row = sqlx::query(&format!(
            r"
            SELECT {SITTING_COLUMNS} FROM sittings
            WHERE user_id = ?1 AND quiz_id = ?2 AND complete = 0
            ORDER BY id DESC
            LIMIT 1
            "
        ))
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("quiz_id", quiz.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_sitting_row).transpose()
    }

    async fn update_sitting(&self, sitting: &Sitting) -> Result<(), StorageError> {
        let sequence = sitting.sequence();
        let res = sqlx::query(
            r"
            UPDATE sittings SET
                question_list = ?2,
                total_questions = ?3,
                current_score = ?4,
                incorrect_questions = ?5,
                complete = ?6,
                completed_at = ?7
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("sitting_id", sitting.id().value())?)
        .bind(encode_id_list(sequence.pending()))
        .bind(i64::from(sequence.total()))
        .bind(i64::from(sequence.current_score()))
        .bind(encode_id_list(sequence.incorrect_questions().iter().copied()))
        .bind(bool_to_i64(sitting.is_complete()))
        .bind(sitting.completed_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_sitting(&self, id: SittingId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM sittings WHERE id = ?1")
            .bind(id_to_i64("sitting_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
