use quiz_core::model::{CategoryId, Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, db_err, id_to_i64, map_quiz_row, quiz_id_from_i64};
use crate::repository::{QuizRepository, StorageError};

const QUIZ_COLUMNS: &str =
    "id, title, description, url, category_id, random_order, answers_at_end, exam_paper";

fn category_param(category: Option<CategoryId>) -> Result<Option<i64>, StorageError> {
    category
        .map(|c| id_to_i64("category_id", c.value()))
        .transpose()
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quizzes (title, description, url, category_id, random_order, answers_at_end, exam_paper)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(quiz.url())
        .bind(category_param(quiz.category())?)
        .bind(bool_to_i64(quiz.random_order()))
        .bind(bool_to_i64(quiz.answers_at_end()))
        .bind(bool_to_i64(quiz.exam_paper()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        quiz_id_from_i64(res.last_insert_rowid())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"))
            .bind(id_to_i64("quiz_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn find_quiz_by_url(&self, url: &str) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE url = ?1"))
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes(&self, category: Option<CategoryId>) -> Result<Vec<Quiz>, StorageError> {
        let rows = match category_param(category)? {
            Some(category_id) => {
                sqlx::query(&format!(
                    "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE category_id = ?1 ORDER BY id ASC"
                ))
                .bind(category_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes ORDER BY id ASC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(map_quiz_row).collect()
    }
}
