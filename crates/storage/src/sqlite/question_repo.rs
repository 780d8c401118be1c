use quiz_core::model::{Question, QuestionId, QuestionKind, QuizId};
use sqlx::Row;
use sqlx::Sqlite;

use super::SqliteRepository;
use super::mapping::{
    bool_to_i64, category_id_from_i64, db_err, id_to_i64, map_answer_row, question_id_from_i64,
    quiz_id_from_i64, ser,
};
use crate::repository::{QuestionRepository, StorageError};

fn tf_correct(question: &Question) -> Option<i64> {
    match question.kind() {
        QuestionKind::TrueFalse { correct } => Some(bool_to_i64(*correct)),
        QuestionKind::MultipleChoice { .. } => None,
    }
}

/// Writes the answers and quiz links of a question inside a transaction.
async fn write_children(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    question_id: i64,
    question: &Question,
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM answers WHERE question_id = ?1")
        .bind(question_id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    for (position, answer) in question.answers().iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| StorageError::Serialization("answer position overflow".into()))?;
        sqlx::query(
            r"
            INSERT INTO answers (question_id, position, content, correct)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(question_id)
        .bind(position)
        .bind(answer.content())
        .bind(bool_to_i64(answer.is_correct()))
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    }

    sqlx::query("DELETE FROM question_quizzes WHERE question_id = ?1")
        .bind(question_id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    for quiz in question.quizzes() {
        sqlx::query("INSERT INTO question_quizzes (question_id, quiz_id) VALUES (?1, ?2)")
            .bind(question_id)
            .bind(id_to_i64("quiz_id", quiz.value())?)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }

    Ok(())
}

impl SqliteRepository {
    async fn load_question(&self, id: i64) -> Result<Option<Question>, StorageError> {
        let Some(row) = sqlx::query(
            r"
            SELECT id, kind, content, explanation, category_id, tf_correct
            FROM questions WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        else {
            return Ok(None);
        };

        let kind_label: String = row.try_get("kind").map_err(ser)?;
        let kind = match kind_label.as_str() {
            "true_false" => QuestionKind::TrueFalse {
                correct: row
                    .try_get::<Option<i64>, _>("tf_correct")
                    .map_err(ser)?
                    .ok_or_else(|| StorageError::Serialization("missing tf_correct".into()))?
                    != 0,
            },
            "multiple_choice" => {
                let answer_rows = sqlx::query(
                    r"
                    SELECT content, correct FROM answers
                    WHERE question_id = ?1
                    ORDER BY position ASC
                    ",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
                let answers = answer_rows
                    .iter()
                    .map(map_answer_row)
                    .collect::<Result<Vec<_>, _>>()?;
                QuestionKind::MultipleChoice { answers }
            }
            other => {
                return Err(StorageError::Serialization(format!(
                    "invalid question kind: {other}"
                )));
            }
        };

        let category = row
            .try_get::<Option<i64>, _>("category_id")
            .map_err(ser)?
            .map(category_id_from_i64)
            .transpose()?;

        let mut question = Question::new(
            question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            row.try_get::<String, _>("content").map_err(ser)?,
            row.try_get::<Option<String>, _>("explanation").map_err(ser)?,
            category,
            kind,
        )
        .map_err(ser)?;

        let links = sqlx::query("SELECT quiz_id FROM question_quizzes WHERE question_id = ?1")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        for link in links {
            question.add_to_quiz(quiz_id_from_i64(
                link.try_get::<i64, _>("quiz_id").map_err(ser)?,
            )?);
        }

        Ok(Some(question))
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(&self, question: &Question) -> Result<QuestionId, StorageError> {
        let category = question
            .category()
            .map(|c| id_to_i64("category_id", c.value()))
            .transpose()?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let res = sqlx::query(
            r"
            INSERT INTO questions (kind, content, explanation, category_id, tf_correct)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(question.kind().label())
        .bind(question.content())
        .bind(question.explanation())
        .bind(category)
        .bind(tf_correct(question))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let id = res.last_insert_rowid();
        write_children(&mut tx, id, question).await?;
        tx.commit().await.map_err(db_err)?;

        question_id_from_i64(id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        self.load_question(id_to_i64("question_id", id.value())?)
            .await
    }

    async fn list_questions_for_quiz(&self, quiz: QuizId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id FROM question_quizzes
            WHERE quiz_id = ?1
            ORDER BY question_id ASC
            ",
        )
        .bind(id_to_i64("quiz_id", quiz.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("question_id").map_err(ser)?;
            if let Some(question) = self.load_question(id).await? {
                questions.push(question);
            }
        }
        Ok(questions)
    }
}
