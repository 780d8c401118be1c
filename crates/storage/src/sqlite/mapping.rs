use quiz_core::model::{
    Answer, Category, CategoryId, CategoryName, Progress, QuestionId, QuestionSequence, Quiz,
    QuizId, QuizOptions, Sitting, SittingId, User, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver failures, keeping unique violations distinguishable.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    i64::from(v)
}

pub(crate) fn category_id_from_i64(v: i64) -> Result<CategoryId, StorageError> {
    Ok(CategoryId::new(i64_to_u64("category_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn sitting_id_from_i64(v: i64) -> Result<SittingId, StorageError> {
    Ok(SittingId::new(i64_to_u64("sitting_id", v)?))
}

/// Serializes question ids as `1,2,3,`.
pub(crate) fn encode_id_list(ids: impl IntoIterator<Item = QuestionId>) -> String {
    let mut out = String::new();
    for id in ids {
        out.push_str(&id.to_string());
        out.push(',');
    }
    out
}

/// Parses the `1,2,3,` form back into ids. Empty fields are skipped.
pub(crate) fn decode_id_list(raw: &str) -> Result<Vec<QuestionId>, StorageError> {
    raw.split(',')
        .filter(|field| !field.trim().is_empty())
        .map(|field| field.parse::<QuestionId>().map_err(ser))
        .collect()
}

pub(crate) fn map_category_row(row: &SqliteRow) -> Result<Category, StorageError> {
    let id = category_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let name: String = row.try_get("name").map_err(ser)?;
    Ok(Category::new(id, CategoryName::new(&name)))
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let options = QuizOptions {
        random_order: row.try_get::<i64, _>("random_order").map_err(ser)? != 0,
        answers_at_end: row.try_get::<i64, _>("answers_at_end").map_err(ser)? != 0,
        exam_paper: row.try_get::<i64, _>("exam_paper").map_err(ser)? != 0,
    };
    let category = row
        .try_get::<Option<i64>, _>("category_id")
        .map_err(ser)?
        .map(category_id_from_i64)
        .transpose()?;
    let url: String = row.try_get("url").map_err(ser)?;

    Quiz::new(
        quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        &url,
        category,
        options,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    Answer::new(
        row.try_get::<String, _>("content").map_err(ser)?,
        row.try_get::<i64, _>("correct").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let username: String = row.try_get("username").map_err(ser)?;
    let email: String = row.try_get("email").map_err(ser)?;
    User::new(
        user_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        &username,
        &email,
        row.try_get::<String, _>("password_hash").map_err(ser)?,
        row.try_get("date_joined").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let user = user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?;
    let score: String = row.try_get("score").map_err(ser)?;
    Progress::from_persisted(user, &score).map_err(ser)
}

pub(crate) fn map_sitting_row(row: &SqliteRow) -> Result<Sitting, StorageError> {
    let pending = decode_id_list(&row.try_get::<String, _>("question_list").map_err(ser)?)?;
    let incorrect =
        decode_id_list(&row.try_get::<String, _>("incorrect_questions").map_err(ser)?)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let score = u32_from_i64(
        "current_score",
        row.try_get::<i64, _>("current_score").map_err(ser)?,
    )?;

    Sitting::from_persisted(
        sitting_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        QuestionSequence::from_persisted(pending, total, score, incorrect),
        row.try_get::<i64, _>("complete").map_err(ser)? != 0,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_use_trailing_commas() {
        let ids = [QuestionId::new(1), QuestionId::new(2)];
        assert_eq!(encode_id_list(ids), "1,2,");
        assert_eq!(encode_id_list(Vec::<QuestionId>::new()), "");
    }

    #[test]
    fn id_lists_decode_leniently() {
        assert_eq!(
            decode_id_list("1,2,").unwrap(),
            vec![QuestionId::new(1), QuestionId::new(2)]
        );
        assert_eq!(decode_id_list("3").unwrap(), vec![QuestionId::new(3)]);
        assert!(decode_id_list("").unwrap().is_empty());
        assert!(decode_id_list("1,x,").is_err());
    }
}
