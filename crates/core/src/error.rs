use thiserror::Error;

use crate::model::{ProgressError, QuestionError, QuizError, SittingError, UserError};

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Sitting(#[from] SittingError),
    #[error(transparent)]
    User(#[from] UserError),
}
