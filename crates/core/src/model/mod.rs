mod category;
mod ids;
mod progress;
mod question;
mod quiz;
mod sitting;
mod user;

pub use ids::{CategoryId, ParseIdError, QuestionId, QuizId, SittingId, UserId};

pub use category::{Category, CategoryName};
pub use progress::{CategoryScore, Progress, ProgressError, parse_score_delta};
pub use question::{Answer, Guess, Question, QuestionError, QuestionKind, QuestionRef};
pub use quiz::{Quiz, QuizError, QuizOptions};
pub use sitting::{QuestionSequence, Sitting, SittingError};
pub use user::{User, UserError};
