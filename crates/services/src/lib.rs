#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod category_service;
pub mod error;
pub mod progress_service;
pub mod quiz_service;
pub mod sitting_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use auth_service::AuthService;
pub use category_service::CategoryService;
pub use error::{
    AppServicesError, AuthError, CategoryServiceError, ProgressServiceError, QuizServiceError,
    SittingServiceError,
};
pub use progress_service::ProgressService;
pub use quiz_service::QuizService;
pub use sitting_service::{AnswerFeedback, SittingService};
