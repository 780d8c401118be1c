#![forbid(unsafe_code)]

//! HTTP front end: warp filters, maud templates and cookie sessions over
//! the quiz services.

pub mod handlers;
pub mod names;
pub mod rejections;
pub mod routes;
pub mod session;
pub mod views;

use services::AppServices;

pub use routes::routes;
pub use session::{SessionData, SessionStore};

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub sessions: SessionStore,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self {
            services,
            sessions: SessionStore::new(),
        }
    }
}
