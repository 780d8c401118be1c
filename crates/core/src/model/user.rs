use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("username may only contain letters, digits and @.+-_")]
    InvalidUsername,

    #[error("password hash cannot be empty")]
    MissingPasswordHash,
}

/// A registered account. Password verification lives in the services layer;
/// the model only carries the stored hash.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    date_joined: DateTime<Utc>,
}

impl User {
    /// # Errors
    ///
    /// Returns `UserError` if the username is blank or contains unsupported
    /// characters, or if no password hash is given.
    pub fn new(
        id: UserId,
        username: &str,
        email: &str,
        password_hash: String,
        date_joined: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UserError::EmptyUsername);
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            return Err(UserError::InvalidUsername);
        }
        if password_hash.is_empty() {
            return Err(UserError::MissingPasswordHash);
        }

        Ok(Self {
            id,
            username: username.to_owned(),
            email: email.trim().to_owned(),
            password_hash,
            date_joined,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn date_joined(&self) -> DateTime<Utc> {
        self.date_joined
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("date_joined", &self.date_joined)
            .finish_non_exhaustive()
    }
}
