use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use quiz_core::model::{User, UserId};
use storage::repository::{StorageError, UserRepository};

use crate::Clock;
use crate::error::AuthError;

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Account registration and password login.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Create an account with an argon2-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyPassword` for a blank password.
    /// Returns `AuthError::UsernameTaken` if the username exists.
    /// Returns `AuthError::User` if the username is invalid.
    /// Returns `AuthError::Storage` if persistence fails.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        if self
            .users
            .find_user_by_username(username.trim())
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let user = User::new(
            UserId::new(0),
            username,
            email,
            hash_password(password)?,
            self.clock.now(),
        )?;
        let id = match self.users.insert_user(&user).await {
            Ok(id) => id,
            Err(StorageError::Conflict) => return Err(AuthError::UsernameTaken),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(user = %id, username = user.username(), "account registered");
        Ok(user.with_id(id))
    }

    /// Check a username and password pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user is unknown or the
    /// password does not match.
    /// Returns `AuthError::Storage` if repository access fails.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.users.find_user_by_username(username.trim()).await? else {
            tracing::warn!(username, "login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if verify_password(password, user.password_hash())? {
            Ok(user)
        } else {
            tracing::warn!(username, "login with wrong password");
            Err(AuthError::InvalidCredentials)
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` if repository access fails.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.get_user(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> AuthService {
        AuthService::new(
            Clock::fixed(fixed_now()),
            Arc::new(InMemoryRepository::new()),
        )
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let svc = service();
        let user = svc
            .register("jacob", "jacob@jacob.com", "top_secret")
            .await
            .unwrap();
        assert_ne!(user.password_hash(), "top_secret");
        assert!(user.password_hash().starts_with("$argon2"));
        assert_eq!(user.date_joined(), fixed_now());

        let logged_in = svc.authenticate("jacob", "top_secret").await.unwrap();
        assert_eq!(logged_in.id(), user.id());
        assert!(svc.get_user(user.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let svc = service();
        svc.register("jacob", "", "top_secret").await.unwrap();

        let wrong = svc.authenticate("jacob", "nope").await.unwrap_err();
        let unknown = svc.authenticate("esau", "top_secret").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn usernames_are_unique_and_passwords_required() {
        let svc = service();
        svc.register("jacob", "", "pw").await.unwrap();

        let dup = svc.register("jacob", "", "pw").await.unwrap_err();
        assert!(matches!(dup, AuthError::UsernameTaken));

        let empty = svc.register("esau", "", "").await.unwrap_err();
        assert!(matches!(empty, AuthError::EmptyPassword));

        let bad = svc.register("bad name", "", "pw").await.unwrap_err();
        assert!(matches!(bad, AuthError::User(_)));
    }
}
