//! Account registration and credential checks.

use std::sync::Arc;

use crate::domain::User;
use crate::error::{DomainError, RepoError};
use crate::ports::{AuthError, PasswordService, UserRepository};
use crate::posts::FieldErrors;

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;

/// Signup input.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= USERNAME_MAX_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, passwords: Arc<dyn PasswordService>) -> Self {
        Self { users, passwords }
    }

    pub async fn register(&self, form: &Registration) -> Result<User, DomainError> {
        let mut errors = FieldErrors::default();
        let username = form.username.trim();

        if !valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if self.users.find_by_username(username).await?.is_some() {
            errors.add("username", "A user with that username already exists.");
        }
        if !form.email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }
        if form.password.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password",
                "This password is too short. It must contain at least 8 characters.",
            );
        }
        errors.into_result()?;

        let hash = self
            .passwords
            .hash(&form.password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let user = User::new(username.to_string(), form.email.trim().to_string(), hash);

        match self.users.insert(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "User registered");
                Ok(user)
            }
            // Lost a race with a concurrent signup for the same name.
            Err(RepoError::Constraint(_)) => {
                let mut errors = FieldErrors::default();
                errors.add("username", "A user with that username already exists.");
                Err(DomainError::InvalidForm(errors))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by username and check the password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "User lookup failed during login");
                AuthError::InvalidCredentials
            })?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash)? {
            tracing::debug!(username = %user.username, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
