use chrono::{Duration, Utc};

use crate::accounts::validation::{normalize_email, Validation};
use crate::auth::credentials::{
    derive_avatar, generate_reset_token, hash_password, hash_reset_token, verify_password,
};
use crate::config::RESET_TOKEN_TTL_MINUTES;
use crate::db::models::{NewUser, User};
use crate::error::{AppError, AppResult};
use crate::mailer::ResetEmail;
use crate::state::Services;

pub const RESET_SENT_MESSAGE: &str =
    "Your reset token is sent to email. Token is valid for only (10) minutes.";

const SIGN_IN_FAILED: &str = "Incorrect email or password.";
const INCORRECT_PASSWORD: &str = "Incorrect password.";
const RESET_TOKEN_INVALID: &str = "Reset token is invalid or has expired.";

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
    pub persistent: bool,
}

/// Account lifecycle: sign up/in, password reset, profile changes.
pub struct AccountService<'a> {
    services: &'a Services,
}

impl<'a> AccountService<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    fn start_session(&self, user: User, persistent: bool) -> AppResult<SignedIn> {
        let token = self.services.tokens.issue(&user.id, persistent)?;
        Ok(SignedIn {
            user,
            token,
            persistent,
        })
    }

    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
        rememberme: bool,
    ) -> AppResult<SignedIn> {
        Validation::new()
            .username(username)
            .email(email)
            .password(password)
            .finish()?;

        let email = normalize_email(email);
        let new_user = NewUser {
            id: uuid::Uuid::now_v7().to_string(),
            username: username.trim().to_string(),
            avatar: derive_avatar(&email),
            email,
            password_hash: hash_password(password)?,
        };

        let user = self.services.users.create(&new_user).await?;
        tracing::info!(user_id = %user.id, "Account created");

        self.start_session(user, rememberme)
    }

    pub async fn sign_in(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
        rememberme: bool,
    ) -> AppResult<SignedIn> {
        let username = username.map(str::trim).filter(|u| !u.is_empty());
        let email = email
            .map(normalize_email)
            .filter(|e| !e.is_empty());

        let user = self
            .services
            .users
            .find_by_login(username, email.as_deref())
            .await?
            .filter(|user| verify_password(password, &user.password_hash))
            .ok_or_else(|| AppError::AuthFailed(SIGN_IN_FAILED.to_string()))?;

        self.start_session(user, rememberme)
    }

    /// Always answers with the same message unless delivery fails, so callers
    /// cannot tell which emails have accounts.
    ///
    /// The token is reserved before the email goes out, so concurrent requests
    /// send at most one link. A failed delivery releases the reservation.
    pub async fn forgot_password(&self, email: &str) -> AppResult<String> {
        let email = normalize_email(email);
        let config = &self.services.config;
        let now = Utc::now();

        let user = self.services.users.find_by_email(&email).await?;
        let user = match user {
            Some(user) if !user.has_pending_reset(now) => user,
            _ => {
                tokio::time::sleep(config.email.timeout()).await;
                return Ok(RESET_SENT_MESSAGE.to_string());
            }
        };

        let reset_token = generate_reset_token();
        let token_hash = hash_reset_token(&reset_token);
        let expires_at = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        let reserved = self
            .services
            .users
            .store_reset_token(
                &user.id,
                &token_hash,
                expires_at.timestamp_millis(),
                now.timestamp_millis(),
            )
            .await?;
        if !reserved {
            tracing::debug!(user_id = %user.id, "Concurrent reset request already holds a token");
            tokio::time::sleep(config.email.timeout()).await;
            return Ok(RESET_SENT_MESSAGE.to_string());
        }

        let message = ResetEmail::new(
            &config.email,
            &config.server.client_uri,
            &user.username,
            &user.email,
            &reset_token,
        );

        let (sent, ()) = tokio::join!(
            self.services.mailer.send(&message),
            tokio::time::sleep(config.email.timeout()),
        );

        let failure = match sent {
            Ok(message_id) if !message_id.is_empty() => {
                tracing::info!(user_id = %user.id, message_id = %message_id, "Reset email sent");
                return Ok(RESET_SENT_MESSAGE.to_string());
            }
            Ok(_) => "mailer accepted the message without a message id".to_string(),
            Err(e) => format!("{:#}", e),
        };

        tracing::warn!(user_id = %user.id, "Failed to send reset email: {}", failure);
        self.services
            .users
            .clear_reset_token(&user.id, &token_hash)
            .await?;
        Err(AppError::Internal(
            "Problem sending the email! Try again later.".to_string(),
        ))
    }

    pub async fn reset_password(&self, reset_token: &str, password: &str) -> AppResult<SignedIn> {
        let token_hash = hash_reset_token(reset_token);
        let now_ms = Utc::now().timestamp_millis();

        let user = self
            .services
            .users
            .find_by_reset_token(&token_hash, now_ms)
            .await?
            .ok_or_else(|| AppError::BadRequest(RESET_TOKEN_INVALID.to_string()))?;

        Validation::new().password(password).finish()?;

        let user = self
            .services
            .users
            .consume_reset_token(&user.id, &token_hash, &hash_password(password)?, now_ms)
            .await?
            .ok_or_else(|| AppError::BadRequest(RESET_TOKEN_INVALID.to_string()))?;

        tracing::info!(user_id = %user.id, "Password reset");
        self.start_session(user, false)
    }

    pub async fn update_email(&self, caller: &User, email: &str) -> AppResult<User> {
        let normalized = normalize_email(email);
        if normalized.is_empty() || normalized == caller.email {
            return Err(AppError::BadRequest(
                "Please provide a new email to update.".to_string(),
            ));
        }

        Validation::new().email(&normalized).finish()?;

        let avatar = derive_avatar(&normalized);
        Ok(self
            .services
            .users
            .update_email(&caller.id, &normalized, &avatar)
            .await?)
    }

    pub async fn update_password(
        &self,
        caller: &User,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<User> {
        if !verify_password(current_password, &caller.password_hash) {
            return Err(AppError::AuthFailed(INCORRECT_PASSWORD.to_string()));
        }

        Validation::new().password(new_password).finish()?;

        Ok(self
            .services
            .users
            .update_password(&caller.id, &hash_password(new_password)?)
            .await?)
    }

    /// Soft delete. Existing sessions stop resolving once the account is gone.
    pub async fn delete_account(&self, caller: &User, password: &str) -> AppResult<String> {
        if !verify_password(password, &caller.password_hash) {
            return Err(AppError::AuthFailed(INCORRECT_PASSWORD.to_string()));
        }

        self.services.users.soft_delete(&caller.id).await?;
        tracing::info!(user_id = %caller.id, "Account deleted");

        Ok(caller.id.clone())
    }
}
