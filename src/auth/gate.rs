//! Per-operation authorization checks. Each caller supplies its own message.

use crate::auth::session::RequestSession;
use crate::db::models::User;
use crate::error::{AppError, AppResult};

pub fn require_authenticated<'a>(session: &'a RequestSession, message: &str) -> AppResult<&'a User> {
    session
        .caller()
        .ok_or_else(|| AppError::Unauthenticated(message.to_string()))
}

pub fn require_ownership(author_id: &str, caller_id: &str, message: &str) -> AppResult<()> {
    if author_id == caller_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(message.to_string()))
    }
}
