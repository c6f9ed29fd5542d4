use axum::http::{header, HeaderMap};

use crate::config::AuthConfig;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::Services;

/// Where a presented session token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `Authorization: Bearer <token>`
    Header,
    /// The session cookie
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Identity of the caller for one request. Built once per request and
/// handed to every resolver through the GraphQL request data.
#[derive(Debug, Clone, Default)]
pub struct RequestSession {
    caller: Option<User>,
}

impl RequestSession {
    pub const fn anonymous() -> Self {
        Self { caller: None }
    }

    pub fn signed_in(user: User) -> Self {
        Self { caller: Some(user) }
    }

    pub fn caller(&self) -> Option<&User> {
        self.caller.as_ref()
    }
}

/// A bearer header wins over the cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<PresentedToken> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(PresentedToken {
            token: token.to_string(),
            source: TokenSource::Header,
        });
    }

    get_cookie_value(headers, cookie_name)
        .filter(|t| !t.is_empty())
        .map(|token| PresentedToken {
            token: token.to_string(),
            source: TokenSource::Cookie,
        })
}

fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

/// Resolve the caller behind the request headers.
///
/// An invalid cookie degrades to an anonymous caller so stale long-lived
/// cookies do not lock the browser out. An invalid bearer header fails the
/// whole request, even when a valid cookie is also present.
pub async fn resolve_caller(services: &Services, headers: &HeaderMap) -> AppResult<Option<User>> {
    let Some(presented) = extract_token(headers, &services.config.auth.cookie_name) else {
        return Ok(None);
    };

    let claims = match services.tokens.verify(&presented.token) {
        Ok(claims) => claims,
        Err(_) if presented.source == TokenSource::Cookie => {
            tracing::debug!("Ignoring invalid session cookie");
            return Ok(None);
        }
        Err(_) => {
            return Err(AppError::Unauthenticated(
                "Invalid or expired token. Please login again".to_string(),
            ))
        }
    };

    Ok(services.users.find_by_id(&claims.id).await?)
}

pub fn session_cookie(config: &AuthConfig, token: &str, persistent: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=None; Path=/",
        config.cookie_name, token
    );
    if persistent {
        cookie.push_str(&format!(
            "; Max-Age={}",
            config.persistent_cookie_max_age_secs()
        ));
    }
    cookie
}

/// Attributes must match `session_cookie` or browsers keep the old cookie.
pub fn clear_session_cookie(config: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=None; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        config.cookie_name
    )
}

pub fn attach_session(
    ctx: &async_graphql::Context<'_>,
    config: &AuthConfig,
    token: &str,
    persistent: bool,
) {
    ctx.append_http_header("set-cookie", session_cookie(config, token, persistent));
}

pub fn detach_session(ctx: &async_graphql::Context<'_>, config: &AuthConfig) {
    ctx.append_http_header("set-cookie", clear_session_cookie(config));
}
