//! Outbound mail delivery for password reset links.
//!
//! Delivery is a collaborator: the account flow only needs to know whether a
//! message was accepted. `LogMailer` writes the link to the log and is the
//! default; `WebhookMailer` hands the message to an HTTP mail relay.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{EmailConfig, RESET_TOKEN_TTL_MINUTES};

/// A password reset message, before transport.
#[derive(Debug, Clone, Serialize)]
pub struct ResetEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl ResetEmail {
    pub fn new(
        config: &EmailConfig,
        client_uri: &str,
        username: &str,
        email: &str,
        reset_token: &str,
    ) -> Self {
        let url = format!(
            "{}/reset-password/{}",
            client_uri.trim_end_matches('/'),
            reset_token
        );
        let text = format!(
            "Hi {username},\n\n\
             Forgot your password?\n\n\
             If you requested a password reset, use the link below to complete the process. \
             If you didn't make this request, ignore this email. \
             The token is valid for only ({ttl}) minutes.\n\n\
             Reset your password: {url}\n\n\
             (c) {app}.",
            ttl = RESET_TOKEN_TTL_MINUTES,
            app = config.app_name,
        );

        Self {
            from: format!("{} <{}>", config.app_name, config.from),
            to: format!("{} <{}>", username, email),
            subject: "Your password reset token".to_string(),
            text,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the message and return the transport's message id.
    async fn send(&self, email: &ResetEmail) -> anyhow::Result<String>;
}

/// Logs messages instead of sending them.
///
/// The body carries a live reset link, so it only goes out at debug level.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &ResetEmail) -> anyhow::Result<String> {
        let message_id = uuid::Uuid::now_v7().to_string();
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Mail delivery not configured, message logged at debug level"
        );
        tracing::debug!(message_id = %message_id, "Message body:\n{}", email.text);
        Ok(message_id)
    }
}

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(rename = "messageId", alias = "message_id", default)]
    message_id: Option<String>,
}

/// Posts messages as JSON to a mail relay endpoint.
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    /// `timeout` bounds the whole relay exchange, connect through body.
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: &ResetEmail) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(email)
            .send()
            .await?
            .error_for_status()?;

        let body: RelayResponse = response.json().await?;
        body.message_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Mail relay returned no message id"))
    }
}
