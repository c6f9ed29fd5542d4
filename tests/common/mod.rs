#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use postwall::auth::{RequestSession, TokenService};
use postwall::config::Config;
use postwall::db;
use postwall::db::models::User;
use postwall::graphql::AppSchema;
use postwall::mailer::{Mailer, ResetEmail};
use postwall::state::{AppState, Services};

pub const PASSWORD: &str = "pass1234";

/// Captures reset emails instead of delivering them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<ResetEmail>>,
}

impl RecordingMailer {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Token from the reset link in the most recent email.
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let text = &sent.last()?.text;
        let start = text.find("/reset-password/")? + "/reset-password/".len();
        Some(
            text[start..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect(),
        )
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &ResetEmail) -> anyhow::Result<String> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(uuid::Uuid::now_v7().to_string())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &ResetEmail) -> anyhow::Result<String> {
        anyhow::bail!("relay unavailable")
    }
}

/// Relay that accepts the message but returns no id.
pub struct SilentMailer;

#[async_trait]
impl Mailer for SilentMailer {
    async fn send(&self, _email: &ResetEmail) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

pub struct TestApp {
    _tmp: TempDir,
    pub services: Services,
    pub schema: AppSchema,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        Self::build(mailer.clone(), mailer, 0)
    }

    pub fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        Self::build(mailer, Arc::new(RecordingMailer::default()), 0)
    }

    /// Recording mailer with a real response floor on `forgotPassword`.
    pub fn with_email_timeout(timeout_ms: u64) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        Self::build(mailer.clone(), mailer, timeout_ms)
    }

    fn build(mailer: Arc<dyn Mailer>, recording: Arc<RecordingMailer>, timeout_ms: u64) -> Self {
        let tmp = TempDir::new().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let mut config = Config::default();
        config.email.timeout_ms = timeout_ms;
        config.database.path = Some(tmp.path().join("test.db"));

        let tokens = TokenService::new(
            b"test-secret",
            config.auth.session_ttl(),
            config.auth.persistent_ttl(),
        );
        let services = Services::new(pool, tokens, mailer, config);
        let state = AppState::new(services.clone());

        Self {
            _tmp: tmp,
            schema: state.graphql_schema.clone(),
            services,
            state,
            mailer: recording,
        }
    }

    pub async fn execute(&self, query: &str, session: RequestSession) -> async_graphql::Response {
        self.schema
            .execute(async_graphql::Request::new(query).data(session))
            .await
    }

    pub async fn anonymous(&self, query: &str) -> async_graphql::Response {
        self.execute(query, RequestSession::anonymous()).await
    }

    /// Run as `user_id`, re-reading the account the way each HTTP request does.
    pub async fn as_user(&self, user_id: &str, query: &str) -> async_graphql::Response {
        let user = self.user(user_id).await.expect("user should be active");
        self.execute(query, RequestSession::signed_in(user)).await
    }

    pub async fn user(&self, user_id: &str) -> Option<User> {
        self.services.users.find_by_id(user_id).await.unwrap()
    }

    /// Sign up through the API and return the new user's id.
    pub async fn sign_up(&self, username: &str, email: &str) -> String {
        let response = self
            .anonymous(&format!(
                r#"mutation {{ signUp(username: "{}", email: "{}", password: "{}") {{ id }} }}"#,
                username, email, PASSWORD
            ))
            .await;
        assert!(response.errors.is_empty(), "signUp failed: {:?}", response.errors);
        data(&response)["signUp"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_post(&self, user_id: &str, content: &str) -> String {
        let response = self
            .as_user(
                user_id,
                &format!(r#"mutation {{ createPost(content: "{}") {{ id }} }}"#, content),
            )
            .await;
        assert!(response.errors.is_empty(), "createPost failed: {:?}", response.errors);
        data(&response)["createPost"]["id"].as_str().unwrap().to_string()
    }
}

pub fn data(response: &async_graphql::Response) -> serde_json::Value {
    response.data.clone().into_json().unwrap()
}

/// `(code, message)` of the first error.
pub fn first_error(response: &async_graphql::Response) -> (String, String) {
    let value = serde_json::to_value(response).unwrap();
    let error = &value["errors"][0];
    (
        error["extensions"]["code"].as_str().unwrap_or_default().to_string(),
        error["message"].as_str().unwrap_or_default().to_string(),
    )
}

pub fn set_cookies(response: &async_graphql::Response) -> Vec<String> {
    response
        .http_headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}
