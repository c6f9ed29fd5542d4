use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use rand::RngCore;
use tracing_subscriber::EnvFilter;

use postwall::auth::TokenService;
use postwall::config::{Cli, Config};
use postwall::db;
use postwall::mailer::{LogMailer, Mailer, WebhookMailer};
use postwall::state::{AppState, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let secret = match config.auth.jwt_secret.clone() {
        Some(secret) if !secret.is_empty() => secret.into_bytes(),
        _ => {
            tracing::warn!(
                "POSTWALL_JWT_SECRET is not set; using a random secret, sessions will not survive a restart"
            );
            let mut secret = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut secret);
            secret
        }
    };
    let tokens = TokenService::new(
        &secret,
        config.auth.session_ttl(),
        config.auth.persistent_ttl(),
    );

    let mailer: Arc<dyn Mailer> = match config.email.webhook_url.clone() {
        Some(url) => {
            tracing::info!("Sending reset emails through {}", url);
            Arc::new(WebhookMailer::new(url, config.email.relay_timeout())?)
        }
        None => {
            tracing::warn!(
                "No mail relay configured; reset links are written to the log at debug level"
            );
            Arc::new(LogMailer)
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Build app state
    let state = AppState::new(Services::new(pool, tokens, mailer, config));
    let app = postwall::app(state);

    // Start server
    tracing::info!("Listening on http://{}/api", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
