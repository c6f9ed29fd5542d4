use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Reset tokens are valid for ten minutes; not configurable.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Parser, Debug)]
#[command(name = "postwall", about = "A social post server with a GraphQL API")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origin allowed to call the API with credentials
    pub client_uri: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub jwt_secret: Option<String>,
    pub session_token_hours: u64,
    pub persistent_token_days: u64,
    pub persistent_cookie_days: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EmailConfig {
    pub app_name: String,
    pub from: String,
    /// Minimum time a forgot-password request takes, sent or not
    pub timeout_ms: u64,
    /// JSON relay endpoint; reset links are only logged when unset
    pub webhook_url: Option<String>,
    /// Upper bound on a single relay request
    pub relay_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            client_uri: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "jwt".to_string(),
            jwt_secret: None,
            session_token_hours: 12,
            persistent_token_days: 30,
            persistent_cookie_days: 30,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("cookie_name", &self.cookie_name)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[hidden]"))
            .field("session_token_hours", &self.session_token_hours)
            .field("persistent_token_days", &self.persistent_token_days)
            .field("persistent_cookie_days", &self.persistent_cookie_days)
            .finish()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            app_name: "Postwall".to_string(),
            from: "no-reply@postwall.local".to_string(),
            timeout_ms: 3000,
            webhook_url: None,
            relay_timeout_secs: 10,
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_token_hours as i64)
    }

    pub fn persistent_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.persistent_token_days as i64)
    }

    pub fn persistent_cookie_max_age_secs(&self) -> u64 {
        self.persistent_cookie_days * 24 * 3600
    }
}

impl EmailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("postwall.db"));
        }

        Ok(config)
    }

    /// Apply `POSTWALL_*` overrides. The lookup is injected so tests do not
    /// have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("POSTWALL_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(v) = lookup("POSTWALL_SESSION_TOKEN_HOURS") {
            self.auth.session_token_hours = v.parse()?;
        }
        if let Some(v) = lookup("POSTWALL_PERSISTENT_TOKEN_DAYS") {
            self.auth.persistent_token_days = v.parse()?;
        }
        if let Some(v) = lookup("POSTWALL_PERSISTENT_COOKIE_DAYS") {
            self.auth.persistent_cookie_days = v.parse()?;
        }
        if let Some(v) = lookup("POSTWALL_EMAIL_TIMEOUT_MS") {
            self.email.timeout_ms = v.parse()?;
        }
        if let Some(v) = lookup("POSTWALL_EMAIL_WEBHOOK_URL") {
            self.email.webhook_url = Some(v);
        }
        if let Some(v) = lookup("POSTWALL_EMAIL_RELAY_TIMEOUT_SECS") {
            self.email.relay_timeout_secs = v.parse()?;
        }
        if let Some(v) = lookup("POSTWALL_CLIENT_URI") {
            self.server.client_uri = v;
        }
        if let Some(v) = lookup("POSTWALL_PORT") {
            self.server.port = v.parse()?;
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".postwall"))
                .unwrap_or_else(|| PathBuf::from(".postwall"))
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("postwall.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cli(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.cookie_name, "jwt");
        assert_eq!(config.auth.session_token_hours, 12);
        assert_eq!(config.auth.persistent_token_days, 30);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.email.timeout_ms, 3000);
        assert_eq!(config.email.relay_timeout_secs, 10);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(PathBuf::from("/tmp/test-postwall"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-postwall"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.db_path(), tmp.path().join("postwall.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000
client_uri = "https://app.example.com"

[auth]
cookie_name = "session"
jwt_secret = "from-file"
session_token_hours = 2

[email]
timeout_ms = 50
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.client_uri, "https://app.example.com");
        assert_eq!(config.auth.cookie_name, "session");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-file"));
        assert_eq!(config.auth.session_token_hours, 2);
        assert_eq!(config.auth.persistent_token_days, 30);
        assert_eq!(config.email.timeout(), Duration::from_millis(50));
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[server]\nhost = \"192.168.1.1\"\nport = 9000\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4001),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4001);
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("POSTWALL_JWT_SECRET", "s3cret"),
            ("POSTWALL_SESSION_TOKEN_HOURS", "1"),
            ("POSTWALL_PERSISTENT_TOKEN_DAYS", "7"),
            ("POSTWALL_PERSISTENT_COOKIE_DAYS", "7"),
            ("POSTWALL_EMAIL_TIMEOUT_MS", "10"),
            ("POSTWALL_EMAIL_RELAY_TIMEOUT_SECS", "4"),
            ("POSTWALL_CLIENT_URI", "https://client.example"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.session_ttl(), chrono::Duration::hours(1));
        assert_eq!(config.auth.persistent_ttl(), chrono::Duration::days(7));
        assert_eq!(config.auth.persistent_cookie_max_age_secs(), 7 * 24 * 3600);
        assert_eq!(config.email.timeout_ms, 10);
        assert_eq!(config.email.relay_timeout(), Duration::from_secs(4));
        assert_eq!(config.server.client_uri, "https://client.example");
    }

    #[test]
    fn env_override_rejects_garbage_numbers() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "POSTWALL_SESSION_TOKEN_HOURS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("super-secret".into());
        let out = format!("{:?}", config);
        assert!(!out.contains("super-secret"));
    }
}
