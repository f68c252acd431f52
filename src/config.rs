use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub storage: StorageConfig,

    pub scheduler: SchedulerConfig,

    pub mail: MailConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/smartasset.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    /// `*` allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key used to sign access tokens.
    pub jwt_secret: String,

    pub token_ttl_hours: u64,

    /// Exposes `POST /api/auth/register`; registrants are always TECH.
    pub allow_self_registration: bool,
}

/// Built-in signing key. Only suitable for local development.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";

impl AuthConfig {
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 12,
            allow_self_registration: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: String,

    pub qr_dir: String,

    /// Prefix for absolute file links; empty means links are host-relative.
    pub public_base_url: String,

    /// Scheme of the deep link encoded in asset QR codes.
    pub qr_scheme: String,

    pub max_upload_bytes: usize,

    pub allowed_upload_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            qr_dir: "static/qr_codes".to_string(),
            public_base_url: String::new(),
            qr_scheme: "smartasset".to_string(),
            max_upload_bytes: 2 * 1024 * 1024,
            allowed_upload_extensions: ["png", "jpg", "jpeg", "pdf"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl StorageConfig {
    /// `public_base_url` without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Six-field cron expression (seconds first), evaluated at `timezone_offset_minutes`.
    pub cron_expression: String,

    /// Offset east of UTC used for "today" and for the cron schedule (default: IST).
    pub timezone_offset_minutes: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cron_expression: "0 0 6 * * *".to_string(),
            timezone_offset_minutes: 330,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub host: Option<String>,

    pub port: u16,

    pub username: Option<String>,

    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Defaults to `username` when unset.
    pub from: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from: None,
        }
    }
}

impl MailConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.username.is_some() && self.password.is_some()
    }

    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub json_logs: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "smartasset".to_string());

        Self {
            metrics_enabled: true,
            json_logs: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Config {
    /// Loads `.env`, the first config file found, then environment overrides.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from: {}", path.display());
        }

        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Applies environment-style overrides. `lookup` returns the raw value of a variable.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        if let Some(url) = get("DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(secret) = get("JWT_SECRET_KEY").or_else(|| get("SECRET_KEY")) {
            self.auth.jwt_secret = secret;
        }
        if let Some(base) = get("PUBLIC_BASE_URL") {
            self.storage.public_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(flag) = get("ENABLE_SCHEDULER") {
            self.scheduler.enabled = parse_bool(&flag);
        }
        if let Some(dir) = get("UPLOAD_FOLDER") {
            self.storage.upload_dir = dir;
        }
        if let Some(dir) = get("QR_FOLDER") {
            self.storage.qr_dir = dir;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = get("MAIL_HOST") {
            self.mail.host = Some(host);
        }
        if let Some(port) = get("MAIL_PORT").and_then(|p| p.parse().ok()) {
            self.mail.port = port;
        }
        if let Some(username) = get("MAIL_USERNAME") {
            self.mail.username = Some(username);
        }
        if let Some(password) = get("MAIL_PASSWORD") {
            self.mail.password = Some(password);
        }
        if let Some(from) = get("MAIL_FROM") {
            self.mail.from = Some(from);
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("smartasset").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".smartasset").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            anyhow::bail!("auth.jwt_secret cannot be empty");
        }

        if self.auth.token_ttl_hours == 0 {
            anyhow::bail!("auth.token_ttl_hours must be > 0");
        }

        let fields = self.scheduler.cron_expression.split_whitespace().count();
        if self.scheduler.enabled && !(6..=7).contains(&fields) {
            anyhow::bail!(
                "scheduler.cron_expression must have 6 or 7 fields, got {fields}: '{}'",
                self.scheduler.cron_expression
            );
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}
