//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use creditai_core::is_valid_table_name;

use crate::constants::{artifacts, chat, database, endpoints, scores};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - missing artifacts only warn
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Relational store connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Table names used by the endpoints
    #[serde(default)]
    pub tables: TableConfig,

    /// Credit score model artifacts and bounds
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Chat relay configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings that have usable defaults
    ///
    /// Secrets are checked separately by [`Settings::validate_secrets`] so
    /// that in-process setups (tests, tools) can run without them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_tables()?;
        self.validate_scoring()?;
        self.validate_chat()?;
        Ok(())
    }

    /// Require every secret that has no default
    pub fn validate_secrets(&self) -> Result<(), ConfigError> {
        if self.database.password.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingField(
                "database.password (set CREDITAI__DATABASE__PASSWORD)".to_string(),
            ));
        }
        if self.chat.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingField(
                "chat.api_key (set CREDITAI__CHAT__API_KEY)".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.database.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.environment.is_production()
            && self.server.cors_enabled
            && self.server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_tables(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("tables.records", &self.tables.records),
            ("tables.social", &self.tables.social),
        ] {
            if !is_valid_table_name(name) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("'{}' is not a plain table identifier", name),
                });
            }
        }
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let scoring = &self.scoring;

        if !(scoring.min_score < scoring.max_score) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.min_score".to_string(),
                message: format!(
                    "Must be below max_score ({}), got {}",
                    scoring.max_score, scoring.min_score
                ),
            });
        }

        if !(scoring.min_score..=scoring.max_score).contains(&scoring.default_score) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.default_score".to_string(),
                message: format!(
                    "Must be within [{}, {}], got {}",
                    scoring.min_score, scoring.max_score, scoring.default_score
                ),
            });
        }

        for (field, path) in [
            ("scoring.model_path", &scoring.model_path),
            ("scoring.scaler_path", &scoring.scaler_path),
        ] {
            if path.is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
            if !Path::new(path).is_file() {
                if self.environment.is_strict() {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        message: format!("artifact not found: {}", path),
                    });
                }
                tracing::warn!(
                    field,
                    path = %path,
                    "Model artifact not found; scores will fall back to the default"
                );
            }
        }

        Ok(())
    }

    fn validate_chat(&self) -> Result<(), ConfigError> {
        let chat = &self.chat;

        if chat.fallback_session_key.is_empty() {
            return Err(ConfigError::MissingField("chat.fallback_session_key".to_string()));
        }

        if chat.max_conversations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.max_conversations".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if chat.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if let Some(temperature) = chat.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidValue {
                    field: "chat.temperature".to_string(),
                    message: format!("Must be between 0.0 and 2.0, got {}", temperature),
                });
            }
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS restrictions (false = allow every origin)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec![endpoints::FRONTEND_ORIGIN.to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Relational store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    /// Required; no default (CREDITAI__DATABASE__PASSWORD)
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_db_name")]
    pub database: String,

    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a request waits for a pooled connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_db_host() -> String {
    database::HOST.to_string()
}

fn default_db_port() -> u16 {
    database::PORT
}

fn default_db_user() -> String {
    database::USER.to_string()
}

fn default_db_name() -> String {
    database::DATABASE.to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: None,
            database: default_db_name(),
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
        }
    }
}

/// Table names (validated as plain identifiers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_records_table")]
    pub records: String,

    #[serde(default = "default_social_table")]
    pub social: String,
}

fn default_records_table() -> String {
    database::RECORDS_TABLE.to_string()
}

fn default_social_table() -> String {
    database::SOCIAL_TABLE.to_string()
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            records: default_records_table(),
            social: default_social_table(),
        }
    }
}

/// Credit score model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Regression model artifact (.json tree ensemble or .onnx)
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Fitted scaler parameters (.json)
    #[serde(default = "default_scaler_path")]
    pub scaler_path: String,

    /// Score returned when a prediction cannot be computed
    #[serde(default = "default_score")]
    pub default_score: f64,

    #[serde(default = "default_min_score")]
    pub min_score: f64,

    #[serde(default = "default_max_score")]
    pub max_score: f64,

    /// Re-read artifacts on every call instead of caching them
    #[serde(default)]
    pub reload_per_call: bool,
}

fn default_model_path() -> String {
    artifacts::MODEL_PATH.to_string()
}

fn default_scaler_path() -> String {
    artifacts::SCALER_PATH.to_string()
}

fn default_score() -> f64 {
    scores::DEFAULT_SCORE
}

fn default_min_score() -> f64 {
    scores::MIN_SCORE
}

fn default_max_score() -> f64 {
    scores::MAX_SCORE
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            scaler_path: default_scaler_path(),
            default_score: default_score(),
            min_score: default_min_score(),
            max_score: default_max_score(),
            reload_per_call: false,
        }
    }
}

/// Chat relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Required; no default (CREDITAI__CHAT__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_chat_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Conversation key used when the payload has no business_id
    #[serde(default = "default_fallback_key")]
    pub fallback_session_key: String,

    /// Upper bound on live conversations
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,

    /// Conversations idle longer than this are dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Interval of the background expiry sweep
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// Business id answered from the built-in demo profile
    #[serde(default = "default_demo_business_id")]
    pub demo_business_id: String,
}

fn default_chat_model() -> String {
    endpoints::GEMINI_MODEL.to_string()
}

fn default_chat_endpoint() -> String {
    endpoints::GEMINI_DEFAULT.to_string()
}

fn default_chat_timeout() -> u64 {
    60
}

fn default_fallback_key() -> String {
    chat::FALLBACK_SESSION_KEY.to_string()
}

fn default_max_conversations() -> usize {
    chat::MAX_CONVERSATIONS
}

fn default_idle_timeout() -> u64 {
    chat::IDLE_TIMEOUT_SECS
}

fn default_cleanup_interval() -> u64 {
    chat::CLEANUP_INTERVAL_SECS
}

fn default_demo_business_id() -> String {
    chat::DEMO_BUSINESS_ID.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_chat_model(),
            endpoint: default_chat_endpoint(),
            timeout_seconds: default_chat_timeout(),
            temperature: None,
            max_output_tokens: None,
            fallback_session_key: default_fallback_key(),
            max_conversations: default_max_conversations(),
            idle_timeout_seconds: default_idle_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
            demo_business_id: default_demo_business_id(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/` and the environment
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.
/// Fails when a secret is missing.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit config directory
pub fn load_settings_from(config_dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(
        File::with_name(&config_dir.join("default").to_string_lossy()).required(false),
    );

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&config_dir.join(env_name).to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CREDITAI")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.cors_origins"),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;
    settings.validate_secrets()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_secrets() -> Settings {
        let mut settings = Settings::default();
        settings.database.password = Some("secret".to_string());
        settings.chat.api_key = Some("key".to_string());
        settings
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.database.port, 3306);
        assert_eq!(settings.database.database, "creditai");
        assert_eq!(settings.tables.records, "testcases");
        assert_eq!(settings.tables.social, "socialmedia");
        assert_eq!(settings.scoring.default_score, 650.0);
        assert_eq!(settings.chat.model, "gemini-2.0-flash");
        assert_eq!(settings.chat.fallback_session_key, "unknown");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_secrets_have_no_default() {
        let settings = Settings::default();
        assert!(settings.database.password.is_none());
        assert!(settings.chat.api_key.is_none());
        assert!(matches!(
            settings.validate_secrets(),
            Err(ConfigError::MissingField(_))
        ));

        let mut settings = with_secrets();
        assert!(settings.validate_secrets().is_ok());

        settings.chat.api_key = Some(String::new());
        assert!(settings.validate_secrets().is_err());
    }

    #[test]
    fn test_table_names_must_be_identifiers() {
        let mut settings = Settings::default();
        settings.tables.records = "testcases; DROP TABLE users".to_string();
        assert!(settings.validate_tables().is_err());

        settings.tables.records = "credit_data".to_string();
        assert!(settings.validate_tables().is_ok());
    }

    #[test]
    fn test_score_bounds_validation() {
        let mut settings = Settings::default();
        settings.scoring.default_score = 950.0;
        assert!(settings.validate_scoring().is_err());

        settings.scoring.default_score = 650.0;
        settings.scoring.min_score = 900.0;
        assert!(settings.validate_scoring().is_err());
    }

    #[test]
    fn test_missing_artifact_is_fatal_only_when_strict() {
        let mut settings = Settings::default();
        settings.scoring.model_path = "does/not/exist.json".to_string();
        assert!(settings.validate_scoring().is_ok());

        settings.environment = RuntimeEnvironment::Production;
        assert!(settings.validate_scoring().is_err());
    }

    #[test]
    fn test_chat_validation() {
        let mut settings = Settings::default();
        settings.chat.temperature = Some(3.5);
        assert!(settings.validate_chat().is_err());

        settings.chat.temperature = Some(0.4);
        settings.chat.max_conversations = 0;
        assert!(settings.validate_chat().is_err());
    }

    #[test]
    fn test_load_settings_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(
            file,
            "server:\n  port: 8081\ndatabase:\n  password: from-file\ntables:\n  records: credit_data\nchat:\n  api_key: test-key\n  max_conversations: 5\n"
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.database.password.as_deref(), Some("from-file"));
        assert_eq!(settings.tables.records, "credit_data");
        assert_eq!(settings.chat.max_conversations, 5);
        // Untouched sections keep their defaults
        assert_eq!(settings.database.host, "localhost");
    }

    #[test]
    fn test_load_settings_fails_without_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(file, "server:\n  port: 8082\n").unwrap();

        // Only meaningful when the process environment does not supply them
        if std::env::var("CREDITAI__DATABASE__PASSWORD").is_err() {
            assert!(load_settings_from(dir.path(), None).is_err());
        }
    }

    #[test]
    fn test_with_secrets_passes_full_validation() {
        let settings = with_secrets();
        assert!(settings.validate().is_ok());
        assert!(settings.validate_secrets().is_ok());
    }
}
