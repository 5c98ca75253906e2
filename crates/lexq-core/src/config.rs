use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LexqError, Result};

/// Top-level configuration for the lexq bridge.
///
/// Loaded from a TOML file, then overlaid with the deployment environment
/// variables (see [`LexqConfig::apply_env_overrides`]). Each section
/// corresponds to one external collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexqConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub run_tracing: RunTracingConfig,
}

impl LexqConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LexqConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults only
    /// when the file does not exist. A file that exists but cannot be read
    /// or parsed is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("No config file at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LexqError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup.
    ///
    /// Only non-empty values override. The variable names are the ones the
    /// deployment template sets on the function.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TVM_ISSUER_URL") {
            self.credentials.issuer_url = v;
        }
        if let Some(v) = get("TVM_CLIENT_ID") {
            self.credentials.client_id = v;
        }
        if let Some(v) = get("TVM_CLIENT_SECRET") {
            self.credentials.client_secret = v;
        }
        if let Some(v) = get("TVM_ROLE_ARN") {
            self.credentials.role_arn = v;
        }
        if let Some(v) = get("AWS_REGION") {
            self.credentials.region = v;
        }
        if let Some(v) = get("TVM_EMAIL") {
            self.credentials.user_identity = v;
        }
        if let Some(v) = get("Q_APPLICATION_ID") {
            self.qa.application_id = v;
        }
        if let Some(v) = get("Q_ENDPOINT") {
            self.qa.endpoint = v;
        }
        if let Some(v) = get("CONVERSATION_TABLE_NAME") {
            self.history.table_name = v;
        }
        if let Some(v) = get("LANGCHAIN_API_KEY_PARAMETER_NAME") {
            self.secrets.api_key_parameter = v;
        }
    }

    /// Check that every setting a live turn needs is present.
    ///
    /// Returns a `Config` error naming all missing keys at once.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("credentials.issuer_url", &self.credentials.issuer_url),
            ("credentials.client_id", &self.credentials.client_id),
            ("credentials.client_secret", &self.credentials.client_secret),
            ("credentials.role_arn", &self.credentials.role_arn),
            ("credentials.region", &self.credentials.region),
            ("credentials.user_identity", &self.credentials.user_identity),
            ("qa.endpoint", &self.qa.endpoint),
            ("qa.application_id", &self.qa.application_id),
            ("history.table_name", &self.history.table_name),
            ("secrets.api_key_parameter", &self.secrets.api_key_parameter),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            return Err(LexqError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.secrets.backend == SecretBackend::File && self.secrets.file_path.is_none() {
            return Err(LexqError::Config(
                "secrets.file_path is required when secrets.backend = \"file\"".to_string(),
            ));
        }

        Ok(())
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Address the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Bearer token callers must present on `/invoke`. Generated at startup
    /// when empty.
    pub api_token: String,
    /// Requests per second accepted on protected routes.
    pub rate_limit_per_sec: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3040,
            api_token: String::new(),
            rate_limit_per_sec: 50,
        }
    }
}

/// Where secret parameters are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    /// Parameters resolved as process environment variables.
    Env,
    /// Parameters read from a TOML file of `name = "value"` pairs.
    File,
}

/// Secret store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub backend: SecretBackend,
    /// Path to the parameter file when `backend = "file"`.
    pub file_path: Option<String>,
    /// Name of the parameter holding the run-tracing API key.
    pub api_key_parameter: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::Env,
            file_path: None,
            api_key_parameter: String::new(),
        }
    }
}

/// Delegated credential exchange settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Role the delegated credentials are scoped to.
    pub role_arn: String,
    pub region: String,
    /// The user identity (email) credentials are issued for.
    pub user_identity: String,
    pub request_timeout_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            issuer_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            role_arn: String::new(),
            region: String::new(),
            user_identity: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Hosted QA service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Base URL of the QA service.
    pub endpoint: String,
    pub application_id: String,
    /// Answer the rewritten standalone question instead of the raw
    /// utterance when history exists.
    pub use_standalone_question: bool,
    /// Send the previous turn's conversation and message ids so the
    /// service continues its own conversation. Off by default: every turn
    /// starts a fresh service-side conversation.
    pub continue_conversation: bool,
    pub request_timeout_secs: u64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            application_id: String::new(),
            use_standalone_question: false,
            continue_conversation: false,
            request_timeout_secs: 60,
        }
    }
}

/// Conversation history store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Table holding chat messages.
    pub table_name: String,
    /// SQLite database file.
    pub database_path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            table_name: "conversation_history".to_string(),
            database_path: "~/.lexq/history.db".to_string(),
        }
    }
}

/// Run tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTracingConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Project runs are filed under.
    pub project: String,
    pub request_timeout_secs: u64,
}

impl Default for RunTracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            project: "lexq".to_string(),
            request_timeout_secs: 10,
        }
    }
}
