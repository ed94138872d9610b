//! Configuration management for the ticketdesk CLI and SDK

use config::{Config, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{DeskError, Result};
use crate::ui::UI;
use crate::ConfigCommand;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Settings persisted by the CLI between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    pub endpoint: String,
    pub timeout: u64,
    pub verbose: bool,
    pub storage_dir: PathBuf,
    pub token_storage_enabled: bool,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: 30,
            verbose: false,
            storage_dir: default_storage_dir(),
            token_storage_enabled: true,
        }
    }
}

impl DeskConfig {
    /// Load the config file, writing defaults when it is missing or unreadable
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if config_file.exists() {
            let content = fs::read_to_string(&config_file).await?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable config {}: {}", config_file.display(), e);
                    let config = Self::default();
                    config.save(&config_file).await?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save(&config_file).await?;
            Ok(config)
        }
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    /// Path of the persisted session file
    pub fn session_path(&self) -> PathBuf {
        self.storage_dir.join("session.json")
    }

    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let use_proxy = !self.endpoint.contains("localhost") && !self.endpoint.contains("127.0.0.1");

        let mut builder = ClientConfigBuilder::new()
            .base_url(&self.endpoint)
            .timeout(self.timeout)
            .verbose(self.verbose)
            .use_proxy(use_proxy);

        if self.token_storage_enabled {
            builder = builder.token_storage(TokenStorageConfig {
                enabled: true,
                storage_path: Some(self.session_path().to_string_lossy().to_string()),
                encryption_key: None,
            });
        }

        builder.build()
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticketdesk")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticketdesk")
}

/// Token storage configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TokenStorageConfig {
    #[serde(default)]
    pub enabled: bool,
    pub storage_path: Option<String>,
    pub encryption_key: Option<String>,
}

impl From<TokenStorageConfig> for crate::store::FileStorageConfig {
    fn from(config: TokenStorageConfig) -> Self {
        Self {
            storage_path: config.storage_path.map(PathBuf::from),
            encryption_key: config.encryption_key,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub token_storage: TokenStorageConfig,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_use_proxy() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENDPOINT.to_string(),
            timeout: default_timeout(),
            verbose: false,
            token_storage: TokenStorageConfig::default(),
            use_proxy: default_use_proxy(),
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    token_storage: Option<TokenStorageConfig>,
    config_file: Option<PathBuf>,
    use_proxy: Option<bool>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }

    pub fn token_storage(mut self, token_storage: TokenStorageConfig) -> Self {
        self.token_storage = Some(token_storage);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(token_storage) = self.token_storage {
            config.token_storage = token_storage;
        }
        if let Some(use_proxy) = self.use_proxy {
            config.use_proxy = use_proxy;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Defaults, then the optional file, then `TICKETDESK_*` environment variables
    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", DEFAULT_ENDPOINT)?
            .set_default("timeout", 30)?
            .set_default("verbose", false)?
            .set_default("use_proxy", true)?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }
        builder = builder.add_source(Environment::with_prefix("TICKETDESK").try_parsing(true));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(DeskError::invalid_endpoint("Base URL cannot be empty"));
        }
        if self.timeout == 0 {
            return Err(DeskError::config("Timeout must be at least one second"));
        }
        Ok(())
    }

    /// Absolute URL for an API path; absolute URLs are returned unchanged
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if is_absolute_url(endpoint) {
            return endpoint.to_string();
        }

        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!("{}/{}", self.normalized_base_url().trim_end_matches('/'), endpoint)
    }

    /// Whether `target` resolves to the configured API origin
    ///
    /// Relative paths always do. Absolute URLs must match scheme, host and
    /// port of `base_url`; anything unparseable is treated as foreign.
    pub fn is_api_url(&self, target: &str) -> bool {
        if !is_absolute_url(target) {
            return true;
        }

        match (Url::parse(target), Url::parse(&self.normalized_base_url())) {
            (Ok(target), Ok(base)) => target.origin() == base.origin(),
            _ => false,
        }
    }

    fn normalized_base_url(&self) -> String {
        if is_absolute_url(&self.base_url) {
            self.base_url.clone()
        } else {
            format!("http://{}", self.base_url)
        }
    }
}

pub fn is_absolute_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Handles the `config` subcommands
pub struct ConfigService {
    config: DeskConfig,
    config_path: PathBuf,
    ui: UI,
}

impl ConfigService {
    pub fn new(config: DeskConfig) -> Self {
        Self::with_config_path(config, default_config_path())
    }

    pub fn with_config_path(config: DeskConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            ui: UI::new(),
        }
    }

    pub async fn handle_config(&mut self, command: ConfigCommand) -> Result<()> {
        match command {
            ConfigCommand::Show => {
                self.show();
                return Ok(());
            }
            ConfigCommand::SetEndpoint { url } => {
                let url = url.trim().trim_end_matches('/').to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(DeskError::invalid_endpoint(format!(
                        "Endpoint must start with http:// or https://, got '{}'",
                        url
                    )));
                }
                self.config.endpoint = url;
            }
            ConfigCommand::SetTimeout { seconds } => {
                if seconds == 0 {
                    return Err(DeskError::invalid_input("Timeout must be at least one second"));
                }
                self.config.timeout = seconds;
            }
            ConfigCommand::SetVerbose { enabled } => {
                self.config.verbose = parse_bool(&enabled)?;
            }
            ConfigCommand::Reset => {
                self.config = DeskConfig::default();
            }
        }

        self.config.save(&self.config_path).await?;
        self.ui.success("Configuration saved");
        Ok(())
    }

    fn show(&self) {
        self.ui.card(
            "Configuration",
            vec![
                ("Endpoint", self.config.endpoint.clone()),
                ("Timeout", format!("{}s", self.config.timeout)),
                ("Verbose", self.config.verbose.to_string()),
                ("Storage", self.config.storage_dir.display().to_string()),
                (
                    "Remember session",
                    self.config.token_storage_enabled.to_string(),
                ),
                ("Config file", self.config_path.display().to_string()),
            ],
        );
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(DeskError::invalid_input(format!(
            "Expected true/false, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_paths() {
        let config = ClientConfig {
            base_url: "http://helpdesk.local:8000/".to_string(),
            ..Default::default()
        };

        assert_eq!(
            config.endpoint_url("/api/auth/login/"),
            "http://helpdesk.local:8000/api/auth/login/"
        );
        assert_eq!(
            config.endpoint_url("api/tickets/"),
            "http://helpdesk.local:8000/api/tickets/"
        );
    }

    #[test]
    fn test_endpoint_url_keeps_absolute_urls() {
        let config = ClientConfig::default();
        let url = "https://files.example.com/media/report.pdf";
        assert_eq!(config.endpoint_url(url), url);
    }

    #[test]
    fn test_is_api_url_matches_origin_only() {
        let config = ClientConfig {
            base_url: "localhost:8000".to_string(),
            ..Default::default()
        };
        assert!(config.is_api_url("/api/tickets/"));
        assert!(config.is_api_url("http://localhost:8000/media/attachments/a.pdf"));
        assert!(!config.is_api_url("https://localhost:8000/media/a.pdf"));
        assert!(!config.is_api_url("http://localhost:9000/media/a.pdf"));
        assert!(!config.is_api_url("http://localhost:8000.evil.example/a.pdf"));
        assert!(!config.is_api_url("https://files.other-host.example/x.pdf"));
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        let config = ClientConfig {
            base_url: "localhost:8000".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint_url("/api/statuses/"),
            "http://localhost:8000/api/statuses/"
        );
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let config = ClientConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("on").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[tokio::test]
    async fn test_load_writes_defaults_when_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let config = DeskConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_load_recovers_from_corrupt_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let config = DeskConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.timeout, 30);

        let rewritten = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(serde_json::from_str::<DeskConfig>(&rewritten).is_ok());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");

        let config = DeskConfig {
            endpoint: "https://tickets.example.com".to_string(),
            timeout: 5,
            ..Default::default()
        };
        config.save(&path).await.unwrap();

        let loaded = DeskConfig::load(Some(&path)).await.unwrap();
        assert_eq!(loaded.endpoint, "https://tickets.example.com");
        assert_eq!(loaded.timeout, 5);
    }
}
