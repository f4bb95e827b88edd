//! Configuration management for byoc

use crate::error::{Error, Result};
use crate::region::{EndpointRegistry, Region};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration directory name
const CONFIG_DIR: &str = "byoc";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Token cache directory, shared with other Sentinel Hub tooling
const TOKEN_DIR: &str = ".sentinelhub";

pub const DEFAULT_TOKEN_URL: &str = "https://services.sentinel-hub.com/oauth/token";
pub const DEFAULT_CATALOG_URL: &str = "https://services.sentinel-hub.com/api/v1/byoc/global";

/// OAuth2 client credentials
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Everything a [`crate::CatalogClient`] needs to start a session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub token_url: String,
    pub catalog_url: String,
    pub endpoints: EndpointRegistry,
    /// Applied to every HTTP request
    pub timeout: Duration,
    /// Pause before each follow-up page request
    pub page_delay: Duration,
    pub token_dir: PathBuf,
}

impl ClientConfig {
    /// Production endpoints with default timings
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            credentials,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            endpoints: EndpointRegistry::default(),
            timeout: Duration::from_secs(default_timeout()),
            page_delay: Duration::from_millis(default_page_delay()),
            token_dir: default_token_dir()?,
        })
    }

    /// Apply the settings of a config file on top of the defaults
    pub fn from_file(credentials: Credentials, file: &ConfigFile) -> Result<Self> {
        validate_config(file)?;

        let mut config = Self::new(credentials)?;
        if let Some(service) = &file.service {
            if let Some(token_url) = &service.token_url {
                config.token_url = token_url.clone();
            }
            if let Some(catalog_url) = &service.catalog_url {
                config.catalog_url = catalog_url.trim_end_matches('/').to_string();
            }
        }
        for (location, url) in &file.endpoints {
            let region: Region = location.parse()?;
            config.endpoints = config.endpoints.with_endpoint(region, url);
        }
        if let Some(advanced) = &file.advanced {
            config.timeout = Duration::from_secs(advanced.timeout);
            config.page_delay = Duration::from_millis(advanced.page_delay_ms);
            if let Some(dir) = &advanced.token_dir {
                config.token_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_catalog_url(mut self, catalog_url: impl Into<String>) -> Self {
        self.catalog_url = catalog_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_endpoints(mut self, endpoints: EndpointRegistry) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_token_dir(mut self, token_dir: impl Into<PathBuf>) -> Self {
        self.token_dir = token_dir.into();
        self
    }
}

/// On-disk configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub service: Option<ServiceConfig>,
    /// Region identifier -> base URL overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,
    pub advanced: Option<AdvancedConfig>,
    pub logging: Option<LoggingConfig>,
}

impl ConfigFile {
    /// Every setting spelled out with its default value
    pub fn with_defaults() -> Self {
        Self {
            service: Some(ServiceConfig {
                token_url: Some(DEFAULT_TOKEN_URL.to_string()),
                catalog_url: Some(DEFAULT_CATALOG_URL.to_string()),
            }),
            endpoints: EndpointRegistry::default()
                .iter()
                .map(|(region, url)| (region.to_string(), url.to_string()))
                .collect(),
            advanced: Some(AdvancedConfig::default()),
            logging: Some(LoggingConfig {
                level: default_log_level(),
            }),
        }
    }
}

/// Service URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<String>,
}

/// Advanced configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_dir: Option<String>,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            page_delay_ms: default_page_delay(),
            token_dir: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_timeout() -> u64 {
    30
}

fn default_page_delay() -> u64 {
    100
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn home() -> Result<PathBuf> {
    home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
}

/// Default directory of cached tokens
pub fn default_token_dir() -> Result<PathBuf> {
    Ok(home()?.join(TOKEN_DIR))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(home()?.join(".config").join(CONFIG_DIR))
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load configuration from file
pub fn load_config() -> Result<ConfigFile> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        return Err(Error::ConfigNotFound(config_path));
    }

    let content = fs::read_to_string(&config_path)
        .map_err(|e| Error::InvalidConfig(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_config_or_default() -> Result<ConfigFile> {
    match load_config() {
        Err(Error::ConfigNotFound(path)) => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(ConfigFile::default())
        }
        other => other,
    }
}

/// Parse configuration from TOML text
pub fn parse_config(content: &str) -> Result<ConfigFile> {
    toml::from_str(content)
        .map_err(|e| Error::InvalidConfig(format!("Failed to parse config file: {}", e)))
}

/// Save configuration to file
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let content = toml::to_string_pretty(config)?;
    fs::write(config_dir.join(CONFIG_FILE), content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(service) = &config.service {
        for url in [&service.token_url, &service.catalog_url].into_iter().flatten() {
            validate_url(url)?;
        }
    }

    for (location, url) in &config.endpoints {
        location.parse::<Region>()?;
        validate_url(url)?;
    }

    if let Some(advanced) = &config.advanced {
        if advanced.timeout == 0 {
            return Err(Error::InvalidInput("Timeout must be greater than zero".to_string()));
        }
    }

    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    reqwest::Url::parse(url)
        .map(|_| ())
        .map_err(|e| Error::InvalidInput(format!("Invalid URL '{}': {}", url, e)))
}

/// Check if configuration exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}
