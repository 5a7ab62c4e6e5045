use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use push_convert::ConverterKind;
use push_core::Capabilities;
use push_worker::WorkerConfig;
use serde::Deserialize;
use thiserror::Error;

/// Env var overriding the config file location.
pub const CONFIG_ENV: &str = "PUSH_GATEWAY_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub apns: Vec<ApnsConfig>,
    #[serde(default)]
    pub fcm: Vec<FcmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64, // seconds
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApnsConfig {
    #[serde(flatten)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub converter: ConverterKind,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default)]
    pub voip: bool,
    #[serde(default = "default_true")]
    pub allow_alerts: bool,
    pub sound: Option<String>,
    pub topic: Option<String>,
    pub collapse_key: Option<String>,
    pub credentials: ApnsCredentials,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ApnsCredentials {
    /// PKCS#12 certificate bundle.
    Certificate {
        path: PathBuf,
        #[serde(default)]
        password: String,
    },
    /// PKCS#8 signing key for token authentication.
    Token {
        key_path: PathBuf,
        key_id: String,
        team_id: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    #[serde(flatten)]
    pub worker: WorkerConfig,
    pub server_key: String,
    #[serde(default = "default_fcm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_true")]
    pub voip: bool,
    #[serde(default = "default_true")]
    pub allow_alerts: bool,
    pub sound: Option<String>,
    pub collapse_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64, // seconds
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_fcm_endpoint() -> String {
    push_provider::FCM_ENDPOINT.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl ApnsConfig {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_voip: self.voip,
            allow_alerts: self.allow_alerts,
            sound: self.sound.clone(),
            topic: self.topic.clone(),
            collapse_key: self.collapse_key.clone(),
        }
    }
}

impl FcmConfig {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_voip: self.voip,
            allow_alerts: self.allow_alerts,
            sound: self.sound.clone(),
            topic: None,
            collapse_key: self.collapse_key.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("push-gateway.toml"))
    }

    /// Project ids of every configured worker.
    pub fn project_ids(&self) -> impl Iterator<Item = &str> {
        self.apns
            .iter()
            .map(|c| c.worker.project_id.as_str())
            .chain(self.fcm.iter().map(|c| c.worker.project_id.as_str()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for id in self.project_ids() {
            if id.is_empty() {
                return Err(ConfigError::Invalid("empty project_id".to_string()));
            }
            if !seen.insert(id) {
                return Err(ConfigError::Invalid(format!("duplicate project_id {id}")));
            }
        }
        Ok(())
    }
}
