// src/config.rs

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::models::Protocol;
use crate::core::patterns::VulnerabilityPattern;
use crate::core::scanner::prober::ProbeSettings;
use crate::core::scanner::resolver::DEFAULT_NAMESERVERS;
use crate::core::scanner::scheduler::DEFAULT_CONCURRENCY;
use crate::logging::get_config_dir;

pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Scan tunables. Every field is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub concurrency: usize,
    pub protocols: Vec<Protocol>,
    pub nameservers: Vec<IpAddr>,
    pub dns_timeout_ms: u64,
    pub header_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    /// Fingerprints appended after the built-in catalog.
    pub patterns: Vec<VulnerabilityPattern>,
    /// Notification settings kept from the classic subtocheck config file.
    /// Parsed so existing files load; no mail is sent.
    pub email: Option<EmailConfig>,
}

/// The `email:` block of a subtocheck config file.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    /// `smtp` or `ses`.
    pub provider: String,
    pub host: String,
    #[serde(deserialize_with = "port_string")]
    pub port: String,
    pub username: String,
    pub password: String,
    pub region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_session_token: String,
    pub source: String,
    pub subject: String,
    pub recipients: Vec<String>,
    pub skip_no_vulns: bool,
}

// Credentials stay out of logs.
impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("region", &self.region)
            .field("source", &self.source)
            .field("subject", &self.subject)
            .field("recipients", &self.recipients)
            .field("skip_no_vulns", &self.skip_no_vulns)
            .finish_non_exhaustive()
    }
}

/// Old files write the port either quoted or as a bare number.
fn port_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u16),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(port) => port,
        Port::Number(port) => port.to_string(),
    })
}

impl Default for ScanConfig {
    fn default() -> Self {
        let probe = ProbeSettings::default();
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            protocols: Protocol::all(),
            nameservers: DEFAULT_NAMESERVERS.to_vec(),
            dns_timeout_ms: 1500,
            header_timeout_ms: probe.header_timeout.as_millis() as u64,
            request_timeout_ms: probe.request_timeout.as_millis() as u64,
            user_agent: probe.user_agent,
            patterns: Vec::new(),
            email: None,
        }
    }
}

impl ScanConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to `null`, which means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ScanConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, the file in the user config
    /// directory is used when present, and the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (get_config_dir().join(CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults.");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        info!(path = %path.display(), "Loaded configuration.");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.protocols.is_empty() {
            return Err(ConfigError::Invalid("at least one protocol is required".into()));
        }
        if self.nameservers.is_empty() {
            return Err(ConfigError::Invalid("at least one nameserver is required".into()));
        }
        if let Some(p) = self.patterns.iter().find(|p| p.platform.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "pattern with body strings {:?} has no platform name",
                p.body_strings
            )));
        }
        Ok(())
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            header_timeout: Duration::from_millis(self.header_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            user_agent: self.user_agent.clone(),
        }
    }
}
