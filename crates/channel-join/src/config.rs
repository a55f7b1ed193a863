//! # Channel Join Configuration
//!
//! Organizations, their peers, and the per-peer confirmation deadline.
//!
//! ## Example
//!
//! ```toml
//! event_wait_timeout_ms = 30000
//! config_dir = "/etc/network"
//!
//! [organizations.Org1]
//! admin = "admin"
//!
//! [organizations.Org1.peers.peer0]
//! requests = "peer0.org1.example.com:7051"
//! events = "peer0.org1.example.com:7053"
//! server_hostname = "peer0.org1.example.com"
//! tls_cacerts = "crypto/org1/peer0/tls/ca.crt"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::{PeerRef, DEFAULT_EVENT_WAIT_TIMEOUT_MS};

/// Environment variable overriding `event_wait_timeout_ms`.
pub const ENV_EVENT_WAIT_TIME_MS: &str = "CJ_EVENT_WAIT_TIME_MS";

/// Errors that can occur while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parse error.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Organization is not configured.
    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),

    /// Peer is not configured for the organization.
    #[error("Unknown peer '{peer}' in organization '{organization}'")]
    UnknownPeer {
        /// Organization searched
        organization: String,
        /// Peer name requested
        peer: String,
    },

    /// A configured value is unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One peer of an organization.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerConfig {
    /// Request endpoint.
    pub requests: String,
    /// Event service endpoint.
    #[serde(default)]
    pub events: Option<String>,
    /// TLS server name override.
    #[serde(default, rename = "server-hostname", alias = "server_hostname")]
    pub server_hostname: Option<String>,
    /// TLS root certificate path, relative to `config_dir` unless absolute.
    #[serde(default)]
    pub tls_cacerts: Option<PathBuf>,
}

/// One organization.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationConfig {
    /// Default acting identity.
    #[serde(default)]
    pub admin: Option<String>,
    /// Peers keyed by name.
    #[serde(default)]
    pub peers: BTreeMap<String, PeerConfig>,
}

/// Channel join configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelJoinConfig {
    /// How long each peer may take to commit the config block.
    pub event_wait_timeout_ms: u64,
    /// Base directory for relative certificate paths.
    pub config_dir: PathBuf,
    /// Organizations keyed by name.
    pub organizations: BTreeMap<String, OrganizationConfig>,
}

impl Default for ChannelJoinConfig {
    fn default() -> Self {
        Self {
            event_wait_timeout_ms: DEFAULT_EVENT_WAIT_TIMEOUT_MS,
            config_dir: PathBuf::from("."),
            organizations: BTreeMap::new(),
        }
    }
}

impl ChannelJoinConfig {
    /// Create a config for testing (short timeout, no organizations).
    pub fn for_testing() -> Self {
        Self {
            event_wait_timeout_ms: 1000,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// A relative `config_dir` is resolved against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let mut config = Self::parse(&content)?;
        if config.config_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.config_dir = parent.join(&config.config_dir);
            }
        }
        info!(
            path = %path.display(),
            organizations = config.organizations.len(),
            "[channel-join] Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(ENV_EVENT_WAIT_TIME_MS) {
            self.event_wait_timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be an integer, got '{}'", ENV_EVENT_WAIT_TIME_MS, raw))
            })?;
            info!(
                timeout_ms = self.event_wait_timeout_ms,
                "[channel-join] Event wait time overridden from environment"
            );
        }
        self.validate()
    }

    /// Check values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_wait_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "event_wait_timeout_ms must be greater than zero".to_string(),
            ));
        }
        for (org_name, org) in &self.organizations {
            for (peer_name, peer) in &org.peers {
                if peer.requests.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "peer '{}' of '{}' has no requests address",
                        peer_name, org_name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Per-peer confirmation deadline.
    pub fn event_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.event_wait_timeout_ms)
    }

    /// Look up an organization.
    pub fn organization(&self, name: &str) -> Result<&OrganizationConfig, ConfigError> {
        self.organizations
            .get(name)
            .ok_or_else(|| ConfigError::UnknownOrganization(name.to_string()))
    }

    /// Names of every peer of `organization`, sorted.
    pub fn organization_peers(&self, organization: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self.organization(organization)?.peers.keys().cloned().collect())
    }

    /// Resolve named peers of `organization` into peer references, loading
    /// their TLS root certificates from disk.
    pub fn peer_refs(&self, organization: &str, peer_names: &[&str]) -> Result<Vec<PeerRef>, ConfigError> {
        let org = self.organization(organization)?;
        peer_names
            .iter()
            .map(|name| {
                let peer = org.peers.get(*name).ok_or_else(|| ConfigError::UnknownPeer {
                    organization: organization.to_string(),
                    peer: name.to_string(),
                })?;
                self.peer_ref(peer)
            })
            .collect()
    }

    /// Resolve every peer of `organization`.
    pub fn organization_peer_refs(&self, organization: &str) -> Result<Vec<PeerRef>, ConfigError> {
        let names = self.organization_peers(organization)?;
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.peer_refs(organization, &names)
    }

    fn peer_ref(&self, peer: &PeerConfig) -> Result<PeerRef, ConfigError> {
        let tls_root_cert = match &peer.tls_cacerts {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    self.config_dir.join(path)
                };
                fs::read(&path).map_err(|e| ConfigError::Io {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?
            }
            None => Vec::new(),
        };

        let mut peer_ref = PeerRef::new(peer.requests.clone())
            .with_tls(tls_root_cert, peer.server_hostname.clone());
        if let Some(events) = &peer.events {
            peer_ref = peer_ref.with_event_address(events.clone());
        }
        Ok(peer_ref)
    }
}
