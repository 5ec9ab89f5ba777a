//! Hub configuration settings

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub hub: HubSettings,
    pub server: ServerSettings,
    pub federation: FederationSettings,
    pub channels: ChannelSettings,
    pub metrics: MetricsSettings,
}

/// Hub identity settings
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    /// Human-readable name used in logs; the wire identity is generated per process
    #[serde(default = "default_hub_name")]
    pub name: String,
}

fn default_hub_name() -> String {
    "frame-hub".to_string()
}

/// Server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8090
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Federation settings
#[derive(Debug, Clone, Deserialize)]
pub struct FederationSettings {
    /// Enable the broadcast medium
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Broadcast scope; hubs only accept messages from the same scope
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Base URLs of the other hubs in this scope
    #[serde(default)]
    pub peers: Vec<String>,
    /// Per-request timeout for federation posts in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_sec: u64,
}

impl FederationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}

fn default_true() -> bool {
    true
}

fn default_scope() -> String {
    "my_channel".to_string()
}

fn default_request_timeout() -> u64 {
    5
}

/// Peer channel settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSettings {
    /// Interval between keep-alive comments on open event streams
    #[serde(default = "default_keep_alive")]
    pub keep_alive_sec: u64,
}

fn default_keep_alive() -> u64 {
    15
}

/// Metrics settings
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Settings {
    /// Load settings from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load settings from a specific config file path (without extension)
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("hub.name", default_hub_name())?
            .set_default("server.host", default_host())?
            .set_default("server.http_port", default_http_port() as i64)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("federation.enabled", true)?
            .set_default("federation.scope", default_scope())?
            .set_default("federation.peers", Vec::<String>::new())?
            .set_default("federation.request_timeout_sec", default_request_timeout() as i64)?
            .set_default("channels.keep_alive_sec", default_keep_alive() as i64)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.path", default_metrics_path())?
            // Add config file if it exists
            .add_source(File::with_name(config_path.to_str().unwrap_or("config")).required(false))
            // Add environment variables with prefix FRAME_HUB__
            .add_source(
                Environment::with_prefix("FRAME_HUB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("federation.peers")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::load().unwrap_or_else(|_| Settings {
            hub: HubSettings {
                name: default_hub_name(),
            },
            server: ServerSettings {
                host: default_host(),
                http_port: default_http_port(),
                workers: default_workers(),
            },
            federation: FederationSettings {
                enabled: true,
                scope: default_scope(),
                peers: Vec::new(),
                request_timeout_sec: default_request_timeout(),
            },
            channels: ChannelSettings {
                keep_alive_sec: default_keep_alive(),
            },
            metrics: MetricsSettings {
                enabled: true,
                path: default_metrics_path(),
            },
        })
    }
}
