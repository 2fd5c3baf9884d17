//! Configuration types with serde defaults.
//!
//! Every field defaults, so an empty or absent file still yields a runnable
//! configuration. Validation beyond type shape lives in [`super::validate`].

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Ed25519 host key location; generated on first start if absent.
    #[serde(default = "default_host_key_path")]
    pub host_key_path: PathBuf,

    /// Version string presented in the server's identification line.
    #[serde(default = "default_server_id")]
    pub server_id: String,

    /// Client version string that is always denied authentication. The
    /// default matches the stock Go ssh client banner, which covers the
    /// bulk of mass scanners while letting interactive clients through.
    #[serde(default = "default_sentinel_client_version")]
    pub sentinel_client_version: String,

    /// Password attempts allowed before the connection is cut.
    #[serde(default = "default_max_auth_attempts")]
    pub max_auth_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            host_key_path: default_host_key_path(),
            server_id: default_server_id(),
            sentinel_client_version: default_sentinel_client_version(),
            max_auth_attempts: default_max_auth_attempts(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    /// Capture log destination. `None` disables the capture file (events
    /// still appear in operational logging at debug level).
    #[serde(default = "default_capture_log_path")]
    pub log_path: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            log_path: default_capture_log_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_listen() -> String {
    "0.0.0.0:2222".to_string()
}

fn default_host_key_path() -> PathBuf {
    PathBuf::from("sshtrap_host_key")
}

fn default_server_id() -> String {
    "SSH-2.0-OpenSSH_6.6.1p1 Ubuntu-2ubuntu2.3".to_string()
}

fn default_sentinel_client_version() -> String {
    "SSH-2.0-Go".to_string()
}

fn default_max_auth_attempts() -> u32 {
    3
}

fn default_capture_log_path() -> Option<PathBuf> {
    Some(PathBuf::from("/var/log/sshtrap/capture.log"))
}
