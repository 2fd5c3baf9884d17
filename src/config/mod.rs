//! Configuration loading and validation.

mod types;

pub use types::{AppConfig, CaptureConfig, LogFormat, LogLevel, LoggingConfig, ServerConfig};

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Upper bound on the config file size; anything larger is not a config.
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        bail!(
            "config file {} is {} bytes, larger than the {} byte limit",
            path.display(),
            metadata.len(),
            MAX_CONFIG_SIZE
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("in config file {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("parsing TOML")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &AppConfig) -> Result<()> {
    config
        .server
        .listen
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid listen address '{}'", config.server.listen))?;

    if config.server.max_auth_attempts == 0 {
        bail!("server.max_auth_attempts must be at least 1");
    }

    // RFC 4253 identification lines start with SSH-2.0-; anything else makes
    // clients hang up before authenticating.
    if !config.server.server_id.starts_with("SSH-2.0-") {
        bail!(
            "server.server_id '{}' must start with 'SSH-2.0-'",
            config.server.server_id
        );
    }

    Ok(())
}

/// Annotated default configuration, written by `sshtrap init`.
pub fn default_config_toml() -> String {
    let defaults = ServerConfig::default();
    format!(
        r#"# sshtrap configuration

[server]
# Address to listen on. 22 needs privileges; a redirect rule works too.
listen = "{listen}"
# Ed25519 host key, generated on first start if the file does not exist.
host_key_path = "{host_key}"
# Version string presented to clients.
server_id = "{server_id}"
# Clients announcing this version string are always denied.
sentinel_client_version = "{sentinel}"
# Password attempts allowed before the connection is cut.
max_auth_attempts = {attempts}

[logging]
# trace | debug | info | warn | error
level = "info"
# pretty | json
format = "pretty"

[capture]
# Append-only JSON-lines capture log. SIGHUP reopens it after rotation.
log_path = "/var/log/sshtrap/capture.log"
"#,
        listen = defaults.listen,
        host_key = defaults.host_key_path.display(),
        server_id = defaults.server_id,
        sentinel = defaults.sentinel_client_version,
        attempts = defaults.max_auth_attempts,
    )
}
