//! Capture event types.
//!
//! Every record in the capture log is one of these, serialized as a single
//! JSON line tagged by `event_type`. Binary payloads (commands, shell input)
//! are stored lossily as UTF-8 so the log stays one-line-per-event greppable.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type")]
pub enum CaptureEvent {
    /// A credential pair was presented, accepted or not.
    #[serde(rename = "auth.attempt")]
    AuthAttempt {
        timestamp: DateTime<Utc>,
        source_ip: String,
        client_version: String,
        username: String,
        password: String,
    },

    /// A TCP connection reached the listener.
    #[serde(rename = "connection.new")]
    ConnectionNew {
        timestamp: DateTime<Utc>,
        source_ip: String,
    },

    /// A connection died on a protocol or transport error.
    #[serde(rename = "connection.error")]
    ConnectionError {
        timestamp: DateTime<Utc>,
        source_ip: String,
        error: String,
    },

    /// An exec request carried this command.
    #[serde(rename = "exec.command")]
    ExecCommand {
        timestamp: DateTime<Utc>,
        source_ip: String,
        command: String,
    },

    /// An interactive shell was requested.
    #[serde(rename = "shell.open")]
    ShellOpen {
        timestamp: DateTime<Utc>,
        source_ip: String,
        username: String,
    },

    /// A shell session ended cleanly.
    #[serde(rename = "shell.closed")]
    ShellClosed {
        timestamp: DateTime<Utc>,
        source_ip: String,
        duration_secs: u64,
        total_bytes: u64,
        head: String,
    },

    /// A shell session was cut off by a transport fault.
    #[serde(rename = "shell.aborted")]
    ShellAborted {
        timestamp: DateTime<Utc>,
        source_ip: String,
        total_bytes: u64,
    },
}

impl CaptureEvent {
    pub fn auth_attempt(
        source: &SocketAddr,
        client_version: &str,
        username: &str,
        password: &str,
    ) -> Self {
        Self::AuthAttempt {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
            client_version: client_version.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn connection_new(source: &SocketAddr) -> Self {
        Self::ConnectionNew {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
        }
    }

    pub fn connection_error(source: &SocketAddr, error: &str) -> Self {
        Self::ConnectionError {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
            error: error.to_string(),
        }
    }

    pub fn exec_command(source: &SocketAddr, command: &[u8]) -> Self {
        Self::ExecCommand {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
            command: String::from_utf8_lossy(command).into_owned(),
        }
    }

    pub fn shell_open(source: &SocketAddr, username: &str) -> Self {
        Self::ShellOpen {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
            username: username.to_string(),
        }
    }

    pub fn shell_closed(
        source: &SocketAddr,
        duration_secs: u64,
        total_bytes: u64,
        head: &[u8],
    ) -> Self {
        Self::ShellClosed {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
            duration_secs,
            total_bytes,
            head: String::from_utf8_lossy(head).into_owned(),
        }
    }

    pub fn shell_aborted(source: &SocketAddr, total_bytes: u64) -> Self {
        Self::ShellAborted {
            timestamp: Utc::now(),
            source_ip: source.ip().to_string(),
            total_bytes,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AuthAttempt { .. } => "auth.attempt",
            Self::ConnectionNew { .. } => "connection.new",
            Self::ConnectionError { .. } => "connection.error",
            Self::ExecCommand { .. } => "exec.command",
            Self::ShellOpen { .. } => "shell.open",
            Self::ShellClosed { .. } => "shell.closed",
            Self::ShellAborted { .. } => "shell.aborted",
        }
    }
}
