//! Per-connection protocol handler.
//!
//! Implements the authentication decision policy, the channel dispatcher and
//! the request router on top of `russh::server::Handler`, delegating the
//! fabricated responses to the emulators.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use russh::server::{Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, MethodKind, MethodSet, Pty};
use tracing::{debug, info, warn};

use crate::capture::CaptureLog;
use crate::context::AppContext;
use crate::emulator::exec;
use crate::emulator::shell::{ShellSession, Step};
use crate::ssh::banner::ClientVersion;

/// What a session channel has committed to. The first exec or shell request
/// decides, permanently.
enum ChannelMode {
    Pending,
    Exec,
    Shell(ShellSession),
}

pub struct ConnectionHandler {
    ctx: Arc<AppContext>,
    peer_addr: SocketAddr,
    client_version: ClientVersion,
    username: Option<String>,
    auth_attempts: u32,
    channels: HashMap<ChannelId, ChannelMode>,
}

impl ConnectionHandler {
    pub fn new(ctx: Arc<AppContext>, peer_addr: SocketAddr, client_version: ClientVersion) -> Self {
        Self {
            ctx,
            peer_addr,
            client_version,
            username: None,
            auth_attempts: 0,
            channels: HashMap::new(),
        }
    }

    pub fn auth_attempts(&self) -> u32 {
        self.auth_attempts
    }

    fn password_methods() -> Option<MethodSet> {
        Some(MethodSet::from([MethodKind::Password].as_slice()))
    }

    /// Ends a shell that reported [`Step::Exit`] or whose channel is going
    /// away: summary event, exit status 0, close. Removing the entry keeps a
    /// later eof/close for the same channel from logging a second summary.
    fn close_shell(&mut self, channel: ChannelId, session: &mut Session) {
        if let Some(ChannelMode::Shell(mut shell)) = self.channels.remove(&channel) {
            let summary = shell.finish();
            info!(
                peer = %self.peer_addr,
                duration_secs = summary.duration_secs,
                total_bytes = summary.total_bytes,
                "Shell session closed"
            );
            self.ctx.capture.log_shell_closed(
                &self.peer_addr,
                summary.duration_secs,
                summary.total_bytes,
                &summary.head,
            );
            let _ = session.exit_status_request(channel, 0);
            let _ = session.close(channel);
        }
    }
}

impl russh::server::Handler for ConnectionHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        // No credential presented, nothing to capture; steer the client to
        // the password prompt.
        debug!(peer = %self.peer_addr, user = %user, "none auth, offering password");
        Ok(Auth::Reject {
            proceed_with_methods: Self::password_methods(),
            partial_success: false,
        })
    }

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        self.auth_attempts += 1;
        let client_version = self.client_version.get();

        // Every attempt is captured, denied ones included.
        self.ctx
            .capture
            .log_auth_attempt(&self.peer_addr, &client_version, user, password);

        if client_version == self.ctx.config.server.sentinel_client_version {
            let out_of_attempts = self.auth_attempts >= self.ctx.config.server.max_auth_attempts;
            debug!(
                peer = %self.peer_addr,
                client_version = %client_version,
                attempt = self.auth_attempts,
                "Sentinel client version, denying"
            );
            return Ok(Auth::Reject {
                proceed_with_methods: if out_of_attempts {
                    None
                } else {
                    Self::password_methods()
                },
                partial_success: false,
            });
        }

        info!(peer = %self.peer_addr, user = %user, "Authentication accepted");
        self.username = Some(user.to_string());
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.username.is_none() {
            return Ok(false);
        }
        debug!(peer = %self.peer_addr, channel = %channel.id(), "Session channel opened");
        self.channels.insert(channel.id(), ChannelMode::Pending);
        Ok(true)
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        warn!(
            peer = %self.peer_addr,
            target = %format!("{host_to_connect}:{port_to_connect}"),
            "Rejecting unknown channel type (direct-tcpip)"
        );
        drop(channel);
        Ok(false)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        match self.channels.get_mut(&channel) {
            Some(mode @ ChannelMode::Pending) => {
                *mode = ChannelMode::Exec;
                info!(
                    peer = %self.peer_addr,
                    command = %String::from_utf8_lossy(data),
                    "Exec request"
                );
                self.ctx.capture.log_exec_command(&self.peer_addr, data);

                let output = exec::fabricate_output(data.len());
                let _ = session.channel_success(channel);
                let _ = session.data(channel, CryptoVec::from_slice(&output));
                let _ = session.exit_status_request(channel, 0);
                let _ = session.close(channel);
            }
            _ => {
                // Already committed, or never opened. One request per channel.
                let _ = session.channel_failure(channel);
            }
        }
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let username = match (&self.username, self.channels.get(&channel)) {
            (Some(username), Some(ChannelMode::Pending)) => username.clone(),
            _ => {
                let _ = session.channel_failure(channel);
                return Ok(());
            }
        };

        info!(peer = %self.peer_addr, user = %username, "Shell session opened");
        self.ctx.capture.log_shell_open(&self.peer_addr, &username);

        let shell = ShellSession::new(&username);
        let _ = session.channel_success(channel);
        let _ = session.data(channel, CryptoVec::from_slice(shell.prompt().as_bytes()));
        self.channels.insert(channel, ChannelMode::Shell(shell));
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let step = match self.channels.get_mut(&channel) {
            Some(ChannelMode::Shell(shell)) if !shell.is_finished() => {
                let mut out = Vec::new();
                let step = shell.feed(data, &mut out);
                if !out.is_empty() {
                    let _ = session.data(channel, CryptoVec::from_slice(&out));
                }
                step
            }
            _ => return Ok(()),
        };

        if step == Step::Exit {
            self.close_shell(channel, session);
        }
        Ok(())
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(peer = %self.peer_addr, term = %term, "Refusing pty request");
        let _ = session.channel_failure(channel);
        Ok(())
    }

    async fn env_request(
        &mut self,
        channel: ChannelId,
        _variable_name: &str,
        _variable_value: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let _ = session.channel_failure(channel);
        Ok(())
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(peer = %self.peer_addr, subsystem = %name, "Refusing subsystem request");
        let _ = session.channel_failure(channel);
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.close_shell(channel, session);
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.close_shell(channel, session);
        Ok(())
    }
}

/// Emits abort records for shells still running when their connection goes
/// away. Transport faults tear the handler down without per-channel closes,
/// so this is the only place their running byte counts get logged.
fn abort_unfinished_shells<'a>(
    capture: &CaptureLog,
    peer_addr: &SocketAddr,
    modes: impl Iterator<Item = &'a ChannelMode>,
) {
    for mode in modes {
        if let ChannelMode::Shell(shell) = mode {
            if !shell.is_finished() {
                warn!(
                    peer = %peer_addr,
                    total_bytes = shell.total_bytes(),
                    "Shell session aborted"
                );
                capture.log_shell_aborted(peer_addr, shell.total_bytes());
            }
        }
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        abort_unfinished_shells(&self.ctx.capture, &self.peer_addr, self.channels.values());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::sleep;

    #[tokio::test]
    async fn torn_down_shells_log_aborts_with_running_totals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.log");
        let capture = CaptureLog::new(Some(path.clone()));
        let peer: SocketAddr = "192.0.2.7:50000".parse().unwrap();

        let mut running = ShellSession::new("root");
        let mut out = Vec::new();
        running.feed(b"uname -a\n", &mut out);

        let mut done = ShellSession::new("root");
        done.feed(b"exit\n", &mut out);

        let modes = [
            ChannelMode::Pending,
            ChannelMode::Exec,
            ChannelMode::Shell(running),
            ChannelMode::Shell(done),
        ];
        abort_unfinished_shells(&capture, &peer, modes.iter());
        sleep(Duration::from_millis(100)).await;

        // Only the shell that never finished is aborted; pending and exec
        // channels and cleanly exited shells leave nothing behind.
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event_type"], "shell.aborted");
        assert_eq!(lines[0]["source_ip"], "192.0.2.7");
        assert_eq!(lines[0]["total_bytes"], 9);
    }
}
