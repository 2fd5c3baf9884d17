//! Listener, per-connection tasks and signal handling.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use russh::server::Config as SshConfig;
use russh::{MethodKind, MethodSet, SshId};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capture::CaptureLog;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::ssh::banner::{BannerStream, ClientVersion};
use crate::ssh::handler::ConnectionHandler;
use crate::ssh::keys;

pub async fn run(config: AppConfig) -> Result<()> {
    let config = Arc::new(config);
    let capture = Arc::new(CaptureLog::new(config.capture.log_path.clone()));
    let ctx = Arc::new(AppContext::new(config.clone(), capture.clone()));

    let host_key = keys::load_or_generate_host_key(&config.server.host_key_path)?;

    let mut ssh_config = SshConfig::default();
    ssh_config.keys.push(host_key);
    ssh_config.server_id = SshId::Standard(config.server.server_id.clone());
    ssh_config.methods = MethodSet::from([MethodKind::Password].as_slice());
    ssh_config.auth_rejection_time = Duration::from_secs(1);
    ssh_config.auth_rejection_time_initial = Some(Duration::from_secs(0));
    let ssh_config = Arc::new(ssh_config);

    let shutdown = CancellationToken::new();
    spawn_signal_handler(capture.clone(), shutdown.clone());

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding to {}", config.server.listen))?;
    info!(
        listen = %config.server.listen,
        server_id = %config.server.server_id,
        "sshtrap listening"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(
                    uptime_secs = ctx.start_time.elapsed().as_secs(),
                    "Shutting down"
                );
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted.context("accepting connection")?;
                let ctx = ctx.clone();
                let ssh_config = ssh_config.clone();
                tokio::spawn(async move {
                    handle_connection(ctx, ssh_config, stream, peer_addr).await;
                });
            }
        }
    }
}

async fn handle_connection(
    ctx: Arc<AppContext>,
    ssh_config: Arc<SshConfig>,
    stream: TcpStream,
    peer_addr: std::net::SocketAddr,
) {
    debug!(peer = %peer_addr, "Connection accepted");
    ctx.capture.log_connection_new(&peer_addr);

    let client_version = ClientVersion::new();
    let stream = BannerStream::new(stream, client_version.clone());
    let handler = ConnectionHandler::new(ctx.clone(), peer_addr, client_version);

    match russh::server::run_stream(ssh_config, stream, handler).await {
        Ok(session) => {
            if let Err(e) = session.await {
                debug!(peer = %peer_addr, error = %e, "Connection ended with error");
                ctx.capture
                    .log_connection_error(&peer_addr, &e.to_string());
            } else {
                debug!(peer = %peer_addr, "Connection closed");
            }
        }
        Err(e) => {
            // Handshake never completed; port scanners land here constantly.
            debug!(peer = %peer_addr, error = %e, "Handshake failed");
            ctx.capture
                .log_connection_error(&peer_addr, &e.to_string());
        }
    }
}

#[cfg(unix)]
fn spawn_signal_handler(capture: Arc<CaptureLog>, shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGHUP handler");
                return;
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    info!("SIGHUP received, reopening capture log");
                    capture.reopen();
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    shutdown.cancel();
                    return;
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "ctrl-c handler failed");
                    }
                    shutdown.cancel();
                    return;
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_signal_handler(_capture: Arc<CaptureLog>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });
}
