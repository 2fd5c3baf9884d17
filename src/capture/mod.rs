//! Append-only capture log.
//!
//! All interesting client behavior (credentials, commands, shell traffic
//! accounting) flows through a [`CaptureLog`]. Events are pushed onto a
//! bounded channel and written by a single task, which keeps records whole
//! under concurrent connections and makes log rotation a matter of sending
//! one message. When the channel is full events are dropped and counted
//! rather than stalling a connection.

pub mod events;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use events::CaptureEvent;

const CAPTURE_CHANNEL_CAPACITY: usize = 10_000;

enum SinkMsg {
    Event(CaptureEvent),
    Reopen,
}

pub struct CaptureLog {
    sender: Option<mpsc::Sender<SinkMsg>>,
    dropped_count: Arc<AtomicU64>,
}

impl CaptureLog {
    /// Starts the writer task appending to `path`. A `None` path keeps the
    /// sink alive but writes nothing, which still exercises serialization.
    pub fn new(path: Option<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel(CAPTURE_CHANNEL_CAPACITY);
        tokio::spawn(writer_task(receiver, path));
        Self {
            sender: Some(sender),
            dropped_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A sink that discards everything. For tests and `check-config`.
    pub fn new_noop() -> Self {
        Self {
            sender: None,
            dropped_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Asks the writer to close and reopen its file. Writes queued before
    /// this call land in the old file, writes after it in the new one.
    pub fn reopen(&self) {
        let Some(sender) = &self.sender else { return };
        if sender.try_send(SinkMsg::Reopen).is_err() {
            warn!("Capture log channel full, reopen request dropped");
        }
    }

    pub fn log_auth_attempt(
        &self,
        source: &SocketAddr,
        client_version: &str,
        username: &str,
        password: &str,
    ) {
        self.send(CaptureEvent::auth_attempt(
            source,
            client_version,
            username,
            password,
        ));
    }

    pub fn log_connection_new(&self, source: &SocketAddr) {
        self.send(CaptureEvent::connection_new(source));
    }

    pub fn log_connection_error(&self, source: &SocketAddr, error: &str) {
        self.send(CaptureEvent::connection_error(source, error));
    }

    pub fn log_exec_command(&self, source: &SocketAddr, command: &[u8]) {
        self.send(CaptureEvent::exec_command(source, command));
    }

    pub fn log_shell_open(&self, source: &SocketAddr, username: &str) {
        self.send(CaptureEvent::shell_open(source, username));
    }

    pub fn log_shell_closed(
        &self,
        source: &SocketAddr,
        duration_secs: u64,
        total_bytes: u64,
        head: &[u8],
    ) {
        self.send(CaptureEvent::shell_closed(
            source,
            duration_secs,
            total_bytes,
            head,
        ));
    }

    pub fn log_shell_aborted(&self, source: &SocketAddr, total_bytes: u64) {
        self.send(CaptureEvent::shell_aborted(source, total_bytes));
    }

    fn send(&self, event: CaptureEvent) {
        let Some(sender) = &self.sender else { return };
        if sender.try_send(SinkMsg::Event(event)).is_err() {
            let dropped = self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped % 100 == 1 {
                warn!(dropped, "Capture log channel full, dropping events");
            }
        }
    }
}

async fn writer_task(mut receiver: mpsc::Receiver<SinkMsg>, path: Option<PathBuf>) {
    let mut file = open_log(&path).await;

    while let Some(msg) = receiver.recv().await {
        match msg {
            SinkMsg::Reopen => {
                drop(file.take());
                file = open_log(&path).await;
                info!("Capture log reopened");
            }
            SinkMsg::Event(event) => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize capture event");
                        continue;
                    }
                };
                debug!(event_type = event.event_type(), "capture event");
                if let Some(f) = file.as_mut() {
                    if let Err(e) = write_line(f, &json).await {
                        error!(error = %e, "Failed to write capture event");
                    }
                }
            }
        }
    }
}

async fn write_line(file: &mut File, json: &str) -> std::io::Result<()> {
    file.write_all(json.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}

async fn open_log(path: &Option<PathBuf>) -> Option<File> {
    let path = path.as_ref()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!(path = %parent.display(), error = %e, "Failed to create capture log directory");
                return None;
            }
        }
    }
    match OpenOptions::new().append(true).create(true).open(path).await {
        Ok(file) => Some(file),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to open capture log");
            None
        }
    }
}
