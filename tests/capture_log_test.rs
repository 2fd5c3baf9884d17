use std::net::SocketAddr;
use std::time::Duration;

use sshtrap::capture::CaptureLog;
use tempfile::TempDir;
use tokio::time::sleep;

fn peer() -> SocketAddr {
    "203.0.113.9:54321".parse().unwrap()
}

async fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    let content = tokio::fs::read_to_string(path).await.unwrap();
    content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn events_are_written_as_json_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("capture.log");
    let log = CaptureLog::new(Some(path.clone()));

    log.log_connection_new(&peer());
    log.log_auth_attempt(&peer(), "SSH-2.0-Go", "root", "hunter2");
    log.log_exec_command(&peer(), b"uname -a");
    log.log_shell_closed(&peer(), 3, 42, b"ls\nexit\n");
    sleep(Duration::from_millis(100)).await;

    let lines = read_lines(&path).await;
    assert_eq!(lines.len(), 4);

    assert_eq!(lines[0]["event_type"], "connection.new");
    assert_eq!(lines[0]["source_ip"], "203.0.113.9");
    assert!(lines[0]["timestamp"].is_string());

    assert_eq!(lines[1]["event_type"], "auth.attempt");
    assert_eq!(lines[1]["client_version"], "SSH-2.0-Go");
    assert_eq!(lines[1]["username"], "root");
    assert_eq!(lines[1]["password"], "hunter2");

    assert_eq!(lines[2]["event_type"], "exec.command");
    assert_eq!(lines[2]["command"], "uname -a");

    assert_eq!(lines[3]["event_type"], "shell.closed");
    assert_eq!(lines[3]["duration_secs"], 3);
    assert_eq!(lines[3]["total_bytes"], 42);
    assert_eq!(lines[3]["head"], "ls\nexit\n");
}

#[tokio::test]
async fn non_utf8_command_bytes_are_logged_lossily() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("capture.log");
    let log = CaptureLog::new(Some(path.clone()));

    log.log_exec_command(&peer(), b"\xff\xfecat /etc/passwd");
    sleep(Duration::from_millis(100)).await;

    let lines = read_lines(&path).await;
    assert_eq!(lines.len(), 1);
    let command = lines[0]["command"].as_str().unwrap();
    assert!(command.ends_with("cat /etc/passwd"));
}

#[tokio::test]
async fn reopen_follows_rotation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("capture.log");
    let rotated = dir.path().join("capture.log.1");
    let log = CaptureLog::new(Some(path.clone()));

    log.log_connection_new(&peer());
    sleep(Duration::from_millis(100)).await;

    tokio::fs::rename(&path, &rotated).await.unwrap();
    log.reopen();
    log.log_exec_command(&peer(), b"id");
    sleep(Duration::from_millis(100)).await;

    let old_lines = read_lines(&rotated).await;
    assert_eq!(old_lines.len(), 1);
    assert_eq!(old_lines[0]["event_type"], "connection.new");

    let new_lines = read_lines(&path).await;
    assert_eq!(new_lines.len(), 1);
    assert_eq!(new_lines[0]["event_type"], "exec.command");
}

#[tokio::test]
async fn noop_sink_accepts_everything() {
    let log = CaptureLog::new_noop();
    log.log_connection_new(&peer());
    log.log_auth_attempt(&peer(), "SSH-2.0-Go", "root", "x");
    log.log_shell_aborted(&peer(), 7);
    log.reopen();
    assert_eq!(log.dropped_count(), 0);
}
