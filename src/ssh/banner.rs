//! Client identification line capture.
//!
//! The protocol library consumes the client's `SSH-...` identification line
//! during the version exchange without surfacing it to the server handler,
//! but the authentication policy keys on it. [`BannerStream`] wraps the TCP
//! stream before it is handed over and records the first line it sees; the
//! version exchange completes before any authentication request, so the
//! value is always available by the time the policy runs.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// RFC 4253 caps the identification line at 255 bytes including CRLF.
const MAX_BANNER_LEN: usize = 255;

/// Shared cell holding the captured client version string. Cloned into both
/// the stream wrapper and the connection handler.
#[derive(Clone, Default)]
pub struct ClientVersion(Arc<Mutex<Option<String>>>);

impl ClientVersion {
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured version line, or `"unknown"` if none was seen yet.
    pub fn get(&self) -> String {
        self.0
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Records the version line. The first capture wins.
    pub fn record(&self, version: &str) {
        if let Ok(mut guard) = self.0.lock() {
            guard.get_or_insert_with(|| version.to_string());
        }
    }
}

/// Transparent stream wrapper that records the first line read from the
/// client into a [`ClientVersion`] and otherwise passes bytes through
/// untouched.
pub struct BannerStream<S> {
    inner: S,
    version: ClientVersion,
    pending: Vec<u8>,
    captured: bool,
}

impl<S> BannerStream<S> {
    pub fn new(inner: S, version: ClientVersion) -> Self {
        Self {
            inner,
            version,
            pending: Vec::new(),
            captured: false,
        }
    }

    fn observe(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                self.finish_capture();
                return;
            }
            self.pending.push(b);
            if self.pending.len() >= MAX_BANNER_LEN {
                // Not an SSH client; keep whatever it sent as the version.
                self.finish_capture();
                return;
            }
        }
    }

    fn finish_capture(&mut self) {
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        let line = String::from_utf8_lossy(&self.pending);
        self.version.record(&line);
        self.pending = Vec::new();
        self.captured = true;
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for BannerStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let result = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &result {
            if !this.captured {
                let fresh = buf.filled()[before..].to_vec();
                this.observe(&fresh);
            }
        }
        result
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for BannerStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn captures_version_line_and_passes_data_through() {
        let (mut client, server) = tokio::io::duplex(256);
        let version = ClientVersion::new();
        let mut stream = BannerStream::new(server, version.clone());

        client
            .write_all(b"SSH-2.0-OpenSSH_9.6\r\nkexinit-follows")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();

        assert_eq!(received, b"SSH-2.0-OpenSSH_9.6\r\nkexinit-follows");
        assert_eq!(version.get(), "SSH-2.0-OpenSSH_9.6");
    }

    #[tokio::test]
    async fn capture_is_chunking_independent() {
        let (mut client, server) = tokio::io::duplex(16);
        let version = ClientVersion::new();
        let mut stream = BannerStream::new(server, version.clone());

        let writer = tokio::spawn(async move {
            for chunk in [&b"SSH-2.0-"[..], b"Go", b"\n", b"rest"] {
                client.write_all(chunk).await.unwrap();
                client.flush().await.unwrap();
            }
            client.shutdown().await.unwrap();
        });

        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        writer.await.unwrap();

        assert_eq!(received, b"SSH-2.0-Go\nrest");
        assert_eq!(version.get(), "SSH-2.0-Go");
    }

    #[tokio::test]
    async fn unknown_until_first_line_completes() {
        let version = ClientVersion::new();
        assert_eq!(version.get(), "unknown");
        version.record("SSH-2.0-a");
        version.record("SSH-2.0-b");
        assert_eq!(version.get(), "SSH-2.0-a");
    }
}
