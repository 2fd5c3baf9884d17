//! Interactive shell emulation.
//!
//! A [`ShellSession`] is a pure state machine fed raw channel data by the
//! connection handler. It echoes input back, answers each completed line with
//! junk output and a fresh prompt, and recognizes `exit`. Keeping it free of
//! any I/O makes the line handling directly testable.

use std::time::Instant;

/// Bytes of initial input retained as the session fingerprint.
pub const HEAD_CAPACITY: usize = 100;

const EXIT_KEYWORD: &[u8] = b"exit";

/// Outcome of feeding a chunk of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep reading from the channel.
    Continue,
    /// The client typed `exit`; the channel should be closed.
    Exit,
}

/// Final accounting for a shell session that ended cleanly.
#[derive(Debug, Clone)]
pub struct ShellSummary {
    /// Wall-clock session length, truncated to whole seconds.
    pub duration_secs: u64,
    /// Total bytes received from the client.
    pub total_bytes: u64,
    /// The first [`HEAD_CAPACITY`] bytes of input.
    pub head: Vec<u8>,
}

pub struct ShellSession {
    prompt: String,
    head: Vec<u8>,
    total: u64,
    started: Instant,
    finished: bool,
}

impl ShellSession {
    pub fn new(username: &str) -> Self {
        Self {
            prompt: format!("[{username}@localhost] $ "),
            head: Vec::with_capacity(HEAD_CAPACITY),
            total: 0,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Processes one inbound chunk, appending everything to send back to
    /// `out`. Lines are delimited per chunk: a line split across chunks is
    /// echoed in parts and each part answered on its own.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Step {
        if self.finished {
            return Step::Exit;
        }

        // Head is captured before the chunk counts toward the total, so the
        // fingerprint always covers the earliest bytes.
        if (self.total as usize) < HEAD_CAPACITY {
            let room = HEAD_CAPACITY - self.total as usize;
            let take = room.min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
        }
        self.total += chunk.len() as u64;

        let mut line_start = 0;
        for (i, &b) in chunk.iter().enumerate() {
            if b != b'\n' {
                continue;
            }
            let line = &chunk[line_start..=i];
            out.extend_from_slice(line);
            if line.trim_ascii() == EXIT_KEYWORD {
                self.finished = true;
                return Step::Exit;
            }
            super::write_junk(self.head.len(), out);
            out.push(b'\n');
            out.extend_from_slice(self.prompt.as_bytes());
            line_start = i + 1;
        }
        // Trailing partial line: echo only, no junk until it completes.
        out.extend_from_slice(&chunk[line_start..]);
        Step::Continue
    }

    /// Closes the session and returns its summary. Idempotent callers should
    /// check [`is_finished`](Self::is_finished) first; the duration is taken
    /// at the first call.
    pub fn finish(&mut self) -> ShellSummary {
        self.finished = true;
        ShellSummary {
            duration_secs: self.started.elapsed().as_secs(),
            total_bytes: self.total,
            head: self.head.clone(),
        }
    }
}
