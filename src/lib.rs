//! sshtrap: a low-interaction SSH deception server.
//!
//! Presents a plausible SSH server, accepts almost any password, and answers
//! exec and shell requests with fabricated output while recording credentials
//! and commands to an append-only capture log. Nothing is ever executed.

pub mod capture;
pub mod cli;
pub mod config;
pub mod context;
pub mod emulator;
pub mod logging;
pub mod server;
pub mod ssh;
