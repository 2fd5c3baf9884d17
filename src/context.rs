//! Shared per-process state handed to connection handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::capture::CaptureLog;
use crate::config::AppConfig;

pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub capture: Arc<CaptureLog>,
    pub start_time: Instant,
}

impl AppContext {
    pub fn new(config: Arc<AppConfig>, capture: Arc<CaptureLog>) -> Self {
        Self {
            config,
            capture,
            start_time: Instant::now(),
        }
    }
}
