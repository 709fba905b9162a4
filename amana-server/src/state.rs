//! Application state

use amana_core::Catalogue;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The book catalogue
    pub catalogue: Arc<Catalogue>,

    /// Tokens accepted by the write endpoints
    pub api_tokens: Arc<BTreeSet<String>>,

    /// Server start time
    pub start_time: Instant,

    /// Debug mode flag
    pub debug: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(catalogue: Arc<Catalogue>, api_tokens: BTreeSet<String>) -> Self {
        Self {
            catalogue,
            api_tokens: Arc::new(api_tokens),
            start_time: Instant::now(),
            debug: false,
        }
    }

    /// Create application state with debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Whether `token` is on the allow-list
    pub fn is_valid_token(&self, token: &str) -> bool {
        self.api_tokens.contains(token)
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
