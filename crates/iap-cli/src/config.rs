//! Process configuration from environment.

use std::env;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on grid worker threads; `None` uses available parallelism
    pub workers: Option<usize>,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            workers: lookup("IAP_WORKERS")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0),
            log_json: lookup("IAP_LOG_JSON")
                .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Command-line worker cap wins over the environment.
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if workers.is_some() {
            self.workers = workers;
        }
        self
    }
}
