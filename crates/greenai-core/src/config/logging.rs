//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Tracing subscriber settings for the server binary.
///
/// `RUST_LOG`, when set, takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `"info"` or `"greenai_realtime=debug,info"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// `"json"` for structured output, anything else for human-readable.
    #[serde(default = "default_format")]
    pub format: String,
    /// Emit thread ids on every event; useful when tracing lock contention.
    #[serde(default)]
    pub thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// Whether JSON output is selected.
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_level() -> String {
    "info,greenai_realtime=debug".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}
