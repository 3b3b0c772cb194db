//! `[export]` section configuration.
//!
//! Controls the asset re-fetch stage of archive exports.
//!
//! # Example
//!
//! ```toml
//! [export]
//! fetch_timeout_secs = 20     # Per-asset fetch budget (request + body)
//! max_concurrent_fetches = 8  # Parallel asset downloads per export
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Export pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Seconds allowed per asset fetch, covering the request and the
    /// full body drain. A timed-out asset is skipped, not fatal.
    pub fetch_timeout_secs: u64,

    /// How many asset fetches may run at once within one export.
    pub max_concurrent_fetches: usize,
}

impl ExportConfig {
    pub const F_FETCH_TIMEOUT: FieldPath = FieldPath::new("export.fetch_timeout_secs");
    pub const F_MAX_CONCURRENT: FieldPath = FieldPath::new("export.max_concurrent_fetches");

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.fetch_timeout_secs == 0 {
            diag.error(Self::F_FETCH_TIMEOUT, "must be at least 1 second");
        }
        if self.max_concurrent_fetches == 0 {
            diag.error_with_hint(
                Self::F_MAX_CONCURRENT,
                "must be at least 1",
                "zero concurrency would stall every export",
            );
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 20,
            max_concurrent_fetches: 8,
        }
    }
}
