//! `[server]` section configuration.
//!
//! Contains HTTP server settings.
//!
//! # Example
//!
//! ```toml
//! [server]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 8750                 # HTTP port number
//! max_body_mb = 25            # Upload body size cap in megabytes
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Maximum accepted request body size in megabytes.
    /// Bounds multipart uploads and export payloads alike.
    pub max_body_mb: u64,
}

impl ServerConfig {
    pub const F_MAX_BODY_MB: FieldPath = FieldPath::new("server.max_body_mb");

    /// Body limit in bytes, as handed to the HTTP layer.
    pub fn max_body_bytes(&self) -> usize {
        (self.max_body_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.max_body_mb == 0 {
            diag.error_with_hint(
                Self::F_MAX_BODY_MB,
                "must be at least 1",
                "a zero body limit would reject every upload",
            );
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8750,
            max_body_mb: 25,
        }
    }
}
