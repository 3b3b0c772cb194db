//! `[mail]` section configuration.
//!
//! SMTP transport settings for mail dispatch. Leave the section out (or
//! `host` empty) to run without a mail transport; the send endpoint then
//! rejects requests instead of failing at startup.
//!
//! # Example
//!
//! ```toml
//! [mail]
//! host = "smtp.example.com"
//! port = 587
//! username = "mailer"
//! password = "..."
//! from = "Studio <studio@example.com>"
//! starttls = true             # false = implicit TLS (SMTPS, usually 465)
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// SMTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// SMTP relay host. Empty disables mail dispatch.
    pub host: String,

    /// SMTP port.
    pub port: u16,

    /// Relay credentials, both or neither.
    pub username: Option<String>,
    pub password: Option<String>,

    /// Sender mailbox, `Name <user@host>` or plain `user@host`.
    pub from: String,

    /// Use STARTTLS on a plain connection instead of implicit TLS.
    pub starttls: bool,
}

impl MailConfig {
    pub const F_PORT: FieldPath = FieldPath::new("mail.port");
    pub const F_USERNAME: FieldPath = FieldPath::new("mail.username");
    pub const F_FROM: FieldPath = FieldPath::new("mail.from");

    /// Whether a transport should be constructed at all.
    pub fn enabled(&self) -> bool {
        !self.host.is_empty()
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.enabled() {
            return;
        }

        if self.port == 0 {
            diag.error(Self::F_PORT, "must be between 1 and 65535");
        }
        if self.from.is_empty() {
            diag.error_with_hint(
                Self::F_FROM,
                "required when a mail host is configured",
                "set the sender, e.g. `Studio <studio@example.com>`",
            );
        }
        if self.username.is_some() != self.password.is_some() {
            diag.error(
                Self::F_USERNAME,
                "username and password must be set together",
            );
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: None,
            password: None,
            from: String::new(),
            starttls: true,
        }
    }
}
