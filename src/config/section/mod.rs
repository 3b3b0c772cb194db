//! Configuration section definitions.
//!
//! Each module corresponds to a section in `mailforge.toml`:
//!
//! | Module    | TOML Section  | Purpose                           |
//! |-----------|---------------|-----------------------------------|
//! | `server`  | `[server]`    | HTTP interface, port, body limit  |
//! | `storage` | `[storage]`   | Asset backend selection           |
//! | `export`  | `[export]`    | Fetch timeout and concurrency     |
//! | `mail`    | `[mail]`      | SMTP transport                    |

mod export;
mod mail;
mod server;
mod storage;

// Re-export section configs
pub use export::ExportConfig;
pub use mail::MailConfig;
pub use server::ServerConfig;
pub use storage::{StorageBackend, StorageConfig};
