//! Config and storage health check.
//!
//! `mailforge check` loads the config (which already runs full section
//! validation) and then probes the configured storage backend with a
//! read-only listing, so a broken root directory or unreachable gateway
//! shows up before the server is started.

use crate::config::{StorageBackend, StudioConfig};
use crate::{debug, log, store};
use anyhow::{Context, Result};

/// Run the `check` command.
pub async fn run(config: &StudioConfig) -> Result<()> {
    log!("check"; "config ok: {}", config.config_path.display());

    match config.storage.backend {
        StorageBackend::Local => {
            log!("check"; "storage backend: local ({})", config.storage.root.display());
        }
        StorageBackend::Remote => {
            log!("check"; "storage backend: remote ({})", config.storage.endpoint);
        }
    }

    let store = store::from_config(&config.storage).context("Failed to construct asset store")?;
    let keys = store
        .list("")
        .await
        .context("Storage backend probe failed")?;

    log!("check"; "storage reachable, {} stored object(s)", keys.len());
    crate::debug_do! {
        for key in keys.iter().take(20) {
            debug!("check"; "- {}", key);
        }
    }

    if config.mail.enabled() {
        log!("check"; "mail dispatch enabled via {}:{}", config.mail.host, config.mail.port);
    } else {
        log!("check"; "mail dispatch disabled (no [mail] host configured)");
    }

    Ok(())
}
