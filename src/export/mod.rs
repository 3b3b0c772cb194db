//! Mailing export: rewrite, re-fetch, archive.
//!
//! Turns one mailing's HTML into a self-contained zip: remote images are
//! downloaded into the archive and every reference is rewritten to a
//! relative path, so the result opens offline and survives the source
//! CDN going away.
//!
//! # Module Structure
//!
//! | Module     | Responsibility                                    |
//! |------------|----------------------------------------------------|
//! | `refs`     | Extract remote URLs from the three HTML shapes     |
//! | `manifest` | Dedup URLs, assign archive-relative paths, rewrite |
//! | `archive`  | Zip assembly over a rewindable spool file          |

mod archive;
mod manifest;
mod refs;

use crate::config::ExportConfig;
use crate::error::ServiceError;
use crate::utils::{html, slug};
use crate::{debug, log};
use archive::ZipSink;
use bytes::Bytes;
use manifest::{Manifest, ManifestEntry};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;

/// How many body chunks a fetch task may buffer ahead of the archive
/// writer before it is backpressured.
const FETCH_CHANNEL_DEPTH: usize = 8;

// =============================================================================
// Types
// =============================================================================

/// One export request: the mailing's raw HTML plus its display name.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub html: String,
    pub name: String,
}

/// A finalized archive, rewound and ready to stream.
#[derive(Debug)]
pub struct ExportBundle {
    /// Slugged root name; also the suggested download filename stem.
    pub archive_name: String,
    /// Complete zip. `finish` already rewound it to the start.
    pub spool: std::fs::File,
    pub fetched: usize,
    pub skipped: usize,
}

/// Wire protocol between a fetch task and the archive coordinator.
///
/// `Begin` is sent only after an HTTP 200, so an entry whose channel
/// closes without it never touched the archive. A close after `Begin`
/// without `Done` means the task died mid-body and the partial entry
/// must be aborted.
enum FetchEvent {
    Begin,
    Chunk(Bytes),
    Done,
    Failed(String),
}

struct FetchSlot {
    entry: ManifestEntry,
    rx: mpsc::Receiver<FetchEvent>,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Run the full export pipeline for one mailing.
///
/// Asset failures (bad status, transport error, timeout) skip the asset
/// and keep exporting; only local archive errors fail the request.
pub async fn export(
    request: ExportRequest,
    client: &reqwest::Client,
    config: &ExportConfig,
) -> Result<ExportBundle, ServiceError> {
    if request.html.trim().is_empty() {
        return Err(ServiceError::Validation(
            "export requires a non-empty html document".to_string(),
        ));
    }

    let archive_name = archive_root_name(&request.name);
    let manifest = Manifest::build(&refs::extract(&request.html));
    debug!("export"; "'{}': {} remote asset(s) referenced", archive_name, manifest.len());

    let rewritten = manifest.rewrite(&request.html);
    let document = html::sanitize(&rewritten);

    let mut sink = ZipSink::create()?;
    sink.add_text(&format!("{archive_name}/{archive_name}.html"), &document)?;

    let (fetched, skipped) =
        fetch_assets(&mut sink, &archive_name, &manifest, client, config).await?;

    let spool = sink.finish()?;
    log!(
        "export";
        "'{}' archived: {} asset(s) bundled, {} skipped",
        archive_name, fetched, skipped
    );

    Ok(ExportBundle {
        archive_name,
        spool,
        fetched,
        skipped,
    })
}

/// Archive root directory name, derived from the mailing's display name.
fn archive_root_name(name: &str) -> String {
    let slugged = slug::slug(slug::strip_document_ext(name));
    if slugged.is_empty() {
        "mailing".to_string()
    } else {
        slugged
    }
}

// =============================================================================
// Fetch fan-out
// =============================================================================

/// Download every manifest entry into the archive.
///
/// Runs a sliding window of fetch tasks: at most `max_concurrent_fetches`
/// in flight, drained into the zip in manifest order. The entry currently
/// being written always has a running task, so draining can never wait on
/// a task that has not started. Returns `(fetched, skipped)`.
async fn fetch_assets(
    sink: &mut ZipSink,
    root: &str,
    manifest: &Manifest,
    client: &reqwest::Client,
    config: &ExportConfig,
) -> Result<(usize, usize), ServiceError> {
    if manifest.is_empty() {
        return Ok((0, 0));
    }

    let timeout = config.fetch_timeout();
    let mut tasks = JoinSet::new();
    let mut slots: VecDeque<FetchSlot> = VecDeque::new();
    let mut queue = manifest.entries().iter();
    let mut fetched = 0usize;
    let mut skipped = 0usize;

    loop {
        while slots.len() < config.max_concurrent_fetches {
            let Some(entry) = queue.next() else { break };
            slots.push_back(spawn_fetch(&mut tasks, client, entry, timeout));
        }
        let Some(slot) = slots.pop_front() else { break };

        if drain_slot(sink, root, slot).await? {
            fetched += 1;
        } else {
            skipped += 1;
        }
    }

    // All channels are drained, so every task has settled; reap them.
    while tasks.join_next().await.is_some() {}

    Ok((fetched, skipped))
}

fn spawn_fetch(
    tasks: &mut JoinSet<()>,
    client: &reqwest::Client,
    entry: &ManifestEntry,
    timeout: Duration,
) -> FetchSlot {
    let (tx, rx) = mpsc::channel(FETCH_CHANNEL_DEPTH);
    let url = entry.fetch_url().into_owned();
    let client = client.clone();

    tasks.spawn(async move {
        match tokio::time::timeout(timeout, fetch_into(&client, &url, &tx)).await {
            Ok(Ok(())) => {
                tx.send(FetchEvent::Done).await.ok();
            }
            Ok(Err(reason)) => {
                tx.send(FetchEvent::Failed(reason)).await.ok();
            }
            Err(_) => {
                let reason = format!("timed out after {}s", timeout.as_secs());
                tx.send(FetchEvent::Failed(reason)).await.ok();
            }
        }
    });

    FetchSlot {
        entry: entry.clone(),
        rx,
    }
}

/// Request one asset and forward its body chunk-by-chunk.
///
/// `tx` stays borrowed so the caller can still report a timeout on the
/// same channel after this future is cancelled.
async fn fetch_into(
    client: &reqwest::Client,
    url: &str,
    tx: &mpsc::Sender<FetchEvent>,
) -> Result<(), String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| err.to_string())?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(format!("status {status}"));
    }
    if tx.send(FetchEvent::Begin).await.is_err() {
        return Err("coordinator dropped".to_string());
    }

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|err| err.to_string())?;
        if tx.send(FetchEvent::Chunk(chunk)).await.is_err() {
            return Err("coordinator dropped".to_string());
        }
    }
    Ok(())
}

/// Drain one entry's events into the archive. `Ok(true)` means bundled.
async fn drain_slot(
    sink: &mut ZipSink,
    root: &str,
    slot: FetchSlot,
) -> Result<bool, ServiceError> {
    let FetchSlot { entry, mut rx } = slot;
    let mut begun = false;
    let mut completed = false;
    let mut failure: Option<String> = None;

    while let Some(event) = rx.recv().await {
        match event {
            FetchEvent::Begin => {
                sink.begin_entry(&format!("{root}/{}", entry.rel_path))?;
                begun = true;
            }
            FetchEvent::Chunk(chunk) => sink.write_chunk(&chunk)?,
            FetchEvent::Done => completed = true,
            FetchEvent::Failed(reason) => failure = Some(reason),
        }
    }

    if completed {
        debug!("export"; "bundled {} -> {}", entry.remote_url, entry.rel_path);
        return Ok(true);
    }
    if begun {
        sink.abort_entry()?;
    }
    let reason = failure.unwrap_or_else(|| "fetch task died".to_string());
    log!("export"; "skipping {}: {}", entry.remote_url, reason);
    Ok(false)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use std::io::Read;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn stub_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(timeout_secs: u64, concurrency: usize) -> ExportConfig {
        ExportConfig {
            fetch_timeout_secs: timeout_secs,
            max_concurrent_fetches: concurrency,
        }
    }

    fn entry_text(archive: &mut zip::ZipArchive<std::fs::File>, path: &str) -> String {
        let mut entry = archive.by_name(path).unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        text
    }

    #[tokio::test]
    async fn test_export_bundles_html_and_assets() {
        let app = Router::new()
            .route("/logo.png", get(|| async { "logo-bytes" }))
            .route("/banner.jpg", get(|| async { "banner-bytes" }));
        let base = stub_server(app).await;

        let html = format!(
            r#"<img src="{base}/logo.png"><div background="{base}/banner.jpg"></div><td style="background:url({base}/logo.png)"></td>"#
        );
        let request = ExportRequest {
            html,
            name: "Newsletter June".to_string(),
        };

        let bundle = export(request, &reqwest::Client::new(), &config(5, 4))
            .await
            .unwrap();

        assert_eq!(bundle.archive_name, "newsletter-june");
        assert_eq!(bundle.fetched, 2);
        assert_eq!(bundle.skipped, 0);

        let mut archive = zip::ZipArchive::new(bundle.spool).unwrap();
        assert_eq!(archive.len(), 3);

        let doc = entry_text(&mut archive, "newsletter-june/newsletter-june.html");
        assert!(!doc.contains("http://"));
        assert_eq!(doc.matches("images/logo.png").count(), 2);
        assert!(doc.contains("images/banner.jpg"));

        assert_eq!(
            entry_text(&mut archive, "newsletter-june/images/logo.png"),
            "logo-bytes"
        );
        assert_eq!(
            entry_text(&mut archive, "newsletter-june/images/banner.jpg"),
            "banner-bytes"
        );
    }

    #[tokio::test]
    async fn test_export_fetches_each_url_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/x.png",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "x-bytes"
                }
            }),
        );
        let base = stub_server(app).await;

        let html = format!(
            r#"<img src="{base}/x.png"><img src="{base}/x.png"><div background="{base}/x.png"></div>"#
        );
        let request = ExportRequest {
            html,
            name: "repeat".to_string(),
        };

        let bundle = export(request, &reqwest::Client::new(), &config(5, 4))
            .await
            .unwrap();

        assert_eq!(bundle.fetched, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_export_skips_failed_assets() {
        let app = Router::new()
            .route("/ok.png", get(|| async { "ok-bytes" }))
            .route(
                "/err.png",
                get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let base = stub_server(app).await;

        let html = format!(
            r#"<img src="{base}/ok.png"><img src="{base}/err.png"><img src="{base}/gone.png">"#
        );
        let request = ExportRequest {
            html,
            name: "partial".to_string(),
        };

        let bundle = export(request, &reqwest::Client::new(), &config(5, 4))
            .await
            .unwrap();

        assert_eq!(bundle.fetched, 1);
        assert_eq!(bundle.skipped, 2);

        let mut archive = zip::ZipArchive::new(bundle.spool).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(entry_text(&mut archive, "partial/images/ok.png"), "ok-bytes");
        assert!(archive.by_name("partial/images/err.png").is_err());
    }

    #[tokio::test]
    async fn test_export_finalizes_after_all_fetches_settle() {
        let app = Router::new()
            .route("/fast.png", get(|| async { "fast" }))
            .route(
                "/slow.png",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    "slow"
                }),
            )
            .route(
                "/slower.png",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    "slower"
                }),
            );
        let base = stub_server(app).await;

        let html = format!(
            r#"<img src="{base}/slower.png"><img src="{base}/fast.png"><img src="{base}/slow.png">"#
        );
        let request = ExportRequest {
            html,
            name: "staggered".to_string(),
        };

        let bundle = export(request, &reqwest::Client::new(), &config(5, 2))
            .await
            .unwrap();

        assert_eq!(bundle.fetched, 3);
        let mut archive = zip::ZipArchive::new(bundle.spool).unwrap();
        assert_eq!(entry_text(&mut archive, "staggered/images/slower.png"), "slower");
        assert_eq!(entry_text(&mut archive, "staggered/images/slow.png"), "slow");
        assert_eq!(entry_text(&mut archive, "staggered/images/fast.png"), "fast");
    }

    #[tokio::test]
    async fn test_export_times_out_slow_fetch() {
        let app = Router::new().route(
            "/stuck.png",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "never"
            }),
        );
        let base = stub_server(app).await;

        let request = ExportRequest {
            html: format!(r#"<img src="{base}/stuck.png">"#),
            name: "stuck".to_string(),
        };

        let bundle = export(request, &reqwest::Client::new(), &config(1, 4))
            .await
            .unwrap();

        assert_eq!(bundle.fetched, 0);
        assert_eq!(bundle.skipped, 1);
        let mut archive = zip::ZipArchive::new(bundle.spool).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[tokio::test]
    async fn test_export_rejects_empty_html() {
        let request = ExportRequest {
            html: "   \n".to_string(),
            name: "empty".to_string(),
        };
        let err = export(request, &reqwest::Client::new(), &config(5, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_export_without_references_falls_back_name() {
        let request = ExportRequest {
            html: "<p>plain text mailing</p>".to_string(),
            name: "???".to_string(),
        };

        let bundle = export(request, &reqwest::Client::new(), &config(5, 4))
            .await
            .unwrap();

        assert_eq!(bundle.archive_name, "mailing");
        assert_eq!(bundle.fetched, 0);
        assert_eq!(bundle.skipped, 0);

        let mut archive = zip::ZipArchive::new(bundle.spool).unwrap();
        assert_eq!(archive.len(), 1);
        assert!(entry_text(&mut archive, "mailing/mailing.html").contains("plain text mailing"));
    }

    #[tokio::test]
    async fn test_export_strips_document_extension_from_name() {
        let request = ExportRequest {
            html: "<p>doc</p>".to_string(),
            name: "Sommer Aktion.HTML".to_string(),
        };
        let bundle = export(request, &reqwest::Client::new(), &config(5, 4))
            .await
            .unwrap();

        assert_eq!(bundle.archive_name, "sommer-aktion");
        let mut archive = zip::ZipArchive::new(bundle.spool).unwrap();
        assert!(archive.by_name("sommer-aktion/sommer-aktion.html").is_ok());
    }
}
