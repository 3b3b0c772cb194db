//! HTTP request handlers.
//!
//! Handlers decode the wire format, call into the pipelines and translate
//! the outcome; everything with behavior worth testing lives behind them
//! in `upload`, `export`, `store` and `mail`.

use crate::error::ServiceError;
use crate::export::{self, ExportBundle, ExportRequest};
use crate::log;
use crate::store::CopyReport;
use crate::upload::{self, FormPart, Formatter, UploadOptions};
use crate::utils::{mime, slug};
use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::AppState;

/// Chunk size for streaming the finished archive spool to the client.
const SPOOL_CHUNK_BYTES: usize = 64 * 1024;

// =============================================================================
// Upload
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub prefix: Option<String>,
    #[serde(default)]
    pub formatter: Formatter,
}

/// POST `/upload` — store every file part of a multipart submission.
pub async fn upload_assets(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<Json<Value>, ServiceError> {
    let parts = collect_parts(multipart).await?;
    let options = UploadOptions::new(query.prefix.as_deref(), query.formatter);

    let result = upload::run(parts, &options, state.store.clone()).await?;
    log!("upload"; "stored {} asset(s) under '{}'", result.stored.len(), options.prefix);

    Ok(Json(upload::render(&result, options.formatter)))
}

/// Decode the multipart body into pipeline parts.
///
/// Role decisions (markup field, legacy `files[]`, droppable parts) are
/// made by `upload::classify`, not here.
async fn collect_parts(mut multipart: Multipart) -> Result<Vec<FormPart>, ServiceError> {
    let mut parts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServiceError::Validation(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|err| {
            ServiceError::Validation(format!("failed to read part `{name}`: {err}"))
        })?;

        parts.push(FormPart {
            name,
            file_name,
            content_type,
            data,
        });
    }

    Ok(parts)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

/// GET `/upload?prefix=` — stored keys in the single-file-widget shape.
///
/// The prefix goes through the same normalization as on upload, so the
/// caller can pass the original display name and still match.
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ServiceError> {
    let prefix = query.prefix.as_deref().map(slug::slug).unwrap_or_default();
    let files = state.store.list(&prefix).await?;
    Ok(Json(json!({ "files": files })))
}

// =============================================================================
// Export
// =============================================================================

/// POST `/export` — build the self-contained archive and stream it back.
pub async fn export_mailing(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, ServiceError> {
    let bundle = export::export(request, &state.fetcher, &state.config.export).await?;
    Ok(zip_response(bundle))
}

/// Stream the finalized spool as a zip download.
///
/// The spool is complete before the first byte leaves, so stream-end is
/// a reliable completeness signal for the client.
fn zip_response(bundle: ExportBundle) -> Response {
    let filename = format!("{}.zip", bundle.archive_name);
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(8);

    let mut spool = tokio::fs::File::from_std(bundle.spool);
    tokio::spawn(async move {
        let mut buf = vec![0u8; SPOOL_CHUNK_BYTES];
        loop {
            match spool.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tx.send(Err(err)).await.ok();
                    break;
                }
            }
        }
    });

    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

// =============================================================================
// Assets
// =============================================================================

/// GET `/assets/{key}` — read a stored object back.
pub async fn get_asset(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ServiceError> {
    let data = state.store.read(&key).await?;
    let content_type = mime::from_key(&key);
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CopyRequest {
    pub source_prefix: String,
    pub target_prefix: String,
}

/// POST `/assets/copy` — duplicate one mailing's asset set under a new
/// prefix. Partial failures surface as 409 with the full report attached.
pub async fn copy_assets(
    State(state): State<AppState>,
    Json(request): Json<CopyRequest>,
) -> Result<Json<CopyReport>, ServiceError> {
    if request.source_prefix.is_empty() || request.target_prefix.is_empty() {
        return Err(ServiceError::Validation(
            "source_prefix and target_prefix are required".to_string(),
        ));
    }

    let report = state
        .store
        .copy(&request.source_prefix, &request.target_prefix)
        .await?;
    log!(
        "store";
        "copied {} object(s): '{}' -> '{}'",
        report.copied.len(), request.source_prefix, request.target_prefix
    );

    Ok(Json(report))
}

// =============================================================================
// Mail
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
}

/// POST `/send` — sanitize and dispatch one mailing via SMTP.
pub async fn send_mail(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>, ServiceError> {
    let Some(mailer) = &state.mailer else {
        return Err(ServiceError::Validation(
            "mail dispatch is not configured; set [mail] host in mailforge.toml".to_string(),
        ));
    };

    let summary = mailer
        .send(
            &request.to,
            request.reply_to.as_deref(),
            &request.subject,
            &request.html,
        )
        .await?;
    log!("mail"; "dispatched to {}: {}", request.to, summary);

    Ok(Json(json!({ "status": summary })))
}

// =============================================================================
// Health
// =============================================================================

/// GET `/healthz` — liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
