//! Workbook upload, listing and deletion.
//!
//! `POST /api/documents` takes a multipart form with a `file` part (the
//! spreadsheet) and an optional `name` part overriding the stored
//! document name. The workbook is persisted to disk first, then parsed
//! into the fact store; a workbook calamine cannot open is rejected
//! with 422 and the staged file is removed again.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::StoredDocument;
use crate::pipeline::ingest::{self, IngestSummary, SHEET_TEXT_CAP};

#[derive(Serialize)]
pub struct UploadResponse {
    pub document: String,
    pub sheet: String,
    pub records_created: usize,
    pub records_replaced: usize,
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<StoredDocument>,
}

/// `POST /api/documents` — store and ingest one workbook.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut name_override: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("file part needs a filename".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read file part: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read name part: {e}")))?;
                if !value.trim().is_empty() {
                    name_override = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::BadRequest("missing file part".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }
    let document_name = name_override.unwrap_or_else(|| filename.clone());

    let path = ctx.documents.save(&filename, &bytes)?;

    let summary = match run_ingest(&ctx, path.clone(), document_name.clone()).await {
        Ok(summary) => summary,
        Err(err) => {
            // Don't keep a workbook we could not parse.
            ctx.documents.remove(&path);
            return Err(err);
        }
    };

    Ok(Json(UploadResponse {
        document: document_name,
        sheet: summary.sheet,
        records_created: summary.records_created,
        records_replaced: summary.records_replaced,
    }))
}

/// Parsing is synchronous calamine work, so it runs off the async
/// runtime. The flattened sheet text is attached afterwards for the
/// excerpt fallback.
async fn run_ingest(
    ctx: &ApiContext,
    path: PathBuf,
    document_name: String,
) -> Result<IngestSummary, ApiError> {
    let facts = ctx.facts.clone();
    let handle = tokio::task::spawn_blocking(move || {
        let summary = ingest::ingest_workbook(facts.as_ref(), &path, &document_name)?;
        let raw_text = ingest::extract_sheet_text(&path, SHEET_TEXT_CAP);
        facts.upsert_document(
            &document_name,
            &path.display().to_string(),
            Some(&raw_text),
        )?;
        Ok::<_, ApiError>(summary)
    });
    handle
        .await
        .map_err(|e| ApiError::Internal(format!("ingest worker crashed: {e}")))?
}

/// `GET /api/documents` — every known document, sorted by name.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = ctx.facts.list_documents()?;
    Ok(Json(DocumentListResponse { documents }))
}

/// `DELETE /api/documents/:id` — drop the document, its records and
/// its file on disk.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::BadRequest("document id must be a UUID".into()))?;

    let stored = ctx
        .facts
        .list_documents()?
        .into_iter()
        .find(|d| d.id == id);

    let deleted = ctx.facts.delete_document(id)?;
    if !deleted {
        return Err(ApiError::NotFound(format!("no document with id {id}")));
    }
    if let Some(doc) = stored {
        ctx.documents.remove(FsPath::new(&doc.storage_path));
    }
    tracing::info!(%id, "document deleted");
    Ok(Json(serde_json::json!({ "deleted": id })))
}
