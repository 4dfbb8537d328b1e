//! Fact store boundary.
//!
//! The graph of Document / Clinic / Pathology / Record facts lives
//! behind the `FactStore` trait so the pipeline never depends on a
//! concrete backend. `memory.rs` is the reference implementation used
//! by the server and by tests; `files.rs` keeps the raw workbook bytes
//! on disk next to it.

pub mod files;
pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{AggregateFilter, AggregateRow, StoredDocument};

/// Aggregate queries are capped so a broad question cannot flood the
/// prompt with rows.
pub const AGGREGATE_ROW_CAP: usize = 50;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Opaque handle to a stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub(crate) u64);

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStats {
    pub documents: usize,
    pub clinics: usize,
    pub pathologies: usize,
    pub records: usize,
}

/// Minimal contract over the fact graph.
///
/// Document, Clinic and Pathology are unique by name and upserted
/// (merge semantics); Records are plain-created, owned by a Document
/// and linked to exactly one Clinic and one Pathology.
pub trait FactStore: Send + Sync {
    /// Merge-by-name: creates the Document or updates its storage path
    /// and sheet text on re-upload. Never duplicates.
    fn upsert_document(
        &self,
        name: &str,
        storage_path: &str,
        raw_text: Option<&str>,
    ) -> Result<NodeRef, StoreError>;

    fn upsert_clinic(&self, name: &str) -> Result<NodeRef, StoreError>;

    fn upsert_pathology(&self, name: &str) -> Result<NodeRef, StoreError>;

    /// Plain create: one Record per ingested non-zero cell, with its
    /// three relations attached in the same call.
    fn create_record(
        &self,
        document: NodeRef,
        clinic: NodeRef,
        pathology: NodeRef,
        quantity: f64,
    ) -> Result<NodeRef, StoreError>;

    /// Drop every Record owned by the document. Returns how many were
    /// removed. Re-ingestion calls this first (delete-and-replace).
    fn clear_document_records(&self, document: NodeRef) -> Result<usize, StoreError>;

    fn list_documents(&self) -> Result<Vec<StoredDocument>, StoreError>;

    /// Detach-delete: the document and its Records go together.
    /// Returns false for unknown ids.
    fn delete_document(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Sum of quantity grouped by (pathology, clinic), filtered,
    /// capped at [`AGGREGATE_ROW_CAP`] rows, ordered by total
    /// descending then names ascending.
    fn aggregate_records(&self, filter: &AggregateFilter) -> Result<Vec<AggregateRow>, StoreError>;

    fn stats(&self) -> Result<StoreStats, StoreError>;
}
