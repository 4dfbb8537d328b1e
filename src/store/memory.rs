//! In-memory `FactStore` — the reference backend.
//!
//! Nodes live in maps keyed by their unique name; records in a flat
//! vector. A single `RwLock` guards the whole graph: ingestion writes
//! are batch-shaped and questions only read, so per-node locking buys
//! nothing here.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use super::{FactStore, NodeRef, StoreError, StoreStats, AGGREGATE_ROW_CAP};
use crate::models::{AggregateFilter, AggregateRow, StoredDocument};

#[derive(Debug, Clone)]
struct DocumentNode {
    node: NodeRef,
    id: Uuid,
    name: String,
    storage_path: String,
    raw_text: Option<String>,
}

#[derive(Debug, Clone)]
struct RecordNode {
    document: NodeRef,
    clinic: NodeRef,
    pathology: NodeRef,
    quantity: f64,
}

#[derive(Default)]
struct Graph {
    next_ref: u64,
    /// Keyed by document name (globally unique).
    documents: HashMap<String, DocumentNode>,
    /// name → node, plus reverse lookup for aggregation output.
    clinics: HashMap<String, NodeRef>,
    pathologies: HashMap<String, NodeRef>,
    records: Vec<RecordNode>,
}

impl Graph {
    fn alloc(&mut self) -> NodeRef {
        self.next_ref += 1;
        NodeRef(self.next_ref)
    }

    fn clinic_name(&self, node: NodeRef) -> Option<&str> {
        self.clinics
            .iter()
            .find(|(_, n)| **n == node)
            .map(|(name, _)| name.as_str())
    }

    fn pathology_name(&self, node: NodeRef) -> Option<&str> {
        self.pathologies
            .iter()
            .find(|(_, n)| **n == node)
            .map(|(name, _)| name.as_str())
    }
}

/// Process-local fact graph.
#[derive(Default)]
pub struct InMemoryFactStore {
    graph: RwLock<Graph>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FactStore for InMemoryFactStore {
    fn upsert_document(
        &self,
        name: &str,
        storage_path: &str,
        raw_text: Option<&str>,
    ) -> Result<NodeRef, StoreError> {
        let mut graph = self.graph.write().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(existing) = graph.documents.get_mut(name) {
            existing.storage_path = storage_path.to_string();
            if let Some(text) = raw_text {
                existing.raw_text = Some(text.to_string());
            }
            return Ok(existing.node);
        }
        let node = graph.alloc();
        graph.documents.insert(
            name.to_string(),
            DocumentNode {
                node,
                id: Uuid::new_v4(),
                name: name.to_string(),
                storage_path: storage_path.to_string(),
                raw_text: raw_text.map(str::to_string),
            },
        );
        Ok(node)
    }

    fn upsert_clinic(&self, name: &str) -> Result<NodeRef, StoreError> {
        let mut graph = self.graph.write().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(node) = graph.clinics.get(name) {
            return Ok(*node);
        }
        let node = graph.alloc();
        graph.clinics.insert(name.to_string(), node);
        Ok(node)
    }

    fn upsert_pathology(&self, name: &str) -> Result<NodeRef, StoreError> {
        let mut graph = self.graph.write().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(node) = graph.pathologies.get(name) {
            return Ok(*node);
        }
        let node = graph.alloc();
        graph.pathologies.insert(name.to_string(), node);
        Ok(node)
    }

    fn create_record(
        &self,
        document: NodeRef,
        clinic: NodeRef,
        pathology: NodeRef,
        quantity: f64,
    ) -> Result<NodeRef, StoreError> {
        let mut graph = self.graph.write().map_err(|_| StoreError::LockPoisoned)?;
        let known = graph.documents.values().any(|d| d.node == document);
        if !known {
            return Err(StoreError::NodeNotFound(format!(
                "document ref {}",
                document.0
            )));
        }
        let node = graph.alloc();
        graph.records.push(RecordNode {
            document,
            clinic,
            pathology,
            quantity,
        });
        Ok(node)
    }

    fn clear_document_records(&self, document: NodeRef) -> Result<usize, StoreError> {
        let mut graph = self.graph.write().map_err(|_| StoreError::LockPoisoned)?;
        let before = graph.records.len();
        graph.records.retain(|r| r.document != document);
        Ok(before - graph.records.len())
    }

    fn list_documents(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let graph = self.graph.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut docs: Vec<StoredDocument> = graph
            .documents
            .values()
            .map(|d| StoredDocument {
                id: d.id,
                name: d.name.clone(),
                storage_path: d.storage_path.clone(),
                raw_text: d.raw_text.clone(),
            })
            .collect();
        // Insertion order is not stable across HashMap; present newest
        // uploads in a deterministic listing instead.
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(docs)
    }

    fn delete_document(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut graph = self.graph.write().map_err(|_| StoreError::LockPoisoned)?;
        let Some(name) = graph
            .documents
            .values()
            .find(|d| d.id == id)
            .map(|d| d.name.clone())
        else {
            return Ok(false);
        };
        let node = graph.documents.remove(&name).map(|d| d.node);
        if let Some(node) = node {
            graph.records.retain(|r| r.document != node);
        }
        Ok(true)
    }

    fn aggregate_records(&self, filter: &AggregateFilter) -> Result<Vec<AggregateRow>, StoreError> {
        let graph = self.graph.read().map_err(|_| StoreError::LockPoisoned)?;

        let clinic_eq = filter.clinic_eq.as_deref().map(str::to_lowercase);
        let pathology_contains = filter
            .pathology_contains
            .as_deref()
            .map(str::to_lowercase);

        let mut totals: HashMap<(String, String), f64> = HashMap::new();
        for record in &graph.records {
            let Some(clinic) = graph.clinic_name(record.clinic) else {
                continue;
            };
            let Some(pathology) = graph.pathology_name(record.pathology) else {
                continue;
            };
            if let Some(ref want) = clinic_eq {
                if clinic.to_lowercase() != *want {
                    continue;
                }
            }
            if let Some(ref want) = pathology_contains {
                if !pathology.to_lowercase().contains(want.as_str()) {
                    continue;
                }
            }
            *totals
                .entry((pathology.to_string(), clinic.to_string()))
                .or_insert(0.0) += record.quantity;
        }

        let mut rows: Vec<AggregateRow> = totals
            .into_iter()
            .map(|((pathology, clinic), total)| AggregateRow {
                pathology,
                clinic,
                total,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pathology.cmp(&b.pathology))
                .then_with(|| a.clinic.cmp(&b.clinic))
        });
        rows.truncate(AGGREGATE_ROW_CAP);
        Ok(rows)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let graph = self.graph.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(StoreStats {
            documents: graph.documents.len(),
            clinics: graph.clinics.len(),
            pathologies: graph.pathologies.len(),
            records: graph.records.len(),
        })
    }
}
