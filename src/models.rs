//! Core domain types shared across the pipeline, store and API layers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored workbook document, unique by name (re-upload merges).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub name: String,
    pub storage_path: String,
    /// Flat sheet text, filled in when the workbook was rendered for
    /// direct LLM context. Absent for graph-only ingests.
    pub raw_text: Option<String>,
}

/// Entities extracted from a free-text question (or a file name).
/// Every slot independently defaults to absent; extraction never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEntities {
    /// 1..=12
    pub month: Option<u32>,
    pub year: Option<i32>,
    /// Canonical clinic id, e.g. "CMF 5".
    pub clinic: Option<String>,
    /// Canonical lowercase pathology name from the closed vocabulary.
    pub pathology: Option<String>,
}

impl QueryEntities {
    /// True when no slot was filled — a fully general question.
    pub fn is_empty(&self) -> bool {
        self.month.is_none()
            && self.year.is_none()
            && self.clinic.is_none()
            && self.pathology.is_none()
    }
}

/// One row of the aggregate answer: sum of record quantities for a
/// (pathology, clinic) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateRow {
    pub pathology: String,
    pub clinic: String,
    pub total: f64,
}

/// Filter applied to the record aggregation. Month/year are extracted
/// from questions but records carry no temporal attribute, so they are
/// not part of this filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateFilter {
    /// Exact clinic-name match (case-insensitive).
    pub clinic_eq: Option<String>,
    /// Pathology-name containment match (case-insensitive).
    pub pathology_contains: Option<String>,
}

/// Lifecycle of an asynchronous question-answering task.
/// Transitions only forward: pending → running → {finished, failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One in-flight (or settled) question-answering request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub status: TaskStatus,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            answer: None,
            error: None,
            created_at: chrono::Utc::now(),
        }
    }
}
