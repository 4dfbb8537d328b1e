//! Spreadsheet ingestion — one workbook into Document/Clinic/Pathology
//! nodes plus one Record per non-zero cell.
//!
//! Input files have no schema guarantee: the consolidated sheet is
//! found by name marker, layouts drift between clinic-months, and cell
//! types are whatever the clinic typed in. Layout handling is isolated
//! in pure functions over a `GridCell` matrix so every variant can be
//! tested without a workbook file; calamine only appears at the edge.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};
use thiserror::Error;

use crate::store::{FactStore, NodeRef, StoreError};

/// Case-insensitive substring that marks the consolidated sheet.
const CONSOLIDATED_MARKER: &str = "consolidado";

/// Character cap for the flat-text rendering of a sheet.
pub const SHEET_TEXT_CAP: usize = 8000;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open workbook {path}: {detail}")]
    UnreadableWorkbook { path: String, detail: String },

    #[error("workbook {0} has no sheets")]
    NoSheets(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One parsed cell. Text cells keep their trimmed content; whether a
/// text cell counts as a number is decided at ingest time.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    Text(String),
    Number(f64),
    Empty,
}

/// What one ingestion run did, for logging and the upload response.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IngestSummary {
    pub sheet: String,
    pub records_created: usize,
    /// Records from a previous ingest of the same document that were
    /// dropped before this run (delete-and-replace semantics).
    pub records_replaced: usize,
}

/// Ingest one workbook into the fact store.
///
/// Re-ingesting the same document name replaces its Records instead of
/// duplicating them; Clinic and Pathology nodes merge by name as
/// always. An unreadable file is a hard failure, everything below that
/// degrades (missing marker sheet → first sheet, blank cells → zero).
pub fn ingest_workbook(
    store: &dyn FactStore,
    path: &Path,
    document_name: &str,
) -> Result<IngestSummary, IngestError> {
    let (sheet, grid) = load_grid(path)?;

    let document = store.upsert_document(document_name, &path.display().to_string(), None)?;
    let records_replaced = store.clear_document_records(document)?;

    let records_created = ingest_grid(store, document, &grid)?;

    let summary = IngestSummary {
        sheet,
        records_created,
        records_replaced,
    };
    tracing::info!(
        document = document_name,
        sheet = %summary.sheet,
        created = summary.records_created,
        replaced = summary.records_replaced,
        "Workbook ingested"
    );
    Ok(summary)
}

/// Render the target sheet to a bounded flat text block for direct LLM
/// context. Never fails: any read error degrades to an empty string.
pub fn extract_sheet_text(path: &Path, cap: usize) -> String {
    match load_grid(path) {
        Ok((_, grid)) => render_grid(&grid, cap),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Sheet text extraction degraded to empty");
            String::new()
        }
    }
}

/// Open the workbook and pull the consolidated sheet (or the first one)
/// into a cell matrix.
fn load_grid(path: &Path) -> Result<(String, Vec<Vec<GridCell>>), IngestError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::UnreadableWorkbook {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    let names = workbook.sheet_names().to_vec();
    let index = names
        .iter()
        .position(|n| n.to_lowercase().contains(CONSOLIDATED_MARKER))
        .unwrap_or(0);
    let sheet = names
        .get(index)
        .cloned()
        .ok_or_else(|| IngestError::NoSheets(path.display().to_string()))?;

    let range = workbook
        .worksheet_range_at(index)
        .ok_or_else(|| IngestError::NoSheets(path.display().to_string()))?
        .map_err(|e| IngestError::UnreadableWorkbook {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

    let grid = range
        .rows()
        .map(|row| row.iter().map(grid_cell).collect())
        .collect();
    Ok((sheet, grid))
}

fn grid_cell(cell: &Data) -> GridCell {
    if let Some(i) = cell.as_i64() {
        return GridCell::Number(i as f64);
    }
    if let Some(f) = cell.as_f64() {
        return GridCell::Number(f);
    }
    match cell.as_string() {
        Some(s) => {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                GridCell::Empty
            } else {
                GridCell::Text(trimmed)
            }
        }
        None => GridCell::Empty,
    }
}

/// Walk the grid: first row is the clinic axis, first column the
/// pathology axis, every non-zero numeric cell becomes a Record.
/// Returns how many Records were created.
pub fn ingest_grid(
    store: &dyn FactStore,
    document: NodeRef,
    grid: &[Vec<GridCell>],
) -> Result<usize, StoreError> {
    let Some(header) = grid.first() else {
        return Ok(0);
    };

    // Clinic node per labelled column, resolved lazily so a workbook
    // of empty columns creates nothing.
    let clinic_labels: Vec<Option<String>> = header
        .iter()
        .skip(1)
        .map(cell_label)
        .collect();
    let mut clinic_nodes: Vec<Option<NodeRef>> = vec![None; clinic_labels.len()];

    let mut created = 0;
    for row in grid.iter().skip(1) {
        let Some(pathology_label) = row.first().and_then(cell_label) else {
            continue;
        };
        let mut pathology_node: Option<NodeRef> = None;

        for (column, label) in clinic_labels.iter().enumerate() {
            let Some(clinic_label) = label else {
                continue;
            };
            let quantity = row
                .get(column + 1)
                .map(cell_quantity)
                .unwrap_or(0.0);
            // Zero-valued cells are never materialized as Records.
            if quantity == 0.0 {
                continue;
            }

            let clinic = match clinic_nodes[column] {
                Some(node) => node,
                None => {
                    let node = store.upsert_clinic(clinic_label)?;
                    clinic_nodes[column] = Some(node);
                    node
                }
            };
            let pathology = match pathology_node {
                Some(node) => node,
                None => {
                    let node = store.upsert_pathology(&pathology_label)?;
                    pathology_node = Some(node);
                    node
                }
            };

            store.create_record(document, clinic, pathology, quantity)?;
            created += 1;
        }
    }
    Ok(created)
}

/// Axis label for a header or first-column cell.
fn cell_label(cell: &GridCell) -> Option<String> {
    match cell {
        GridCell::Text(s) => Some(s.clone()),
        GridCell::Number(n) => Some(format_number(*n)),
        GridCell::Empty => None,
    }
}

/// Numeric coercion: integers, then floats, then text that parses as
/// either; anything else is zero. Never raises.
fn cell_quantity(cell: &GridCell) -> f64 {
    match cell {
        GridCell::Number(n) => *n,
        GridCell::Text(s) => {
            let normalized = s.trim().replace(',', ".");
            if let Ok(i) = normalized.parse::<i64>() {
                i as f64
            } else {
                normalized.parse::<f64>().unwrap_or(0.0)
            }
        }
        GridCell::Empty => 0.0,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Tab-separated rendering of the grid, truncated to `cap` characters.
fn render_grid(grid: &[Vec<GridCell>], cap: usize) -> String {
    let mut out = String::new();
    'rows: for row in grid {
        let line = row
            .iter()
            .map(|cell| match cell {
                GridCell::Text(s) => s.clone(),
                GridCell::Number(n) => format_number(*n),
                GridCell::Empty => String::new(),
            })
            .collect::<Vec<_>>()
            .join("\t");
        if line.trim().is_empty() {
            continue;
        }
        for ch in line.chars() {
            if out.len() + ch.len_utf8() > cap {
                break 'rows;
            }
            out.push(ch);
        }
        if out.len() < cap {
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}
