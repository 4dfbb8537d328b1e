//! Workbook file storage — raw uploaded bytes on disk.
//!
//! Files are keyed by their sanitized upload name under a single
//! directory. The fact store keeps the path; this type owns the bytes.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("empty file name")]
    EmptyName,

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Byte-level read/write of uploaded workbooks, keyed by file name.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Create the store, ensuring its directory exists.
    pub fn new(root: PathBuf) -> Result<Self, FileStoreError> {
        std::fs::create_dir_all(&root).map_err(|e| FileStoreError::Io {
            path: root.display().to_string(),
            source: e,
        })?;
        Ok(Self { root })
    }

    /// Write the uploaded bytes, replacing any previous file with the
    /// same name (mirrors the document upsert in the fact store).
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, FileStoreError> {
        let file_name = sanitize_name(name)?;
        let path = self.root.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| FileStoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(path)
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Best-effort removal; a missing file is not an error.
    pub fn remove(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove workbook file");
            }
        }
    }
}

/// Strip directory components and control characters from an upload
/// name so it cannot escape the uploads directory.
fn sanitize_name(name: &str) -> Result<String, FileStoreError> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return Err(FileStoreError::EmptyName);
    }
    Ok(trimmed.to_string())
}
