//! Temporary artifact lifecycle
//!
//! The transport accepts file paths, not buffers, so artifacts are
//! materialized on disk for the duration of a send. Every handle is deleted
//! exactly once: explicitly via [`TempFileHandle::release`] on the happy
//! path, or by `Drop` when an error or panic unwinds past it. Deletion
//! failure is logged, never escalated.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scoped manager for temporary attachment files
#[derive(Debug, Clone)]
pub struct TempArtifactManager {
    dir: PathBuf,
}

impl TempArtifactManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a buffer to a uniquely named file in the working directory.
    /// Names carry a millisecond timestamp plus a random suffix; two
    /// requests materializing in the same millisecond cannot collide.
    pub fn materialize(
        &self,
        bytes: &[u8],
        stem: &str,
        extension: &str,
    ) -> Result<TempFileHandle> {
        std::fs::create_dir_all(&self.dir)?;

        let created_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}_{}_{}.{}",
            stem,
            created_at.format("%Y%m%dT%H%M%S%3f"),
            &suffix[..8],
            extension
        );
        let path = self.dir.join(name);

        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "materialized temp artifact");

        Ok(TempFileHandle {
            path,
            created_at,
            deleted: false,
        })
    }
}

/// Handle to a materialized temporary file. Deleting the file is guaranteed:
/// call [`release`](Self::release) once the send completes, or let `Drop`
/// clean up on early exits.
#[derive(Debug)]
pub struct TempFileHandle {
    path: PathBuf,
    created_at: DateTime<Utc>,
    deleted: bool,
}

impl TempFileHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Delete the underlying file now
    pub fn release(mut self) {
        self.delete_now();
    }

    fn delete_now(&mut self) {
        if self.deleted {
            return;
        }
        self.deleted = true;
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %error, "failed to delete temp artifact");
        } else {
            tracing::debug!(path = %self.path.display(), "deleted temp artifact");
        }
    }
}

impl Drop for TempFileHandle {
    fn drop(&mut self) {
        self.delete_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_writes_the_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::new(dir.path());

        let handle = manager.materialize(b"%PDF-test", "invoice_pdf", "pdf").unwrap();
        assert!(handle.path().exists());
        assert_eq!(std::fs::read(handle.path()).unwrap(), b"%PDF-test");

        let name = handle.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("invoice_pdf_"));
        assert!(name.ends_with(".pdf"));
        handle.release();
    }

    #[test]
    fn test_release_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::new(dir.path());

        let handle = manager.materialize(b"data", "invoice_xml", "xml").unwrap();
        let path = handle.path().to_path_buf();
        handle.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::new(dir.path());

        let path = {
            let handle = manager.materialize(b"data", "invoice_pdf", "pdf").unwrap();
            handle.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_names_are_unique_within_a_millisecond() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::new(dir.path());

        let a = manager.materialize(b"a", "invoice_pdf", "pdf").unwrap();
        let b = manager.materialize(b"b", "invoice_pdf", "pdf").unwrap();
        assert_ne!(a.path(), b.path());
        a.release();
        b.release();
    }

    #[test]
    fn test_double_delete_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempArtifactManager::new(dir.path());

        let mut handle = manager.materialize(b"data", "invoice_pdf", "pdf").unwrap();
        handle.delete_now();
        // Drop runs delete_now again; it must not warn or panic
    }
}
