//! Source resolution for PDF payloads
//!
//! An inbound `pdf` field is either inline base64 or a path on the local
//! filesystem; both resolve into a [`PdfArtifact`]. URL fields never reach
//! this module — the admission policy short-circuits them into a text
//! reference before any bytes are touched.

use crate::error::{Error, Result};
use crate::pdf::{size, validate};
use base64::Engine;
use std::path::Path;

/// Resolved PDF payload: an immutable byte buffer plus its provenance.
/// Derived attributes (size, structural validity) are computed from the
/// bytes; compression stages produce new artifacts rather than mutating
/// this one.
#[derive(Debug, Clone)]
pub struct PdfArtifact {
    bytes: Vec<u8>,
    source_name: String,
}

impl PdfArtifact {
    pub fn new(bytes: Vec<u8>, source_name: impl Into<String>) -> Self {
        Self {
            bytes,
            source_name: source_name.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn size_mb(&self) -> f64 {
        size::size_mb(&self.bytes)
    }

    pub fn is_structurally_valid(&self) -> bool {
        validate::is_valid_pdf(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// New artifact for a superseding buffer, keeping the provenance
    pub fn superseded_by(&self, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            source_name: self.source_name.clone(),
        }
    }
}

/// Resolve a file path to a PDF artifact
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<PdfArtifact> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path).map_err(Error::Io)?;

    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "file is not a valid PDF".to_string(),
        });
    }

    Ok(PdfArtifact::new(data, path.display().to_string()))
}

/// Resolve base64-encoded data to a PDF artifact
pub fn resolve_base64(base64_data: &str) -> Result<PdfArtifact> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;

    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "decoded data is not a valid PDF".to_string(),
        });
    }

    Ok(PdfArtifact::new(data, "<base64>".to_string()))
}

/// Resolve an inline field: base64 when it decodes as base64, otherwise a
/// local file path (the order the original point-of-sale integration relies
/// on — paths contain characters outside the base64 alphabet).
pub fn resolve_inline(field: &str) -> Result<PdfArtifact> {
    let engine = base64::engine::general_purpose::STANDARD;
    match engine.decode(field.trim()) {
        Ok(data) => {
            if data.len() < 4 || &data[0..4] != b"%PDF" {
                return Err(Error::InvalidPdf {
                    reason: "decoded data is not a valid PDF".to_string(),
                });
            }
            Ok(PdfArtifact::new(data, "<base64>".to_string()))
        }
        Err(_) => resolve_path(field),
    }
}
