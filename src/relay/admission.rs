//! Payload admission policy
//!
//! Per-request decision for the `pdf` field: send as-is, compress, send a
//! URL reference instead of bytes, or reject with a diagnostic the caller
//! can act on. Every rejection reason states the measured size and the
//! limit it exceeded, in MB at two decimals.

use crate::config::RelayConfig;
use crate::error::Error;
use crate::pdf::{pipeline, size, validate};
use crate::source::resolver::{self, PdfArtifact};
use serde::Serialize;
use url::Url;

/// Terminal admission outcome for a PDF field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionAction {
    /// Small enough to send unmodified
    PassThrough,
    /// Compressed artifact attached
    Compressed,
    /// The field is a URL; send it as a text reference
    UrlReference,
    /// Not deliverable; `reason` carries the diagnostic
    Rejected,
}

/// Decision produced once per inbound PDF field; never mutated afterwards
#[derive(Debug)]
pub struct AdmissionDecision {
    pub action: AdmissionAction,
    /// The artifact to attach, for `PassThrough` and `Compressed`
    pub artifact: Option<PdfArtifact>,
    /// Resolved size before any compression, when bytes were obtained
    pub original_mb: Option<f64>,
    pub reason: String,
}

impl AdmissionDecision {
    fn rejected(reason: String) -> Self {
        Self {
            action: AdmissionAction::Rejected,
            artifact: None,
            original_mb: None,
            reason,
        }
    }
}

/// Size-based admission for PDF payloads
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    trigger_mb: f64,
    target_mb: f64,
    ceiling_mb: f64,
}

impl AdmissionPolicy {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            trigger_mb: config.compression_trigger_mb,
            target_mb: config.compression_target_mb,
            ceiling_mb: config.post_compression_cap_mb,
        }
    }

    /// Decide how (or whether) a PDF field is delivered.
    ///
    /// URLs bypass every size check by design: when the source system can
    /// provide a link instead of bytes, size limits must never block
    /// delivery.
    pub fn admit(&self, pdf_field: &str) -> AdmissionDecision {
        if let Some(link) = as_absolute_http_url(pdf_field) {
            tracing::debug!(url = %link, "PDF field is a URL, sending as reference");
            return AdmissionDecision {
                action: AdmissionAction::UrlReference,
                artifact: None,
                original_mb: None,
                reason: format!("PDF referenced by URL: {}", link),
            };
        }

        let artifact = match resolver::resolve_inline(pdf_field) {
            Ok(artifact) => artifact,
            Err(error) => {
                tracing::warn!(%error, "PDF field could not be resolved");
                return AdmissionDecision::rejected(error.client_message());
            }
        };

        let original_mb = artifact.size_mb();
        if original_mb <= self.trigger_mb {
            return AdmissionDecision {
                action: AdmissionAction::PassThrough,
                reason: format!(
                    "{:.2} MB within the {:.2} MB pass-through threshold",
                    original_mb, self.trigger_mb
                ),
                original_mb: Some(original_mb),
                artifact: Some(artifact),
            };
        }

        tracing::info!(
            size_mb = original_mb,
            trigger_mb = self.trigger_mb,
            "PDF exceeds the compression trigger"
        );
        let compressed = pipeline::compress_to_target(artifact.bytes(), self.target_mb);
        let final_mb = size::size_mb(&compressed);

        if final_mb <= self.ceiling_mb && validate::is_valid_pdf(&compressed) {
            AdmissionDecision {
                action: AdmissionAction::Compressed,
                reason: format!(
                    "compressed from {:.2} MB to {:.2} MB",
                    original_mb, final_mb
                ),
                original_mb: Some(original_mb),
                artifact: Some(artifact.superseded_by(compressed)),
            }
        } else {
            let diagnostic = Error::PdfRejected {
                original_mb,
                final_mb,
                limit_mb: self.ceiling_mb,
            };
            AdmissionDecision {
                action: AdmissionAction::Rejected,
                artifact: None,
                original_mb: Some(original_mb),
                reason: diagnostic.client_message(),
            }
        }
    }
}

fn as_absolute_http_url(field: &str) -> Option<Url> {
    let parsed = Url::parse(field).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy::new(&RelayConfig::default())
    }

    fn valid_pdf_of(len: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\n");
        bytes.extend(std::iter::repeat(b'x').take(len.saturating_sub(bytes.len() + 6)));
        bytes.extend_from_slice(b"\n%%EOF");
        bytes
    }

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_url_field_bypasses_size_checks() {
        let decision = policy().admit("https://example.com/f.pdf");
        assert_eq!(decision.action, AdmissionAction::UrlReference);
        assert!(decision.artifact.is_none());
    }

    #[test]
    fn test_http_url_also_bypasses() {
        let decision = policy().admit("http://example.com/f.pdf");
        assert_eq!(decision.action, AdmissionAction::UrlReference);
    }

    #[test]
    fn test_small_pdf_passes_through_unmodified() {
        let pdf = valid_pdf_of(2048);
        let decision = policy().admit(&encode(&pdf));
        assert_eq!(decision.action, AdmissionAction::PassThrough);
        assert_eq!(decision.artifact.unwrap().bytes(), pdf.as_slice());
    }

    #[test]
    fn test_invalid_base64_pdf_is_rejected() {
        // Valid base64 that does not decode to a PDF
        let decision = policy().admit(&encode(b"Hello World, definitely not a PDF"));
        assert_eq!(decision.action, AdmissionAction::Rejected);
        assert!(!decision.reason.is_empty());
    }

    #[test]
    fn test_incompressible_oversized_pdf_is_rejected_with_sizes() {
        // 60 MB of dense bytes behind a PDF header: nothing for any stage
        // to shrink, so the ceiling diagnostic must surface both numbers
        let mut bytes = b"%PDF-1.4\n1 0 obj\nendobj\n".to_vec();
        bytes.extend((0u32..60 * 1024 * 1024).map(|i| (i % 37) as u8 | 0x41));
        bytes.extend_from_slice(b"\n%%EOF");

        let decision = policy().admit(&encode(&bytes));
        assert_eq!(decision.action, AdmissionAction::Rejected);
        assert!(decision.reason.contains("45"), "reason: {}", decision.reason);
        assert!(decision.reason.contains("60.0"), "reason: {}", decision.reason);
    }

    #[test]
    fn test_compressible_pdf_is_admitted_compressed() {
        // 30 MB dominated by collapsible padding inside the body
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n1 0 obj\n<< /Length 200 >>\nstream\n");
        bytes.extend_from_slice(&[b'A'; 200]);
        bytes.extend_from_slice(b"\nendstream\nendobj\n");
        bytes.extend_from_slice(&vec![b' '; 30 * 1024 * 1024]);
        bytes.extend_from_slice(b"\n%%EOF\n");

        let decision = policy().admit(&encode(&bytes));
        assert_eq!(decision.action, AdmissionAction::Compressed);
        let artifact = decision.artifact.unwrap();
        assert!(artifact.size_mb() <= 25.0);
        assert!(artifact.is_structurally_valid());
    }
}
