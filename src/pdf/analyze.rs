//! Heuristic PDF analysis
//!
//! A bounded ASCII scan of the head of the buffer, used to pick a
//! compression strategy and to describe the document in diagnostics. This is
//! deliberately not a parse: it can undercount pages or miss images in PDFs
//! with unusual object ordering, and it must never block a compression
//! attempt — analysis cannot fail.

use crate::pdf::size::size_mb;
use serde::Serialize;

/// How many leading bytes to scan; bounds the cost on very large buffers
const HEAD_SCAN_BYTES: usize = 10_000;

/// Compression strategy, monotonic in document size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionStrategy {
    Basic,
    Moderate,
    Aggressive,
    UltraAggressive,
}

impl CompressionStrategy {
    /// Strategy for a document of the given size: >50 MB ultra-aggressive,
    /// >25 MB aggressive, >10 MB moderate, otherwise basic.
    pub fn for_size_mb(mb: f64) -> Self {
        if mb > 50.0 {
            CompressionStrategy::UltraAggressive
        } else if mb > 25.0 {
            CompressionStrategy::Aggressive
        } else if mb > 10.0 {
            CompressionStrategy::Moderate
        } else {
            CompressionStrategy::Basic
        }
    }
}

/// Read-only summary of a PDF buffer
#[derive(Debug, Clone, Serialize)]
pub struct PdfProfile {
    /// Declared PDF version, or "unknown"
    pub version: String,
    /// Heuristic page-object count; may undercount
    pub page_count: usize,
    pub has_images: bool,
    pub has_annotations: bool,
    pub has_metadata: bool,
    /// Buffer size in MB
    pub size_mb: f64,
    pub strategy: CompressionStrategy,
}

impl PdfProfile {
    fn degraded(buffer: &[u8]) -> Self {
        Self {
            version: "unknown".to_string(),
            page_count: 0,
            has_images: false,
            has_annotations: false,
            has_metadata: false,
            size_mb: size_mb(buffer),
            strategy: CompressionStrategy::Basic,
        }
    }
}

/// Analyze a PDF buffer. Never fails: anything unreadable yields a degraded
/// profile with `strategy = Basic` and zeroed fields.
pub fn analyze(buffer: &[u8]) -> PdfProfile {
    if buffer.is_empty() {
        return PdfProfile::degraded(buffer);
    }

    let head = String::from_utf8_lossy(&buffer[..HEAD_SCAN_BYTES.min(buffer.len())]);
    let mb = size_mb(buffer);

    PdfProfile {
        version: extract_version(&head),
        page_count: count_page_objects(&head),
        has_images: head.contains("/Image") || head.contains("/XObject"),
        has_annotations: head.contains("/Annot"),
        has_metadata: head.contains("/Info") || head.contains("/Metadata"),
        size_mb: mb,
        strategy: CompressionStrategy::for_size_mb(mb),
    }
}

/// Version digits following the `%PDF-` header, or "unknown"
fn extract_version(head: &str) -> String {
    let Some(at) = head.find("%PDF-") else {
        return "unknown".to_string();
    };
    let version: String = head[at + 5..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if version.is_empty() {
        "unknown".to_string()
    } else {
        version
    }
}

/// Count `/Type /Page` occurrences, excluding the `/Pages` tree node
fn count_page_objects(head: &str) -> usize {
    let bytes = head.as_bytes();
    let mut count = 0;
    let mut at = 0;
    while let Some(found) = head[at..].find("/Type") {
        let mut cursor = at + found + 5;
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if head[cursor..].starts_with("/Page") {
            let after = cursor + 5;
            if bytes.get(after) != Some(&b's') {
                count += 1;
            }
        }
        at = at + found + 5;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pdf_head(body: &str) -> Vec<u8> {
        format!("%PDF-1.7\n{}\n%%EOF", body).into_bytes()
    }

    #[test]
    fn test_extracts_version() {
        let profile = analyze(&pdf_head("1 0 obj\nendobj"));
        assert_eq!(profile.version, "1.7");
    }

    #[test]
    fn test_unknown_version_for_garbage() {
        let profile = analyze(b"garbage without a header");
        assert_eq!(profile.version, "unknown");
        assert_eq!(profile.strategy, CompressionStrategy::Basic);
    }

    #[test]
    fn test_counts_pages_not_page_tree() {
        let body = "/Type /Pages /Kids [] /Type /Page /Parent 2 0 R /Type/Page";
        let profile = analyze(&pdf_head(body));
        assert_eq!(profile.page_count, 2);
    }

    #[test]
    fn test_detects_images_and_annotations() {
        let profile = analyze(&pdf_head("/Subtype /Image /Annots [3 0 R]"));
        assert!(profile.has_images);
        assert!(profile.has_annotations);
        assert!(!profile.has_metadata);
    }

    #[test]
    fn test_strategy_thresholds() {
        assert_eq!(
            CompressionStrategy::for_size_mb(5.0),
            CompressionStrategy::Basic
        );
        assert_eq!(
            CompressionStrategy::for_size_mb(10.0),
            CompressionStrategy::Basic
        );
        assert_eq!(
            CompressionStrategy::for_size_mb(10.1),
            CompressionStrategy::Moderate
        );
        assert_eq!(
            CompressionStrategy::for_size_mb(25.0),
            CompressionStrategy::Moderate
        );
        assert_eq!(
            CompressionStrategy::for_size_mb(26.0),
            CompressionStrategy::Aggressive
        );
        assert_eq!(
            CompressionStrategy::for_size_mb(50.0),
            CompressionStrategy::Aggressive
        );
        assert_eq!(
            CompressionStrategy::for_size_mb(51.0),
            CompressionStrategy::UltraAggressive
        );
    }

    #[test]
    fn test_strategy_is_monotonic() {
        let sizes = [1.0, 9.0, 11.0, 24.0, 26.0, 49.0, 51.0, 200.0];
        for window in sizes.windows(2) {
            assert!(
                CompressionStrategy::for_size_mb(window[0])
                    <= CompressionStrategy::for_size_mb(window[1]),
                "strategy regressed between {} and {} MB",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn test_empty_buffer_degrades() {
        let profile = analyze(&[]);
        assert_eq!(profile.page_count, 0);
        assert_eq!(profile.strategy, CompressionStrategy::Basic);
    }

    #[test]
    fn test_scan_is_bounded() {
        // Version tag beyond the 10k scan window is not seen
        let mut bytes = vec![b' '; 20_000];
        bytes.extend_from_slice(b"%PDF-1.7");
        let profile = analyze(&bytes);
        assert_eq!(profile.version, "unknown");
    }
}
