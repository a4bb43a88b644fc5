//! PDF size-compliance pipeline
//!
//! Heuristic analysis, structural validation, structural and byte-level
//! compression, and the staged orchestrator that drives them toward a
//! target size.

pub mod analyze;
pub mod compress;
pub mod pipeline;
pub mod size;
pub mod validate;

pub use analyze::{analyze, CompressionStrategy, PdfProfile};
pub use compress::{compress_structural, optimize_bytes, CompressOptions};
pub use pipeline::{
    compress_to_target, compress_to_target_report, CompressionAttempt, CompressionOutcome,
};
pub use size::{exceeds, size_mb};
pub use validate::is_valid_pdf;
