//! Error types for the invoice relay

use thiserror::Error;

/// Result type alias for the invoice relay
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the invoice relay
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found on disk
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF payload
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Invalid XML payload
    #[error("Invalid XML content: {reason}")]
    InvalidXml { reason: String },

    /// A required request field was missing or empty
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// PDF still exceeds the post-compression ceiling after all stages
    #[error(
        "PDF rejected: original {original_mb:.2} MB, compressed {final_mb:.2} MB exceeds the {limit_mb:.2} MB limit"
    )]
    PdfRejected {
        original_mb: f64,
        final_mb: f64,
        limit_mb: f64,
    },

    /// Request body exceeds the transport-level admission cap
    #[error("Payload too large: {size_mb:.2} MB (max: {limit_mb:.2} MB)")]
    PayloadTooLarge { size_mb: f64, limit_mb: f64 },

    /// Invoice-fetch API returned an unusable response
    #[error("Invoice fetch failed: {reason}")]
    InvoiceFetch { reason: String },

    /// Transport (WhatsApp session) failure
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// History-store failure
    #[error("History store error: {reason}")]
    History { reason: String },

    /// Compression-stage failure (recovered by the pipeline, surfaced in logs)
    #[error("PDF compression error: {reason}")]
    Compression { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Return a sanitized error message safe to send back to the caller.
    /// Internal details (paths, library errors) are omitted; size diagnostics
    /// keep their numbers so the caller can resend as a URL or pre-shrink.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::InvalidXml { .. } => "Invalid XML content".to_string(),
            Error::MissingField { field } => format!("Missing required field: {}", field),
            Error::PdfRejected {
                original_mb,
                final_mb,
                limit_mb,
            } => format!(
                "PDF rejected: original {:.2} MB, compressed {:.2} MB exceeds the {:.2} MB limit",
                original_mb, final_mb, limit_mb
            ),
            Error::PayloadTooLarge { size_mb, limit_mb } => format!(
                "Payload too large: {:.2} MB (max: {:.2} MB)",
                size_mb, limit_mb
            ),
            Error::InvoiceFetch { .. } => "Failed to fetch invoice".to_string(),
            Error::Transport { .. } => "Message delivery failed".to_string(),
            Error::History { .. } => "History store error".to_string(),
            Error::Compression { .. } => "PDF processing error".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
        }
    }
}
