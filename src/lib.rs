//! Invoice Relay Library
//!
//! Core of a WhatsApp business-messaging relay: an external point-of-sale
//! system posts outbound messages (text, PDF invoice, XML attachment) and
//! this crate decides how each PDF payload can be delivered:
//!
//! - `pass-through`: small enough to attach unmodified
//! - `compressed`: shrunk by a staged pipeline (structural compression,
//!   then a byte-level fallback) toward a target size
//! - `url-reference`: the field was a link, sent as text instead of bytes
//! - `rejected`: still over the hard ceiling after every stage, reported
//!   with the measured sizes
//!
//! The WhatsApp session, history store, invoice API, and email system are
//! consumed through the capability traits in [`relay::capability`]; the
//! crate itself owns only the size-compliance decisions and the temp-file
//! lifecycle around them.

pub mod config;
pub mod error;
pub mod pdf;
pub mod relay;
pub mod source;

pub use config::RelayConfig;
pub use error::{Error, Result};
pub use pdf::{
    analyze, compress_to_target, compress_to_target_report, is_valid_pdf, CompressOptions,
    CompressionAttempt, CompressionOutcome, CompressionStrategy, PdfProfile,
};
pub use relay::{
    AdmissionAction, AdmissionDecision, AdmissionPolicy, DispatchReport, HistoryEntry,
    HistoryStore, HttpInvoiceFetcher, InvoiceFetcher, MessageDispatcher, Notifier,
    OutboundMessage, PdfDelivery, Transport,
};
pub use source::{PdfArtifact, TempArtifactManager, TempFileHandle};
