//! Capability contracts for the relay's external collaborators
//!
//! The relay never touches the WhatsApp session, the history database, or
//! the mail system directly; each is an opaque capability behind one of
//! these traits. Implementations live with the embedder.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outbound message transport — the paired WhatsApp session.
///
/// The relay only ever hands it plain text or a path to a materialized
/// file; it never depends on the transport's internal protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<()>;

    /// Send a media attachment from a local file path.
    async fn send_media(&self, recipient: &str, file_path: &Path) -> Result<()>;
}

/// Conversation bookkeeping. Not used by the compression core itself.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a delivery record.
    async fn append_record(&self, entry: HistoryEntry) -> Result<()>;

    /// Most recent record for a recipient, if any.
    async fn last_record_for(&self, identifier: &str) -> Result<Option<HistoryEntry>>;
}

/// Fire-and-forget operator notification (email). Failures are swallowed by
/// callers and must never mask the error being reported.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, text_body: &str, html_body: &str) -> Result<()>;
}

/// Invoice-fetch API: base64 PDF by token and remote path.
#[async_trait]
pub trait InvoiceFetcher: Send + Sync {
    async fn fetch_invoice_pdf_base64(&self, token: &str, path: &str) -> Result<String>;
}

/// One entry in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recipient: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}
