//! Outbound message dispatch
//!
//! The full delivery flow for one inbound send request: text first, then
//! the PDF under the admission policy, then the XML attachment, then the
//! footer. Oversized requests degrade rather than fail — the PDF is the
//! only casualty, and the caller is told why. Temp files are released on
//! every exit path.

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::relay::admission::{AdmissionAction, AdmissionPolicy};
use crate::relay::capability::{HistoryEntry, HistoryStore, Notifier, Transport};
use crate::source::temp::TempArtifactManager;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Text used when the caller sends no message body
pub const DEFAULT_INVOICE_MESSAGE: &str =
    "Please find the invoice PDF and XML attached.";

/// Inbound send request, as posted by the point-of-sale system
#[derive(Debug, Clone, Deserialize)]
pub struct OutboundMessage {
    /// Recipient phone number
    pub number: String,
    /// Message body; a default is used when empty
    #[serde(default)]
    pub message: Option<String>,
    /// Invoice PDF: base64, a local path, or an http(s) URL
    #[serde(default)]
    pub pdf: Option<String>,
    /// Invoice XML: base64 or plain text
    #[serde(default)]
    pub xml: Option<String>,
    /// Name shown in the footer
    #[serde(default, rename = "customerName")]
    pub customer_name: Option<String>,
}

/// How the PDF field ended up being handled
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PdfDelivery {
    NotRequested,
    UrlReference,
    PassThrough { size_mb: f64 },
    Compressed { original_mb: f64, final_mb: f64 },
    Rejected { reason: String },
    /// Skipped before admission because the request exceeded the business cap
    Omitted { reason: String },
}

/// Outcome of one dispatch, returned to the caller
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub recipient: String,
    pub pdf: PdfDelivery,
    pub xml_sent: bool,
    /// Degraded-delivery notes that were appended to the outgoing text
    pub notes: Vec<String>,
}

/// Drives one outbound message through admission, materialization, and the
/// transport capability.
pub struct MessageDispatcher<T, H, N> {
    config: RelayConfig,
    policy: AdmissionPolicy,
    temp: TempArtifactManager,
    transport: T,
    history: H,
    notifier: N,
}

impl<T, H, N> MessageDispatcher<T, H, N>
where
    T: Transport,
    H: HistoryStore,
    N: Notifier,
{
    pub fn new(config: RelayConfig, transport: T, history: H, notifier: N) -> Self {
        let policy = AdmissionPolicy::new(&config);
        let temp = TempArtifactManager::new(config.work_dir.clone());
        Self {
            config,
            policy,
            temp,
            transport,
            history,
            notifier,
        }
    }

    /// Deliver one outbound message. Failures are reported to the notifier
    /// (best-effort) before propagating to the caller.
    pub async fn dispatch(&self, request: &OutboundMessage) -> Result<DispatchReport> {
        let result = self.deliver(request).await;
        if let Err(error) = &result {
            tracing::error!(recipient = %request.number, %error, "dispatch failed");
            self.notify_failure(request, error).await;
        }
        result
    }

    async fn deliver(&self, request: &OutboundMessage) -> Result<DispatchReport> {
        if request.number.trim().is_empty() {
            return Err(Error::MissingField {
                field: "number".to_string(),
            });
        }

        let total_mb = request_size_mb(request);
        if total_mb > self.config.transport_cap_mb {
            return Err(Error::PayloadTooLarge {
                size_mb: total_mb,
                limit_mb: self.config.transport_cap_mb,
            });
        }

        let mut notes = Vec::new();
        let mut pdf_delivery = PdfDelivery::NotRequested;

        // Over the business cap the PDF branch is skipped entirely; the
        // text and XML still go out. Partial delivery beats total failure.
        let pdf_allowed = total_mb <= self.config.request_cap_mb;
        if !pdf_allowed && request.pdf.is_some() {
            let reason = format!(
                "Attachment omitted: request size {:.2} MB exceeds the {:.2} MB limit",
                total_mb, self.config.request_cap_mb
            );
            tracing::warn!(recipient = %request.number, %reason, "skipping PDF branch");
            notes.push(reason.clone());
            pdf_delivery = PdfDelivery::Omitted { reason };
        }

        let mut text = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_INVOICE_MESSAGE)
            .to_string();
        for note in &notes {
            text.push('\n');
            text.push_str(note);
        }

        self.transport.send_text(&request.number, &text).await?;

        if pdf_allowed {
            if let Some(pdf_field) = request.pdf.as_deref() {
                pdf_delivery = self.deliver_pdf(&request.number, pdf_field).await?;
            }
        }

        let xml_sent = match request.xml.as_deref() {
            Some(xml_field) => {
                self.deliver_xml(&request.number, xml_field).await?;
                true
            }
            None => false,
        };

        self.transport
            .send_text(&request.number, &footer(request.customer_name.as_deref()))
            .await?;

        let entry = HistoryEntry {
            recipient: request.number.clone(),
            body: text,
            sent_at: Utc::now(),
        };
        if let Err(error) = self.history.append_record(entry).await {
            tracing::warn!(%error, "failed to append history record");
        }

        Ok(DispatchReport {
            recipient: request.number.clone(),
            pdf: pdf_delivery,
            xml_sent,
            notes,
        })
    }

    async fn deliver_pdf(&self, recipient: &str, pdf_field: &str) -> Result<PdfDelivery> {
        let decision = self.policy.admit(pdf_field);
        match decision.action {
            AdmissionAction::UrlReference => {
                self.transport
                    .send_text(recipient, &format!("Invoice PDF: {}", pdf_field))
                    .await?;
                Ok(PdfDelivery::UrlReference)
            }
            AdmissionAction::PassThrough | AdmissionAction::Compressed => {
                let Some(artifact) = decision.artifact else {
                    return Err(Error::InvalidPdf {
                        reason: "admission produced no artifact".to_string(),
                    });
                };
                let handle = self.temp.materialize(artifact.bytes(), "invoice_pdf", "pdf")?;
                let sent = self.transport.send_media(recipient, handle.path()).await;
                handle.release();
                sent?;

                Ok(match decision.action {
                    AdmissionAction::PassThrough => PdfDelivery::PassThrough {
                        size_mb: artifact.size_mb(),
                    },
                    _ => PdfDelivery::Compressed {
                        original_mb: decision.original_mb.unwrap_or_default(),
                        final_mb: artifact.size_mb(),
                    },
                })
            }
            AdmissionAction::Rejected => {
                tracing::warn!(recipient, reason = %decision.reason, "PDF rejected");
                Ok(PdfDelivery::Rejected {
                    reason: decision.reason,
                })
            }
        }
    }

    async fn deliver_xml(&self, recipient: &str, xml_field: &str) -> Result<()> {
        let content = decode_xml_field(xml_field)?;
        let handle = self
            .temp
            .materialize(content.as_bytes(), "invoice_xml", "xml")?;
        let sent = self.transport.send_media(recipient, handle.path()).await;
        handle.release();
        sent
    }

    async fn notify_failure(&self, request: &OutboundMessage, error: &Error) {
        let timestamp = Utc::now().to_rfc3339();
        let text_body = format!(
            "Recipient: {}\nTimestamp: {}\nError: {}",
            request.number, timestamp, error
        );
        let html_body = format!(
            "<h2>Relay delivery failure</h2>\
             <p><strong>Recipient:</strong> {}</p>\
             <p><strong>Timestamp:</strong> {}</p>\
             <p><strong>Error:</strong> {}</p>",
            request.number, timestamp, error
        );
        if let Err(notify_error) = self
            .notifier
            .notify("Relay delivery failure", &text_body, &html_body)
            .await
        {
            tracing::warn!(%notify_error, "failure notification could not be delivered");
        }
    }
}

/// Measured size of the request as received, before any decoding
fn request_size_mb(request: &OutboundMessage) -> f64 {
    let total = request.message.as_deref().map_or(0, str::len)
        + request.pdf.as_deref().map_or(0, str::len)
        + request.xml.as_deref().map_or(0, str::len);
    total as f64 / (1024.0 * 1024.0)
}

/// Accept base64 or plain text; the decoded content must read as XML
fn decode_xml_field(field: &str) -> Result<String> {
    let engine = base64::engine::general_purpose::STANDARD;
    let content = match engine.decode(field.trim()) {
        Ok(decoded) => String::from_utf8(decoded).map_err(|_| Error::InvalidXml {
            reason: "decoded content is not valid UTF-8".to_string(),
        })?,
        Err(_) => field.to_string(),
    };

    if !content.trim_start().starts_with('<') {
        return Err(Error::InvalidXml {
            reason: "content does not start with an XML declaration or element".to_string(),
        });
    }
    Ok(content)
}

fn footer(customer_name: Option<&str>) -> String {
    let mut footer = String::from("━━━━━━━━━━━━━━━━━━━━━━━\n");
    footer.push_str("Sent from the point-of-sale messaging service\n");
    if let Some(name) = customer_name {
        footer.push_str(&format!("Sent by: {}\n", name));
    }
    footer.push_str("━━━━━━━━━━━━━━━━━━━━━━━");
    footer
}
