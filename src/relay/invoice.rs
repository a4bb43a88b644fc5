//! Invoice-fetch API client
//!
//! The invoice API has returned three response shapes over time: a raw
//! base64 string, `{"pdf": "..."}` and `{"data": "..."}`. The decode here
//! is an explicit variant type rather than ad-hoc property probing, and it
//! fails with a named error when none of the shapes match.

use crate::error::{Error, Result};
use crate::relay::capability::InvoiceFetcher;
use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use serde::Deserialize;
use std::time::Duration;

/// Response shapes the invoice API is known to return
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InvoicePdfResponse {
    /// `{"pdf": "<base64>"}` — preferred when both fields are present
    Wrapped { pdf: String },
    /// `{"data": "<base64>"}`
    Data { data: String },
    /// A bare JSON string of base64
    Raw(String),
}

impl InvoicePdfResponse {
    fn into_base64(self) -> String {
        match self {
            InvoicePdfResponse::Wrapped { pdf } => pdf,
            InvoicePdfResponse::Data { data } => data,
            InvoicePdfResponse::Raw(raw) => raw,
        }
    }
}

/// Decode an invoice API body into its base64 payload. Accepts the three
/// JSON shapes above plus a plain-text base64 body; anything else fails
/// fast with [`Error::InvoiceFetch`].
pub fn decode_invoice_response(body: &[u8]) -> Result<String> {
    if let Ok(parsed) = serde_json::from_slice::<InvoicePdfResponse>(body) {
        let base64_payload = parsed.into_base64();
        if base64_payload.trim().is_empty() {
            return Err(Error::InvoiceFetch {
                reason: "response carried an empty PDF payload".to_string(),
            });
        }
        return Ok(base64_payload);
    }

    // Some deployments return the base64 text unquoted
    if let Ok(text) = std::str::from_utf8(body) {
        let trimmed = text.trim();
        let engine = base64::engine::general_purpose::STANDARD;
        if !trimmed.is_empty() && engine.decode(trimmed).is_ok() {
            return Ok(trimmed.to_string());
        }
    }

    Err(Error::InvoiceFetch {
        reason: "response carried neither a base64 string nor a pdf/data field".to_string(),
    })
}

/// HTTP client for the invoice-fetch API
pub struct HttpInvoiceFetcher {
    client: reqwest::Client,
    endpoint: String,
    max_response_bytes: u64,
}

impl HttpInvoiceFetcher {
    /// Build a client for `endpoint` with a request timeout and a cap on
    /// the response body size.
    pub fn new(
        endpoint: impl Into<String>,
        timeout_secs: u64,
        max_response_mb: f64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::HttpRequest)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_response_bytes: (max_response_mb * 1024.0 * 1024.0) as u64,
        })
    }

    /// Build a fetcher from the relay configuration: the configured fetch
    /// timeout, capped at the transport-level admission size.
    pub fn from_config(endpoint: impl Into<String>, config: &crate::config::RelayConfig) -> Result<Self> {
        Self::new(
            endpoint,
            config.invoice_fetch_timeout_secs,
            config.transport_cap_mb,
        )
    }
}

#[async_trait]
impl InvoiceFetcher for HttpInvoiceFetcher {
    async fn fetch_invoice_pdf_base64(&self, token: &str, path: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": path }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::InvoiceFetch {
                reason: format!("HTTP status {}", response.status()),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_response_bytes {
                return Err(Error::InvoiceFetch {
                    reason: format!(
                        "response of {} bytes exceeds the {} byte cap",
                        content_length, self.max_response_bytes
                    ),
                });
            }
        }

        // Stream the body with incremental size checking to avoid holding
        // an unbounded response in memory
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::HttpRequest)?;
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_response_bytes {
                return Err(Error::InvoiceFetch {
                    reason: format!(
                        "response exceeded the {} byte cap",
                        self.max_response_bytes
                    ),
                });
            }
        }

        tracing::debug!(bytes = body.len(), "invoice API response received");
        decode_invoice_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_pdf_field() {
        let body = br#"{"pdf": "JVBERi0xLjQ="}"#;
        assert_eq!(decode_invoice_response(body).unwrap(), "JVBERi0xLjQ=");
    }

    #[test]
    fn test_decode_data_field() {
        let body = br#"{"data": "JVBERi0xLjQ="}"#;
        assert_eq!(decode_invoice_response(body).unwrap(), "JVBERi0xLjQ=");
    }

    #[test]
    fn test_decode_prefers_pdf_over_data() {
        let body = br#"{"pdf": "Zmlyc3Q=", "data": "c2Vjb25k"}"#;
        assert_eq!(decode_invoice_response(body).unwrap(), "Zmlyc3Q=");
    }

    #[test]
    fn test_decode_raw_json_string() {
        let body = br#""JVBERi0xLjQ=""#;
        assert_eq!(decode_invoice_response(body).unwrap(), "JVBERi0xLjQ=");
    }

    #[test]
    fn test_decode_plain_text_base64() {
        let body = b"JVBERi0xLjQ=\n";
        assert_eq!(decode_invoice_response(body).unwrap(), "JVBERi0xLjQ=");
    }

    #[test]
    fn test_decode_rejects_unknown_shape() {
        let body = br#"{"status": "error"}"#;
        assert!(matches!(
            decode_invoice_response(body),
            Err(Error::InvoiceFetch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        let body = br#"{"pdf": ""}"#;
        assert!(matches!(
            decode_invoice_response(body),
            Err(Error::InvoiceFetch { .. })
        ));
    }
}
