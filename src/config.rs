//! Relay configuration
//!
//! Every size threshold the admission policy and compression pipeline use
//! lives here. The 8/25/45 MB numbers were tuned against the messaging
//! provider's attachment limit rather than derived from a documented
//! constraint, so they are configuration, not constants.

use std::path::PathBuf;

/// Size policy and resource configuration for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Working directory for temporary attachment files
    pub work_dir: PathBuf,
    /// Business-logic cap on the total request size in MB (default: 100).
    /// Requests beyond this still deliver text and XML; the PDF is omitted.
    pub request_cap_mb: f64,
    /// Transport-level admission cap in MB (default: 250). Deliberately more
    /// permissive than `request_cap_mb` so the surrounding transport never
    /// rejects a request before business logic runs.
    pub transport_cap_mb: f64,
    /// PDF size in MB above which compression is attempted (default: 8)
    pub compression_trigger_mb: f64,
    /// Target size in MB for the compression pipeline (default: 25)
    pub compression_target_mb: f64,
    /// Hard ceiling in MB on a PDF after compression (default: 45)
    pub post_compression_cap_mb: f64,
    /// Timeout in seconds for invoice-fetch API calls (default: 30)
    pub invoice_fetch_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            request_cap_mb: 100.0,
            transport_cap_mb: 250.0,
            compression_trigger_mb: 8.0,
            compression_target_mb: 25.0,
            post_compression_cap_mb: 45.0,
            invoice_fetch_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = RelayConfig::default();
        assert_eq!(config.compression_trigger_mb, 8.0);
        assert_eq!(config.compression_target_mb, 25.0);
        assert_eq!(config.post_compression_cap_mb, 45.0);
        assert!(config.request_cap_mb < config.transport_cap_mb);
    }
}
