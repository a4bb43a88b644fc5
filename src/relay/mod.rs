//! Message relay: admission, dispatch, and capability boundaries

pub mod admission;
pub mod capability;
pub mod dispatch;
pub mod invoice;

pub use admission::{AdmissionAction, AdmissionDecision, AdmissionPolicy};
pub use capability::{HistoryEntry, HistoryStore, InvoiceFetcher, Notifier, Transport};
pub use dispatch::{
    DispatchReport, MessageDispatcher, OutboundMessage, PdfDelivery, DEFAULT_INVOICE_MESSAGE,
};
pub use invoice::{decode_invoice_response, HttpInvoiceFetcher};
