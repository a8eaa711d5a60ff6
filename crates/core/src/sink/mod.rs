//! Result sink: hands finished artifacts to the transport and removes the
//! local copies.
//!
//! Delivery tries the primary presentation first (video for playable media,
//! document otherwise) and, when enabled, exactly one fallback as a plain
//! document without caption. Cleanup is best-effort and never fails a job.

mod error;
mod result_sink;

pub use error::DeliveryError;
pub use result_sink::{upload_kind_for, DeliveryReceipt, DeliveryStrategy, ResultSink};
