//! Error types for the sink module.

use thiserror::Error;

/// Delivery failed on every attempted strategy.
#[derive(Debug, Clone, Error)]
#[error("Delivery to {destination} failed: {primary}{}", fallback_suffix(.fallback))]
pub struct DeliveryError {
    pub destination: String,
    /// Reason the primary upload failed.
    pub primary: String,
    /// Reason the fallback failed, when one was attempted.
    pub fallback: Option<String>,
}

fn fallback_suffix(fallback: &Option<String>) -> String {
    match fallback {
        Some(reason) => format!(" (fallback: {})", reason),
        None => String::new(),
    }
}

impl DeliveryError {
    /// Whether a fallback was attempted before giving up.
    pub fn fallback_attempted(&self) -> bool {
        self.fallback.is_some()
    }
}
