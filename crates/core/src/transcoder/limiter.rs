//! Counting limiter for external remux processes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::metrics;

use super::error::TranscodeError;

/// Bounds how many remux processes may run at once.
///
/// Cloning is cheap and every clone shares the same slots. A slot is held
/// for as long as the returned [`ConversionSlot`] lives, so release happens
/// exactly once on every exit path.
#[derive(Debug, Clone)]
pub struct ConversionLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    held: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConversionLimiter {
    /// Creates a limiter with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            held: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<ConversionSlot, TranscodeError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| TranscodeError::LimiterClosed)?;
        Ok(self.slot(permit))
    }

    fn slot(&self, permit: OwnedSemaphorePermit) -> ConversionSlot {
        let held = self.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(held, Ordering::SeqCst);
        metrics::CONVERSIONS_ACTIVE.inc();
        ConversionSlot {
            _permit: permit,
            held: Arc::clone(&self.held),
        }
    }

    /// Configured number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Slots free right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held limiter slot, released on drop.
#[derive(Debug)]
pub struct ConversionSlot {
    _permit: OwnedSemaphorePermit,
    held: Arc<AtomicUsize>,
}

impl Drop for ConversionSlot {
    fn drop(&mut self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
        metrics::CONVERSIONS_ACTIVE.dec();
    }
}
