//! Job data model.
//!
//! A [`Batch`] of links submitted by a transport is split into one [`Job`]
//! per link. Each job carries its position in the batch, which names the
//! artifact it produces in the working directory, and a [`JobStatus`] that
//! only ever moves forward.

mod naming;
mod types;

pub use naming::{artifact_basename, detect_kind};
pub use types::{Batch, BatchItem, InvalidTransition, Job, JobId, JobKind, JobStatus};
