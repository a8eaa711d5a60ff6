//! Transport module: where batches come from and where reports go.
//!
//! The worker pool only talks to the outside world through the `Transport`
//! trait. `LocalTransport` reads batches from a JSON file and writes
//! messages and artifacts into an outbox directory, which is enough to run
//! the engine end to end without a chat service.

mod error;
mod local;
mod traits;

pub use error::TransportError;
pub use local::LocalTransport;
pub use traits::{Transport, Upload, UploadKind};
