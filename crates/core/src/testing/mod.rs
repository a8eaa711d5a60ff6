//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the fetcher, transcoder and
//! transport traits, allowing the worker pool and engine to be exercised
//! without network access or an ffmpeg binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use batchfetch_core::testing::{MockFetcher, MockTranscoder, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! let fetcher = Arc::new(MockFetcher::new());
//! let transcoder = Arc::new(MockTranscoder::with_limiter(ConversionLimiter::new(1)));
//!
//! // Configure mock responses
//! fetcher.fail_url("https://example.com/b.pdf", 404).await;
//! transcoder.set_delay(Duration::from_millis(100)).await;
//! ```

mod mock_fetcher;
mod mock_transcoder;
mod mock_transport;

pub use mock_fetcher::MockFetcher;
pub use mock_transcoder::{MockTranscoder, RecordedConversion};
pub use mock_transport::{MockTransport, RecordedMessage};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::Config;
    use crate::job::{Batch, BatchItem};
    use std::path::Path;

    /// Create a batch with one item per URL, all for `destination`.
    pub fn batch(urls: &[&str], destination: &str) -> Batch {
        Batch::new(
            urls.iter()
                .map(|url| BatchItem::new(*url, destination))
                .collect(),
        )
    }

    /// Create a config with a working directory under `root`.
    pub fn config(root: &Path, workers: usize, max_parallel: usize) -> Config {
        let mut config = Config::default();
        config.pool.workers = workers;
        config.pool.work_dir = root.join("work");
        config.transcode.max_parallel = max_parallel;
        config.transport.outbox_dir = root.join("outbox");
        config
    }
}
