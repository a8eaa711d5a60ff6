pub mod config;
pub mod engine;
pub mod fetcher;
pub mod job;
pub mod metrics;
pub mod notifier;
pub mod pool;
pub mod queue;
pub mod sink;
pub mod testing;
pub mod transcoder;
pub mod transport;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ThrottleScope,
};
pub use engine::{BatchEngine, EngineReport};
pub use fetcher::{FetchError, FetchProgress, Fetcher, HttpFetcher};
pub use job::{Batch, BatchItem, Job, JobId, JobKind, JobStatus};
pub use notifier::Notifier;
pub use pool::{BatchSummary, JobError, PoolDeps, PoolStatus, WorkerPool};
pub use queue::{JobQueue, QueueItem};
pub use sink::{DeliveryError, DeliveryReceipt, DeliveryStrategy, ResultSink};
pub use transcoder::{ConversionLimiter, FfmpegTranscoder, TranscodeError, Transcoder};
pub use transport::{LocalTransport, Transport, TransportError, Upload, UploadKind};
