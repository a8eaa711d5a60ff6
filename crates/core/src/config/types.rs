use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Directory where artifacts are written before delivery.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            work_dir: default_work_dir(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("downloads")
}

/// Plain download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Maximum time to wait for the response head or for the next body chunk.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// TCP connect timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Write buffer size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            chunk_size: default_chunk_size(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_chunk_size() -> usize {
    8192
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

/// Stream remux configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Maximum remux processes running at once, independent of worker count.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Timeout for a single remux in seconds.
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
    /// FFmpeg log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Additional output arguments inserted before the destination path.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            max_parallel: default_max_parallel(),
            timeout_secs: default_transcode_timeout(),
            log_level: default_log_level(),
            extra_args: Vec::new(),
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the ffmpeg binary path.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Sets the maximum parallel remux processes.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_max_parallel() -> usize {
    2
}

fn default_transcode_timeout() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "error".to_string()
}

/// How progress throttling is keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleScope {
    /// One timestamp shared by every job.
    Global,
    /// One timestamp per submitted batch.
    PerBatch,
    /// One timestamp per job.
    #[default]
    #[serde(alias = "per_context")]
    PerJob,
}

/// Progress notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Minimum interval between intermediate updates of the same context.
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,
    #[serde(default)]
    pub scope: ThrottleScope,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            throttle_secs: default_throttle_secs(),
            scope: ThrottleScope::default(),
        }
    }
}

impl NotifierConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }
}

fn default_throttle_secs() -> u64 {
    10
}

/// Artifact delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Retry a failed upload once as a plain document.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enable_fallback: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Local transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// JSON file holding the batch to process.
    #[serde(default)]
    pub batch_file: Option<PathBuf>,
    /// Directory that receives delivered files.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            batch_file: None,
            outbox_dir: default_outbox_dir(),
        }
    }
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("outbox")
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human readable ones.
    #[serde(default)]
    pub json: bool,
    /// Log the prometheus text exposition on shutdown.
    #[serde(default)]
    pub metrics_on_exit: bool,
}

/// Config summary safe to log at startup
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub workers: usize,
    pub work_dir: String,
    pub fetch_timeout_secs: u64,
    pub max_parallel_conversions: usize,
    pub conversion_timeout_secs: u64,
    pub throttle_secs: u64,
    pub throttle_scope: ThrottleScope,
    pub batch_file_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.pool.workers,
            work_dir: config.pool.work_dir.display().to_string(),
            fetch_timeout_secs: config.fetch.timeout_secs,
            max_parallel_conversions: config.transcode.max_parallel,
            conversion_timeout_secs: config.transcode.timeout_secs,
            throttle_secs: config.notifier.throttle_secs,
            throttle_scope: config.notifier.scope,
            batch_file_configured: config.transport.batch_file.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.pool.workers, 3);
        assert_eq!(config.pool.work_dir, PathBuf::from("downloads"));
        assert_eq!(config.fetch.chunk_size, 8192);
        assert_eq!(config.transcode.max_parallel, 2);
        assert_eq!(config.notifier.throttle_secs, 10);
        assert_eq!(config.notifier.scope, ThrottleScope::PerJob);
        assert!(config.delivery.enable_fallback);
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[pool]
workers = 5
work_dir = "/tmp/bf"

[transcode]
ffmpeg_path = "/usr/local/bin/ffmpeg"
max_parallel = 1
extra_args = ["-bsf:a", "aac_adtstoasc"]

[notifier]
throttle_secs = 3
scope = "global"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pool.workers, 5);
        assert_eq!(config.pool.work_dir, PathBuf::from("/tmp/bf"));
        assert_eq!(
            config.transcode.ffmpeg_path,
            PathBuf::from("/usr/local/bin/ffmpeg")
        );
        assert_eq!(config.transcode.max_parallel, 1);
        assert_eq!(config.transcode.extra_args.len(), 2);
        assert_eq!(config.notifier.scope, ThrottleScope::Global);
        assert_eq!(config.notifier.interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_unknown_scope_fails() {
        let toml = r#"
[notifier]
scope = "sometimes"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_transcode_builder() {
        let config = TranscodeConfig::default()
            .with_ffmpeg_path("/opt/ffmpeg")
            .with_max_parallel(8)
            .with_timeout(30);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.max_parallel, 8);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_sanitized_config() {
        let mut config = Config::default();
        config.transport.batch_file = Some(PathBuf::from("batch.json"));
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.workers, 3);
        assert_eq!(sanitized.work_dir, "downloads");
        assert!(sanitized.batch_file_configured);
        assert_eq!(sanitized.throttle_scope, ThrottleScope::PerJob);
    }
}
