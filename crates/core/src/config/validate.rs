use super::{types::Config, ConfigError};

/// Validate configuration
///
/// Every count and duration the engine sizes itself from must be positive.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let checks: [(&str, u64); 6] = [
        ("pool.workers", config.pool.workers as u64),
        ("fetch.timeout_secs", config.fetch.timeout_secs),
        ("fetch.chunk_size", config.fetch.chunk_size as u64),
        ("transcode.max_parallel", config.transcode.max_parallel as u64),
        ("transcode.timeout_secs", config.transcode.timeout_secs),
        ("notifier.throttle_secs", config.notifier.throttle_secs),
    ];

    for (name, value) in checks {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                name
            )));
        }
    }

    if config.pool.work_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "pool.work_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
