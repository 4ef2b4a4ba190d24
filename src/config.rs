//! Service configuration with defaults, loadable from JSON.

use serde::Deserialize;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input is not valid JSON for [`ServiceConfig`].
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Datastore settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Attempts per transaction before giving up on contention.
    pub max_transaction_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: 3,
        }
    }
}

/// Task worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Bound of the job channel; enqueues beyond it are rejected.
    pub queue_bound: usize,
    /// Period of the announcement refresh; 0 disables the tick.
    pub announcement_interval_ms: u64,
    /// Attempts per job before it is reported as failed.
    pub job_max_attempts: u32,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_bound: 256,
            announcement_interval_ms: 60_000,
            job_max_attempts: 3,
            event_capacity: 1024,
        }
    }
}

/// How featured-speaker jobs maintain the cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturedSpeakerMode {
    /// Append to a matching entry when it is provably current, rescan otherwise.
    #[default]
    Incremental,
    /// Always rebuild the entry from a conference rescan.
    AlwaysRescan,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Datastore settings.
    pub store: StoreConfig,
    /// Worker settings.
    pub worker: WorkerConfig,
    /// Featured-speaker maintenance strategy.
    pub featured_speaker: FeaturedSpeakerMode,
}

impl ServiceConfig {
    /// Parses and validates a JSON document; missing keys take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_transaction_attempts == 0 {
            return Err(ConfigError::Invalid(
                "store.max_transaction_attempts must be at least 1".to_string(),
            ));
        }
        if self.worker.queue_bound == 0 {
            return Err(ConfigError::Invalid(
                "worker.queue_bound must be at least 1".to_string(),
            ));
        }
        if self.worker.job_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "worker.job_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.worker.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "worker.event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
