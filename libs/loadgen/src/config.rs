use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM: usize = 65_507;

/// Parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// Target mean request rate, requests per second.
    pub rate: u64,
    /// Length of the sending phase in seconds.
    pub duration_secs: u64,
    /// Percentage of requests that are writes, 0..=100.
    pub write_ratio: u32,
    /// Keys are drawn uniformly from `0..key_space`.
    pub key_space: u32,
    /// Size of the value payload carried by every frame.
    pub value_size: usize,
    /// How long the collector keeps waiting after the sending phase.
    pub collect_timeout_ms: u64,
    /// Receive timeout used by the collector to observe stop requests.
    pub poll_interval_ms: u64,
    /// Fixed RNG seed for a reproducible request sequence.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rate: 1000,
            duration_secs: 1,
            write_ratio: 10,
            key_space: 100_000,
            value_size: 128,
            collect_timeout_ms: 5_000,
            poll_interval_ms: 100,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.write_ratio > 100 {
            return Err(ConfigError::WriteRatio(self.write_ratio));
        }
        if self.key_space == 0 {
            return Err(ConfigError::ZeroKeySpace);
        }
        let max_value = MAX_DATAGRAM - kvbench_api::Layout::new(0).frame_len();
        if self.value_size == 0 || self.value_size > max_value {
            return Err(ConfigError::ValueSize { got: self.value_size, max: max_value });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.checked_total()
            .filter(|n| usize::try_from(*n).is_ok())
            .ok_or(ConfigError::TooManyRequests { rate: self.rate, duration: self.duration_secs })?;
        Ok(())
    }

    /// `rate × duration`: the exact number of requests a run sends.
    pub fn total_requests(&self) -> u64 {
        self.checked_total().unwrap_or(u64::MAX)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn checked_total(&self) -> Option<u64> {
        self.rate.checked_mul(self.duration_secs)
    }
}
