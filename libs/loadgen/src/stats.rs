use serde::Serialize;

use crate::error::LoadgenError;

/// Percentiles are resolved in parts-per-million so that the floor of
/// `p × N` is computed in integers.
const PPM: u128 = 1_000_000;

/// Summary statistics of one run, all latencies in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

/// Latency samples sorted ascending. Never empty.
#[derive(Debug, Clone)]
pub struct SortedSamples {
    samples: Vec<u64>,
}

impl SortedSamples {
    pub fn new(mut samples: Vec<u64>) -> Result<Self, LoadgenError> {
        if samples.is_empty() {
            return Err(LoadgenError::NoSamples);
        }
        samples.sort_unstable();
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at index `floor(p × N)`, clamped to the last sample.
    /// `p` is a fraction in `[0, 1]`; values outside are clamped.
    pub fn percentile(&self, p: f64) -> u64 {
        let n = self.samples.len();
        let ppm = (p.clamp(0.0, 1.0) * PPM as f64).round() as u128;
        let idx = (n as u128 * ppm / PPM) as usize;
        self.samples[idx.min(n - 1)]
    }

    pub fn mean(&self) -> f64 {
        let total: u128 = self.samples.iter().map(|&s| s as u128).sum();
        total as f64 / self.samples.len() as f64
    }

    pub fn min(&self) -> u64 {
        self.samples[0]
    }

    pub fn max(&self) -> u64 {
        self.samples[self.samples.len() - 1]
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            count: self.len(),
            mean: self.mean(),
            min: self.min(),
            p50: self.percentile(0.50),
            p90: self.percentile(0.90),
            p99: self.percentile(0.99),
            p999: self.percentile(0.999),
            max: self.max(),
        }
    }
}

/// Sorts `samples` and reduces them to a [`LatencySummary`].
pub fn summarize(samples: Vec<u64>) -> Result<LatencySummary, LoadgenError> {
    Ok(SortedSamples::new(samples)?.summary())
}
