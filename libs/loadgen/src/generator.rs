use std::time::Instant;

use rand::distributions::{Alphanumeric, Distribution};
use rand::Rng;
use rand_distr::Exp;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use kvbench_api::{now_ns, Layout, Record};

use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::transport::Datagram;

// ═══════════════════════════════════════════════════════════════
//  Arrival schedule (Poisson process)
// ═══════════════════════════════════════════════════════════════

/// Send deadlines of a Poisson arrival process: consecutive gaps are
/// exponentially distributed with mean `1 / rate`.
///
/// The running offset is kept in floating point so truncating each gap to
/// whole nanoseconds does not drift the long-run rate.
pub struct ArrivalSchedule {
    gap: Exp<f64>,
    start_ns: u64,
    offset_ns: f64,
}

impl ArrivalSchedule {
    pub fn new(rate: u64, start_ns: u64) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        // rate per nanosecond, so draws come out in nanoseconds
        let gap = Exp::new(rate as f64 * 1e-9).map_err(|_| ConfigError::ZeroRate)?;
        Ok(Self { gap, start_ns, offset_ns: 0.0 })
    }

    /// Draws one inter-arrival gap in nanoseconds.
    pub fn draw_gap<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.gap.sample(rng)
    }

    /// Advances the schedule by one gap and returns the new deadline.
    pub fn next_deadline<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u64 {
        self.offset_ns += self.draw_gap(rng);
        self.start_ns + self.offset_ns as u64
    }
}

/// Spins on the clock until `deadline_ns`. Returns the time actually reached.
///
/// Deliberately not a sleep: a timer wakeup adds tens of microseconds of
/// jitter, which would dominate the inter-arrival gaps at high rates.
pub fn wait_until(deadline_ns: u64) -> u64 {
    loop {
        let now = now_ns();
        if now >= deadline_ns {
            return now;
        }
        std::hint::spin_loop();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Request mix
// ═══════════════════════════════════════════════════════════════

/// Draws the content of each request: key, read/write and payload.
#[derive(Debug, Clone, Copy)]
pub struct RequestMix {
    key_space: u32,
    write_ratio: u32,
    value_size: usize,
}

impl RequestMix {
    pub fn new(key_space: u32, write_ratio: u32, value_size: usize) -> Self {
        Self { key_space, write_ratio, value_size }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.key_space, config.write_ratio, config.value_size)
    }

    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> Record {
        let key = rng.gen_range(0..self.key_space);
        if rng.gen_range(0..100) < self.write_ratio {
            let value: Vec<u8> = Alphanumeric.sample_iter(&mut *rng).take(self.value_size).collect();
            Record::write(key, value)
        } else {
            Record::read(key, self.value_size)
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Generator loop
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorReport {
    /// Requests the loop went through, sent or not.
    pub attempted: u64,
    /// Requests handed to the transport without error.
    pub sent: u64,
    pub send_errors: u64,
    pub writes: u64,
    /// Worst lateness of a send relative to its scheduled deadline.
    pub max_lag_ns: u64,
    pub elapsed_ns: u64,
    /// The loop stopped early on a stop request.
    pub cancelled: bool,
}

/// Open-loop sender: issues `config.total_requests()` requests on a Poisson
/// schedule, never waiting for replies.
///
/// Send failures are counted and skipped. Returns early only if `stop` is
/// cancelled.
pub fn generate<T, R>(
    config: &RunConfig,
    transport: &T,
    rng: &mut R,
    stop: &CancellationToken,
) -> Result<GeneratorReport, ConfigError>
where
    T: Datagram + ?Sized,
    R: Rng + ?Sized,
{
    config.validate()?;
    let total = config.total_requests();
    let layout = Layout::new(config.value_size);
    let mix = RequestMix::from_config(config);
    let mut schedule = ArrivalSchedule::new(config.rate, now_ns())?;
    let mut buf = Vec::with_capacity(layout.frame_len());
    let mut report = GeneratorReport::default();
    let started = Instant::now();

    tracing::info!(
        total,
        rate = config.rate,
        write_ratio = config.write_ratio,
        frame_len = layout.frame_len(),
        "generator started"
    );

    for _ in 0..total {
        if stop.is_cancelled() {
            report.cancelled = true;
            tracing::info!(attempted = report.attempted, "generator stopped");
            break;
        }

        let deadline = schedule.next_deadline(rng);
        let reached = wait_until(deadline);
        report.max_lag_ns = report.max_lag_ns.max(reached - deadline);

        let record = mix.next(rng);
        if let Err(e) = layout.encode(&record, &mut buf) {
            // value size comes from the same config, so this is a bug
            tracing::error!(error = %e, "encode failed");
            report.attempted += 1;
            report.send_errors += 1;
            continue;
        }
        layout.stamp_issue_time(&mut buf, now_ns());

        report.attempted += 1;
        if record.is_write() {
            report.writes += 1;
        }
        match transport.send(&buf) {
            Ok(_) => report.sent += 1,
            Err(e) => {
                report.send_errors += 1;
                if report.send_errors == 1 {
                    tracing::warn!(error = %e, "send failed, continuing");
                } else {
                    tracing::debug!(error = %e, errors = report.send_errors, "send failed");
                }
            }
        }
    }

    report.elapsed_ns = started.elapsed().as_nanos() as u64;
    tracing::info!(
        sent = report.sent,
        send_errors = report.send_errors,
        writes = report.writes,
        max_lag_us = report.max_lag_ns / 1_000,
        "generator finished"
    );
    Ok(report)
}
