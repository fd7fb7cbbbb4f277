use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use kvbench_api::{now_ns, Layout};

use crate::store::SampleStore;
use crate::transport::{is_poll_timeout, Datagram};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The expected number of samples was collected.
    Complete,
    /// The overall deadline passed first.
    TimedOut,
    /// A stop was requested.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorReport {
    pub expected: usize,
    pub received: usize,
    pub malformed: u64,
    pub recv_errors: u64,
    pub stop: StopReason,
}

/// Receives replies until `expected` samples are stored, `deadline` passes or
/// `stop` is cancelled.
///
/// Each well-formed reply yields one sample: local receive time minus the
/// echoed `issue_time`. Malformed datagrams and receive errors are counted and
/// skipped. The transport's poll interval bounds how long a stop request or
/// the deadline can go unnoticed.
pub fn collect<T>(
    layout: Layout,
    expected: usize,
    transport: &T,
    store: &SampleStore,
    stop: &CancellationToken,
    deadline: Instant,
) -> CollectorReport
where
    T: Datagram + ?Sized,
{
    // one spare byte so oversized datagrams show up as a length mismatch
    let mut buf = vec![0u8; layout.frame_len() + 1];
    let mut report = CollectorReport {
        expected,
        received: 0,
        malformed: 0,
        recv_errors: 0,
        stop: StopReason::Complete,
    };

    while report.received < expected {
        if stop.is_cancelled() {
            report.stop = StopReason::Cancelled;
            break;
        }
        if Instant::now() >= deadline {
            report.stop = StopReason::TimedOut;
            break;
        }

        let n = match transport.recv(&mut buf) {
            Ok(n) => n,
            Err(e) if is_poll_timeout(&e) => continue,
            Err(e) => {
                report.recv_errors += 1;
                if report.recv_errors == 1 {
                    tracing::warn!(error = %e, "receive failed, continuing");
                } else {
                    tracing::debug!(error = %e, errors = report.recv_errors, "receive failed");
                }
                continue;
            }
        };
        let received_at = now_ns();

        let issue_time = match layout.peek_issue_time(&buf[..n]) {
            Ok(t) => t,
            Err(e) => {
                report.malformed += 1;
                tracing::debug!(error = %e, len = n, "dropping malformed reply");
                continue;
            }
        };

        let sample = received_at.saturating_sub(issue_time);
        if !store.push(sample) {
            tracing::debug!("sample store full");
            break;
        }
        report.received += 1;
        tracing::trace!(n = report.received, latency_ns = sample, "reply");
    }

    tracing::info!(
        received = report.received,
        expected,
        malformed = report.malformed,
        recv_errors = report.recv_errors,
        stop = ?report.stop,
        "collector finished"
    );
    report
}
