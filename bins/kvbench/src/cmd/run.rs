use std::io::Write;

use tokio_util::sync::CancellationToken;

use loadgen::{connect_udp, RunReport, StopReason};

use super::config::{Effective, Output};
use super::error::KvbenchError;

pub async fn run(eff: &Effective) -> Result<(), KvbenchError> {
    let remote = format!("{}:{}", eff.host, eff.port);
    let socket = connect_udp(eff.bind.as_str(), remote.as_str())
        .map_err(|e| KvbenchError::Connect { addr: remote.clone(), source: e })?;

    tracing::info!(
        remote = %remote,
        rate = eff.run.rate,
        duration_s = eff.run.duration_secs,
        write_ratio = eff.run.write_ratio,
        requests = eff.run.total_requests(),
        "starting benchmark"
    );

    let stop = CancellationToken::new();
    let config = eff.run.clone();
    let worker_stop = stop.clone();
    let mut task = tokio::task::spawn_blocking(move || loadgen::run(&config, &socket, &worker_stop));

    let report = tokio::select! {
        res = &mut task => res??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping...");
            stop.cancel();
            task.await??
        }
    };

    let mut out = std::io::stdout().lock();
    match eff.output {
        Output::Text => print_text(&mut out, &report).ok(),
        Output::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out).ok()
        }
    };
    Ok(())
}

fn print_text(out: &mut impl Write, report: &RunReport) -> std::io::Result<()> {
    let g = &report.generator;
    let c = &report.collector;
    let l = &report.latency;

    writeln!(out, "kvbench results")?;
    writeln!(
        out,
        "  requests : {} sent, {} send errors, {} writes",
        g.sent, g.send_errors, g.writes
    )?;
    writeln!(out, "  replies  : {}/{} ({} malformed)", c.received, c.expected, c.malformed)?;
    match c.stop {
        StopReason::Complete => {}
        StopReason::TimedOut => writeln!(out, "  note     : collection timed out, some replies lost")?,
        StopReason::Cancelled => writeln!(out, "  note     : run interrupted")?,
    }
    writeln!(out, "  max lag  : {:.1} us behind schedule", g.max_lag_ns as f64 / 1e3)?;
    writeln!(out, "Average latency: {:.2} nanoseconds", l.mean)?;
    writeln!(out, "50th percentile latency: {} nanoseconds", l.p50)?;
    writeln!(out, "99th percentile latency: {} nanoseconds", l.p99)?;
    writeln!(out, "  min/p90/p99.9/max: {} / {} / {} / {} ns", l.min, l.p90, l.p999, l.max)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use loadgen::{CollectorReport, GeneratorReport, LatencySummary, RunConfig};

    use super::*;

    fn report(stop: StopReason) -> RunReport {
        RunReport {
            config: RunConfig::default(),
            generator: GeneratorReport {
                attempted: 1000,
                sent: 1000,
                writes: 97,
                ..GeneratorReport::default()
            },
            collector: CollectorReport {
                expected: 1000,
                received: 990,
                malformed: 2,
                recv_errors: 0,
                stop,
            },
            latency: LatencySummary {
                count: 990,
                mean: 12_345.5,
                min: 9_000,
                p50: 12_000,
                p90: 14_000,
                p99: 20_000,
                p999: 25_000,
                max: 31_000,
            },
        }
    }

    #[test]
    fn text_output_lists_percentiles() {
        let mut buf = Vec::new();
        print_text(&mut buf, &report(StopReason::Complete)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Average latency: 12345.50 nanoseconds"));
        assert!(text.contains("50th percentile latency: 12000 nanoseconds"));
        assert!(text.contains("99th percentile latency: 20000 nanoseconds"));
        assert!(text.contains("990/1000"));
        assert!(!text.contains("note"));
    }

    #[test]
    fn text_output_flags_timeouts() {
        let mut buf = Vec::new();
        print_text(&mut buf, &report(StopReason::TimedOut)).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("timed out"));
    }
}
