use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use kvbench_api::Layout;

use crate::collector::{collect, CollectorReport};
use crate::config::RunConfig;
use crate::error::LoadgenError;
use crate::generator::{generate, GeneratorReport};
use crate::stats::{summarize, LatencySummary};
use crate::store::SampleStore;
use crate::transport::Datagram;

/// Everything one benchmark run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: RunConfig,
    pub generator: GeneratorReport,
    pub collector: CollectorReport,
    pub latency: LatencySummary,
}

/// Runs one benchmark against `transport`.
///
/// The config is validated and the sample store allocated before any thread
/// starts. Then the collector and the generator each get an OS thread and
/// share the transport, one sending and one receiving. The collector gives up
/// `duration + collect_timeout` after start. Fails with
/// [`LoadgenError::NoSamples`] if not a single reply came back.
pub fn run<T>(config: &RunConfig, transport: &T, stop: &CancellationToken) -> Result<RunReport, LoadgenError>
where
    T: Datagram + ?Sized,
{
    config.validate()?;
    let expected = config.total_requests() as usize;
    let store = SampleStore::with_capacity(expected)?;
    transport.set_poll_interval(config.poll_interval())?;

    let layout = Layout::new(config.value_size);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let deadline = Instant::now() + config.duration() + config.collect_timeout();

    tracing::info!(
        expected,
        duration_s = config.duration_secs,
        collect_timeout_ms = config.collect_timeout_ms,
        "run started"
    );

    let (generator, collector) = std::thread::scope(|s| -> Result<(GeneratorReport, CollectorReport), LoadgenError> {
        let collector = std::thread::Builder::new()
            .name("collector".into())
            .spawn_scoped(s, || collect(layout, expected, transport, &store, stop, deadline))?;
        let generator = std::thread::Builder::new()
            .name("generator".into())
            .spawn_scoped(s, || generate(config, transport, &mut rng, stop));
        let generator = match generator {
            Ok(handle) => handle,
            Err(e) => {
                // nothing will be sent; release the collector
                stop.cancel();
                let _ = collector.join();
                return Err(LoadgenError::Io(e));
            }
        };

        let generator = generator.join().map_err(|_| LoadgenError::ThreadPanicked("generator"));
        let collector = collector.join().map_err(|_| LoadgenError::ThreadPanicked("collector"));
        Ok((generator??, collector?))
    })?;

    let samples = store.into_samples();
    if samples.len() < expected {
        tracing::warn!(
            collected = samples.len(),
            expected,
            missing = expected - samples.len(),
            "replies missing"
        );
    }
    let latency = summarize(samples)?;

    tracing::info!(
        count = latency.count,
        mean_ns = format_args!("{:.0}", latency.mean),
        p50_ns = latency.p50,
        p99_ns = latency.p99,
        "run complete"
    );

    Ok(RunReport {
        config: config.clone(),
        generator,
        collector,
        latency,
    })
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::time::Duration;

    use super::*;
    use crate::collector::StopReason;
    use crate::error::ConfigError;

    /// In-process echo: every sent frame comes straight back on `recv`.
    struct Echo {
        tx: Mutex<Sender<Vec<u8>>>,
        rx: Mutex<Receiver<Vec<u8>>>,
        poll: Mutex<Duration>,
    }

    impl Echo {
        fn new() -> Self {
            let (tx, rx) = channel();
            Self {
                tx: Mutex::new(tx),
                rx: Mutex::new(rx),
                poll: Mutex::new(Duration::from_millis(10)),
            }
        }
    }

    impl Datagram for Echo {
        fn send(&self, frame: &[u8]) -> io::Result<usize> {
            self.tx
                .lock()
                .unwrap()
                .send(frame.to_vec())
                .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
            Ok(frame.len())
        }

        fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            let poll = *self.poll.lock().unwrap();
            match self.rx.lock().unwrap().recv_timeout(poll) {
                Ok(frame) => {
                    let n = frame.len().min(buf.len());
                    buf[..n].copy_from_slice(&frame[..n]);
                    Ok(n)
                }
                Err(_) => Err(io::ErrorKind::WouldBlock.into()),
            }
        }

        fn set_poll_interval(&self, interval: Duration) -> io::Result<()> {
            *self.poll.lock().unwrap() = interval;
            Ok(())
        }
    }

    /// Swallows everything; nothing ever comes back.
    struct BlackHole;

    impl Datagram for BlackHole {
        fn send(&self, frame: &[u8]) -> io::Result<usize> {
            Ok(frame.len())
        }

        fn recv(&self, _buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(5));
            Err(io::ErrorKind::WouldBlock.into())
        }

        fn set_poll_interval(&self, _interval: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            rate: 1000,
            duration_secs: 1,
            write_ratio: 10,
            key_space: 100,
            value_size: 32,
            collect_timeout_ms: 2_000,
            poll_interval_ms: 10,
            seed: Some(42),
        }
    }

    #[test]
    fn echo_run_collects_every_sample() {
        let report = run(&config(), &Echo::new(), &CancellationToken::new()).unwrap();

        assert_eq!(report.generator.attempted, 1000);
        assert_eq!(report.generator.sent, 1000);
        assert_eq!(report.collector.stop, StopReason::Complete);
        assert_eq!(report.collector.received, 1000);
        assert_eq!(report.latency.count, 1000);
        assert!(report.latency.p50 <= report.latency.p99);

        // 10% writes over 1000 requests, sigma ~9.5
        let writes = report.generator.writes as i64;
        assert!((writes - 100).abs() <= 29, "{writes} writes");
    }

    #[test]
    fn report_serializes_to_json() {
        let report = run(&config(), &Echo::new(), &CancellationToken::new()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["config"]["rate"], 1000);
        assert_eq!(json["collector"]["stop"], "complete");
        assert!(json["latency"]["p99"].is_u64());
    }

    #[test]
    fn silent_service_reports_no_samples() {
        let cfg = RunConfig { collect_timeout_ms: 100, ..config() };
        let started = Instant::now();
        let err = run(&cfg, &BlackHole, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, LoadgenError::NoSamples));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn invalid_config_fails_before_threads_start() {
        let cfg = RunConfig { write_ratio: 150, ..config() };
        let err = run(&cfg, &BlackHole, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, LoadgenError::Config(ConfigError::WriteRatio(150))));
    }

    #[test]
    fn cancelled_run_returns_promptly() {
        let cfg = RunConfig { duration_secs: 60, ..config() };
        let stop = CancellationToken::new();
        stop.cancel();
        let started = Instant::now();
        let result = run(&cfg, &Echo::new(), &stop);
        assert!(matches!(result, Err(LoadgenError::NoSamples)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
