use clap::{Args, ValueEnum};
use serde::Deserialize;

use loadgen::RunConfig;

use super::error::KvbenchError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub rate: Option<u64>,
    pub duration: Option<u64>,
    pub write_ratio: Option<u32>,
    pub key_space: Option<u32>,
    pub value_size: Option<usize>,
    pub collect_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub seed: Option<u64>,
    pub output: Option<Output>,
}

pub fn load_config(path: &str) -> Result<Config, KvbenchError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| KvbenchError::Config(format!("cannot read config {path}: {e}")))?;
    parse_config(&content).map_err(|e| KvbenchError::Config(format!("bad config {path}: {e}")))
}

fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    #[default]
    Text,
    Json,
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct BenchArgs {
    /// Path to kvbench.toml
    #[arg(long, default_value = "kvbench.toml", env = "KVBENCH_CONFIG")]
    pub config: String,

    /// Server host
    #[arg(long, env = "KVBENCH_HOST")]
    pub host: Option<String>,

    /// Server UDP port
    #[arg(short, long, env = "KVBENCH_PORT")]
    pub port: Option<u16>,

    /// Local address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Target request rate (requests/s)
    #[arg(short, long)]
    pub rate: Option<u64>,

    /// Sending phase length in seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Percentage of writes, 0-100
    #[arg(short, long)]
    pub write_ratio: Option<u32>,

    /// Keys are drawn from 0..key_space
    #[arg(long)]
    pub key_space: Option<u32>,

    /// Value payload size in bytes
    #[arg(long)]
    pub value_size: Option<usize>,

    /// Extra time to wait for replies after the last send (ms)
    #[arg(long)]
    pub collect_timeout_ms: Option<u64>,

    /// Receive poll interval (ms)
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// RNG seed (random if unset)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Result format
    #[arg(short, long, value_enum)]
    pub output: Option<Output>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Final settings: defaults < kvbench.toml < env/CLI. Validated.
#[derive(Debug)]
pub struct Effective {
    pub host: String,
    pub port: u16,
    pub bind: String,
    pub output: Output,
    pub run: RunConfig,
}

impl Effective {
    pub fn new(args: &BenchArgs) -> Result<Self, KvbenchError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    fn merge(args: &BenchArgs, cfg: Config) -> Result<Self, KvbenchError> {
        let defaults = RunConfig::default();
        let run = RunConfig {
            rate: args.rate.or(cfg.rate).unwrap_or(defaults.rate),
            duration_secs: args.duration.or(cfg.duration).unwrap_or(defaults.duration_secs),
            write_ratio: args.write_ratio.or(cfg.write_ratio).unwrap_or(defaults.write_ratio),
            key_space: args.key_space.or(cfg.key_space).unwrap_or(defaults.key_space),
            value_size: args.value_size.or(cfg.value_size).unwrap_or(defaults.value_size),
            collect_timeout_ms: args
                .collect_timeout_ms
                .or(cfg.collect_timeout_ms)
                .unwrap_or(defaults.collect_timeout_ms),
            poll_interval_ms: args
                .poll_interval_ms
                .or(cfg.poll_interval_ms)
                .unwrap_or(defaults.poll_interval_ms),
            seed: args.seed.or(cfg.seed),
        };
        run.validate().map_err(|e| KvbenchError::Config(e.to_string()))?;

        Ok(Self {
            host: args.host.clone().or(cfg.host).unwrap_or_else(|| "127.0.0.1".into()),
            port: args.port.or(cfg.port).unwrap_or(5001),
            bind: args.bind.clone().or(cfg.bind).unwrap_or_else(|| "0.0.0.0:0".into()),
            output: args.output.or(cfg.output).unwrap_or_default(),
            run,
        })
    }
}
