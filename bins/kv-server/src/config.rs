use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "kv-server", about = "UDP key-value responder for kvbench")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start serving requests
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to TOML config file (optional)
    #[arg(long, default_value = "kv-server.toml", env = "KV_SERVER_CONFIG")]
    pub config: String,

    /// UDP port, overrides the config file
    #[arg(short, long, env = "KV_SERVER_PORT")]
    pub port: Option<u16>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Value size of the wire frame. Must match the client's.
    #[serde(default = "default_value_size")]
    pub value_size: usize,
    /// Number of random key/value pairs written before serving.
    #[serde(default = "default_preload")]
    pub preload: usize,
    /// Preloaded keys are drawn from `0..key_space`.
    #[serde(default = "default_key_space")]
    pub key_space: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5001
}
fn default_value_size() -> usize {
    128
}
fn default_preload() -> usize {
    100_000
}
fn default_key_space() -> u32 {
    100_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            value_size: default_value_size(),
            preload: default_preload(),
            key_space: default_key_space(),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    /// Loads `args.config` if it exists, falls back to defaults otherwise, and
    /// applies CLI overrides.
    pub fn resolve(args: &ServeArgs) -> Result<Self, ServerError> {
        let mut config = if std::path::Path::new(&args.config).exists() {
            Self::load(&args.config)?
        } else {
            Self::default()
        };
        if let Some(port) = args.port {
            config.port = port;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.value_size == 0 {
            return Err(ServerError::Config { context: "value_size", detail: "must be > 0".into() });
        }
        if self.preload > 0 && self.key_space == 0 {
            return Err(ServerError::Config { context: "key_space", detail: "must be > 0 to preload".into() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ServerConfig = toml::from_str("port = 6001\nvalue_size = 8").unwrap();
        assert_eq!(cfg.port, 6001);
        assert_eq!(cfg.value_size, 8);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.preload, 100_000);
    }

    #[test]
    fn missing_file_uses_defaults_and_cli_port() {
        let args = ServeArgs { config: "/nonexistent/kv-server.toml".into(), port: Some(7001) };
        let cfg = ServerConfig::resolve(&args).unwrap();
        assert_eq!(cfg.port, 7001);
        assert_eq!(cfg.value_size, 128);
    }

    #[test]
    fn zero_value_size_is_rejected() {
        let cfg = ServerConfig { value_size: 0, ..ServerConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
