//! Open-loop load generation against a UDP key-value service.
//!
//! A run pairs a Poisson-paced [`generator`] with a reply [`collector`] on
//! two OS threads sharing one socket. Latency samples land in a
//! [`SampleStore`] and are reduced by [`stats`] once both threads finish.

pub mod collector;
pub mod config;
pub mod error;
pub mod generator;
pub mod stats;
mod run;
mod store;
mod transport;

pub use collector::{collect, CollectorReport, StopReason};
pub use config::RunConfig;
pub use error::{ConfigError, LoadgenError};
pub use generator::{generate, GeneratorReport};
pub use run::{run, RunReport};
pub use stats::{summarize, LatencySummary, SortedSamples};
pub use store::SampleStore;
pub use transport::{connect_udp, Datagram};
