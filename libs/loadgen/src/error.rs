/// Invalid run parameters. Always reported before any worker thread starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("target rate must be > 0")]
    ZeroRate,

    #[error("duration must be > 0 seconds")]
    ZeroDuration,

    #[error("write ratio must be within 0..=100, got {0}")]
    WriteRatio(u32),

    #[error("key space must be > 0")]
    ZeroKeySpace,

    #[error("value size must be within 1..={max}, got {got}")]
    ValueSize { got: usize, max: usize },

    #[error("poll interval must be > 0")]
    ZeroPollInterval,

    #[error("rate {rate} x duration {duration}s overflows the request counter")]
    TooManyRequests { rate: u64, duration: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadgenError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot allocate sample store for {0} samples")]
    Allocation(usize),

    #[error("no samples collected")]
    NoSamples,

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
