#[derive(Debug, thiserror::Error)]
pub enum KvbenchError {
    #[error("{0}")]
    Config(String),

    #[error("connect {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },

    #[error("{0}")]
    Run(#[from] loadgen::LoadgenError),

    #[error("benchmark task: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
}
