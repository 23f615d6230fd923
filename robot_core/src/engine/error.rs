use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("adapter returned no legal moves for a non-terminal position (digest {digest:#018x})")]
    NoLegalMoves { digest: u64 },

    #[error("digest mismatch after unmake at depth {depth}: expected {expected:#018x}, found {found:#018x}")]
    DigestMismatch {
        expected: u64,
        found: u64,
        depth: usize,
    },

    #[error("unmake out of order at depth {depth}: {detail}")]
    UnmakeOutOfOrder { depth: usize, detail: String },

    #[error("the game is over and the adapter offers no pass move")]
    GameOver,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to start search thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("failed to build search thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("search thread ended without a result")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
