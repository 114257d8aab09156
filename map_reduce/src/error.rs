use std::io;

use thiserror::Error;

/// Failures of the framework itself. Per-record and per-group failures
/// raised by a job are logged and counted instead, see `JobSummary`.
#[derive(Debug, Error)]
pub enum MapReduceError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("error while reading config file: {0}")]
    Config(serde_json::Error),

    #[error("invalid cluster config: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(#[from] zmq::Error),

    #[error("cannot encode or decode worker report: {0}")]
    Codec(serde_json::Error),

    #[error("{stage} phase timed out after {received} of {expected} workers returned")]
    Timeout {
        stage: &'static str,
        received: usize,
        expected: usize,
    },

    #[error("unexpected report: {0}")]
    Protocol(String),

    #[error("a {0} worker panicked")]
    WorkerPanicked(&'static str),
}
