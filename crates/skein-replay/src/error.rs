use thiserror::Error;

/// Replay-side failures. Fetch errors are transient by policy: the dispatch
/// loop logs them and retries on the next scheduled attempt, it never
/// crashes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("chat source: {0}")]
    Source(String),

    #[error("chat log exhausted")]
    EndOfLog,
}

pub type ReplayResult<T> = Result<T, ReplayError>;
