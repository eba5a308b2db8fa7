use thiserror::Error;
use tokio::time::error::Elapsed;

#[derive(Debug, Error)]
pub enum PoolError<E> {
    #[error("failed to dial a new connection: {0}")]
    Dial(#[source] E),

    #[error("connection pool is closed")]
    Closed,

    #[error("timeout while acquiring a connection")]
    Timeout(#[from] Elapsed),

    #[error("connection pool is at capacity")]
    Exhausted,
}

impl<E> PoolError<E> {
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }
}
