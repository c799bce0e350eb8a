use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The node answered, and the entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The node could not be reached or timed out.
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("node returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
