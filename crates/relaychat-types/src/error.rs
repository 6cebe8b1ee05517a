use thiserror::Error;

/// Errors from repository operations (used by trait definitions in relaychat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the session store gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or failed transiently. Retryable.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// The session does not exist for this owner, or it was deleted.
    #[error("session not found")]
    NotFound,

    /// The store refused the request as invalid. Not retryable.
    #[error("session store rejected the request: {0}")]
    Rejected(String),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => StoreError::NotFound,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Errors from the upstream generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Connection refused, reset, or timed out.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A stream record could not be parsed.
    #[error("malformed upstream record: {0}")]
    Malformed(String),

    /// Upstream reported an error record in the stream.
    #[error("upstream error: {0}")]
    Rejected(String),
}

/// Errors between the chat client and the relay server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    #[error("relay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("relay stream interrupted: {0}")]
    Interrupted(String),
}

/// Errors from session lifecycle operations on the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("a turn is already in progress")]
    TurnInProgress,

    #[error("no turn is in progress")]
    NoTurn,

    #[error("unknown session '{0}'")]
    UnknownSession(String),

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error(transparent)]
    Store(#[from] StoreError),
}
