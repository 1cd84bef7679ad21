/// Shared error type used across all care-call crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The three call times of a setting are not strictly ordered, so a
    /// call time cannot be classified into a slot.
    #[error("misconfigured call window: {0}")]
    MisconfiguredCallWindow(String),

    /// The telephony endpoint rejected or never received an outbound call.
    #[error("external call failed: {0}")]
    ExternalCall(String),

    #[error("extraction: {0}")]
    Extraction(String),

    /// Optimistic version check failed on a record patch.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
