use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range user input. Nothing is saved when this is returned.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream rejected the credentials. Check T212_API_KEY, T212_API_SECRET and that T212_ENV matches the account (live or demo)")]
    UpstreamUnauthorized,

    #[error("Upstream rate limit reached, wait before retrying")]
    UpstreamRateLimited,

    /// Refused locally by the fetch spacing in `rate_limit`; nothing was sent.
    #[error("Last fetch was too recent, wait {wait_secs}s before fetching again")]
    FetchTooSoon { wait_secs: u64 },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream request failed with HTTP status {status}")]
    Upstream { status: i32 },

    #[error("Database operation failed: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Failed to connect to database: {0}")]
    Connection(#[from] diesel::result::ConnectionError),

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}
