use thiserror::Error;

/// Error types for view pagination and the JSON codec.
#[derive(Debug, Error)]
pub enum Error {
    /// `next_page` was called after the last page was handed out.
    #[error("no more pages available")]
    Exhausted,

    /// A page could not be retrieved, or the response was structurally invalid.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The fetch was cancelled or timed out before a page arrived.
    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Decode error at line {line}, column {column}: {message}")]
    Decode {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid page size {0}: must be at least 1")]
    InvalidPageSize(usize),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Attachment error: {0}")]
    Attachment(String),
}

impl Error {
    /// True for failures raised while retrieving or decoding a page.
    /// Callers should treat these as fatal to the current iteration.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Error::Fetch(_) | Error::Cancelled | Error::Decode { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Attachment(format!("Invalid base64: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
