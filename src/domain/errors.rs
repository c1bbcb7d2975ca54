use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlpacaError>;

/// Errors surfaced by the Alpaca client
#[derive(Debug, Error)]
pub enum AlpacaError {
    /// The server answered with its `{message, code}` error shape.
    #[error("Alpaca API error (code {code:?}): {message}")]
    Server { message: String, code: Option<i64> },

    #[error("Malformed number {value:?}: cannot be read as {target}")]
    MalformedNumber { value: String, target: &'static str },

    /// The body passed error classification but does not match the expected model.
    /// This is a client defect, never a recoverable condition.
    #[error("Unexpected schema for {path}: {reason}")]
    UnexpectedSchema { path: String, reason: String },

    #[error("HTTP {status} from {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Switching between live and paper requires an OAuth access token")]
    ModeSwitchUnsupported,
}

impl AlpacaError {
    pub fn server(message: impl Into<String>, code: Option<i64>) -> Self {
        Self::Server {
            message: message.into(),
            code,
        }
    }

    pub fn transport(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(error))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest_middleware::Error> for AlpacaError {
    fn from(error: reqwest_middleware::Error) -> Self {
        Self::transport(error)
    }
}

impl From<reqwest::Error> for AlpacaError {
    fn from(error: reqwest::Error) -> Self {
        Self::transport(error)
    }
}
