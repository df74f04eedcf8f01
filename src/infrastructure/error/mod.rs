use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Build an API error from a response status and body
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ClientError::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the error came from the server rejecting the request
    /// (as opposed to the request never completing)
    pub fn is_api_error(&self) -> bool {
        matches!(self, ClientError::Api { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
