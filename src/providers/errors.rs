use thiserror::Error;

use crate::retry::Retryable;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced an HTTP response, or the body could not be
    /// read.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retriable: bool,
    },

    /// An error event delivered inside an already accepted stream.
    #[error("stream aborted by provider: {message}")]
    Stream { message: String },

    /// The response parsed but lacks the field the text lives in.
    #[error("response is missing `{path}`")]
    MissingField { path: &'static str },

    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("all {attempts} attempts failed: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    pub fn for_status(status: reqwest::StatusCode, message: String) -> Self {
        Self::Api {
            status: status.as_u16(),
            message,
            retriable: status.is_server_error()
                || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status == reqwest::StatusCode::REQUEST_TIMEOUT,
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::for_status(status, err.to_string());
        }

        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_body() || err.is_decode() {
            "failed to read body"
        } else {
            "request failed"
        };
        Self::Transport(format!("{kind}: {err}"))
    }
}

impl Retryable for ProviderError {
    fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { retriable, .. } => *retriable,
            Self::Stream { .. }
            | Self::MissingField { .. }
            | Self::InvalidJson(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    fn exhausted(self, attempts: u32) -> Self {
        Self::RetriesExhausted {
            attempts,
            source: Box::new(self),
        }
    }
}
