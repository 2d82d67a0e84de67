use thiserror::Error;

use crate::retry::Retryable;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("too many redirects")]
    RedirectLoop,

    #[error("http error {status}")]
    Http {
        status: reqwest::StatusCode,
        retriable: bool,
    },

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("failed to read body: {0}")]
    Body(String),
}

impl FetchError {
    /// Server errors and throttling are worth another attempt; client errors
    /// and unusable bodies are not.
    pub fn for_status(status: reqwest::StatusCode) -> Self {
        Self::Http {
            status,
            retriable: status.is_server_error()
                || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status == reqwest::StatusCode::REQUEST_TIMEOUT,
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            }
        } else if err.is_redirect() {
            Self::RedirectLoop
        } else if let Some(status) = err.status() {
            Self::for_status(status)
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            // DNS, refused connections, resets
            Self::Connect(err.to_string())
        }
    }
}

impl Retryable for FetchError {
    fn should_retry(&self) -> bool {
        match self {
            Self::InvalidUrl(_)
            | Self::Client(_)
            | Self::BodyTooLarge(_)
            | Self::UnsupportedContentType(_) => false,
            Self::Http { retriable, .. } => *retriable,
            Self::Connect(_)
            | Self::ConnectTimeout
            | Self::RequestTimeout
            | Self::RedirectLoop
            | Self::Body(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        assert!(FetchError::for_status(StatusCode::BAD_GATEWAY).should_retry());
        assert!(FetchError::for_status(StatusCode::TOO_MANY_REQUESTS).should_retry());
        assert!(!FetchError::for_status(StatusCode::NOT_FOUND).should_retry());
        assert!(!FetchError::for_status(StatusCode::FORBIDDEN).should_retry());
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        assert!(!FetchError::BodyTooLarge(10).should_retry());
        assert!(!FetchError::UnsupportedContentType("image/png".into()).should_retry());
        assert!(!FetchError::Client("no tls backend".into()).should_retry());
        assert!(FetchError::RequestTimeout.should_retry());
        assert!(FetchError::Connect("dns error".into()).should_retry());
        assert!(FetchError::Body("reset".into()).should_retry());
    }
}
