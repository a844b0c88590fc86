//! Error types for vellum-remote.

use thiserror::Error;

/// All errors that can arise from talking to the remote content store.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The store answered with a non-success HTTP status.
    #[error("remote returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never completed (DNS, TLS, connection reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The store answered, but not with what the protocol promises.
    #[error("invalid response from remote: {0}")]
    Response(String),

    /// Failed to read or decode a response body.
    #[error("failed to decode response: {0}")]
    Decode(#[from] std::io::Error),
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "<unreadable body>".to_owned());
                TransportError::Http { status, message }
            }
            ureq::Error::Transport(transport) => TransportError::Network(transport.to_string()),
        }
    }
}
