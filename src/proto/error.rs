use std::io;

use thiserror::Error;

use crate::support::error::KeyError;

/// Result type alias for redkey operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to Redis through the facades.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An IO error occurred.
    #[error("IO error: {source}")]
    Io {
        /// The underlying IO error.
        #[from]
        source: io::Error,
    },

    /// A protocol error occurred.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// The server returned an error.
    #[error("server error: {message}")]
    Server {
        /// Error message from server.
        message: String,
    },

    /// Authentication failed.
    #[error("authentication failed")]
    Auth,

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },

    /// Connecting to the server took longer than the configured timeout.
    #[error("timed out connecting to {address}")]
    Timeout {
        /// The address that could not be reached in time.
        address: String,
    },

    /// A key operation failed for a reason the server made explicit.
    #[error(transparent)]
    Key {
        /// The translated key failure.
        #[from]
        source: KeyError,
    },
}

impl Error {
    /// Returns the server message if this is [`Error::Server`].
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server { message } => Some(message),
            _ => None,
        }
    }

    /// Returns the translated key failure if this is [`Error::Key`].
    pub fn as_key_error(&self) -> Option<&KeyError> {
        match self {
            Error::Key { source } => Some(source),
            _ => None,
        }
    }
}
