use thiserror::Error;

use crate::key::Key;

/// Key operations the server rejected for a well-known reason.
///
/// Every variant carries the textual form of the key the operation was
/// issued against. Other server replies are not translated and surface as
/// [`crate::Error::Server`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum KeyError {
    /// `DUMP` found nothing to serialize.
    #[error("Couldn't dump the key {key}. Key not found!")]
    DumpKeyNotFound {
        /// The missing key.
        key: String,
    },

    /// `RESTORE` refused to overwrite an existing key.
    #[error("The target key {key} already exists")]
    RestoreKeyExists {
        /// The key that already exists.
        key: String,
    },

    /// `RENAME` or `RENAMENX` was issued for a missing source key.
    #[error("Couldn't rename key {key}. No such key")]
    RenameKeyNotFound {
        /// The missing source key.
        key: String,
    },

    /// `TYPE` reported `none` or a tag with no known data type.
    #[error("Couldn't get type of key {key}. No such key")]
    TypeNotFound {
        /// The key whose type could not be resolved.
        key: String,
    },
}

impl KeyError {
    pub(crate) fn dump_key_not_found(key: &Key) -> Self {
        Self::DumpKeyNotFound {
            key: key.to_string(),
        }
    }

    pub(crate) fn restore_key_exists(key: &Key) -> Self {
        Self::RestoreKeyExists {
            key: key.to_string(),
        }
    }

    pub(crate) fn rename_key_not_found(key: &Key) -> Self {
        Self::RenameKeyNotFound {
            key: key.to_string(),
        }
    }

    pub(crate) fn type_not_found(key: &Key) -> Self {
        Self::TypeNotFound {
            key: key.to_string(),
        }
    }

    /// Returns the key the failed operation targeted.
    pub fn key(&self) -> &str {
        match self {
            Self::DumpKeyNotFound { key }
            | Self::RestoreKeyExists { key }
            | Self::RenameKeyNotFound { key }
            | Self::TypeNotFound { key } => key,
        }
    }
}
