//! Key-lifecycle management.
//!
//! - [`KeyManager`](key_manager::KeyManager) - DEL, DUMP/RESTORE, expiry,
//!   RENAME, TYPE, KEYS
//! - [`KeyError`](error::KeyError) - server replies translated into typed
//!   failures

pub mod error;
pub mod key_manager;
