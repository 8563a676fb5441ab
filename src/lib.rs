//! # Redkey
//!
//! Typed facades over Redis key management and string values.
//!
//! - [`Key`] - an immutable, separator-aware key name
//! - [`KeyManager`] - DEL, DUMP/RESTORE, expiry, RENAME, TYPE, KEYS, with
//!   well-known server failures translated into [`KeyError`]
//! - [`RedisString`] - SET variants, APPEND, BITCOUNT and typed BITFIELD
//!
//! The facades send commands through the [`Executor`] trait. [`Client`] is
//! the bundled implementation: a multiplexed RESP2 connection over TCP.
//!
//! ## Features
//!
//! - `test-utils` - exposes [`testing::MockExecutor`] to downstream tests
//!
//! ## Example
//!
//! ```no_run
//! use redkey::{Client, Key, KeyManager, RedisString};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("redis://localhost:6379").await?;
//!     let key = Key::new("user:1000:name");
//!
//!     RedisString::new(client.clone(), key.clone()).set("Ada").await?;
//!
//!     let keys = KeyManager::new(client);
//!     keys.expire(&key, 60).await?;
//!     assert_eq!(keys.ttl(&key).await?, 60);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod core;
pub mod data_types;
mod key;
pub mod proto;
pub mod support;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use crate::core::builder::ClientBuilder;
pub use crate::core::{Client, Error, Executor, Result};
pub use crate::data_types::bitfield::{BitFieldOp, BitFieldType, BitOffset, Overflow};
pub use crate::data_types::string::RedisString;
pub use crate::data_types::DataType;
pub use crate::key::{Key, DEFAULT_SEPARATOR};
pub use crate::support::error::KeyError;
pub use crate::support::key_manager::{KeyManager, Ttl};
