//! RESP2 wire support for the bundled [`crate::Client`].
//!
//! ## Modules
//!
//! - [`codec`] - Incremental encoder and decoder
//! - [`error`] - Crate-wide error type
//! - [`frame`] - Frame types representing RESP values

pub mod codec;
/// Error types.
pub mod error;
pub mod frame;
