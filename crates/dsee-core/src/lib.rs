//! # dsee-core
//!
//! Core types shared by the directory account lifecycle crates.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy for directory reads, binds and modifications
//! - [`credentials`] - The privileged service identity used for administrative binds

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credentials;
pub mod error;

// Re-export commonly used types
pub use credentials::ServiceCredentials;
pub use error::{Error, Result};
