//! Shared types for the klang services
//!
//! Holds the error taxonomy and the environment configuration helpers used
//! by the service crates.

pub mod config;
pub mod error;

pub use error::{Error, Result};
