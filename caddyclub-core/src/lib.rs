//! Caddyclub Core Library
//!
//! This crate provides the types shared by the Caddyfile converter and its
//! command line: the administrative JSON document model, conversion options,
//! and error handling.

pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Caddyclub version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
