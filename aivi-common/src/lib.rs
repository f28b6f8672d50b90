//! # AIVI Common Library
//!
//! Shared code for the AIVI interviewer bot crates:
//! - Error types
//! - Configuration file loading (TOML + platform config directory)

pub mod config;
pub mod error;

pub use error::{Error, Result};
