//! # formsense Common Library
//!
//! Shared code for the formsense crates:
//! - Error types
//! - TOML configuration file resolution and loading
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
