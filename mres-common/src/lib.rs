//! # Music Resolver Common Library
//!
//! Shared code for the music resolver tools:
//! - Error type used by every crate in the workspace
//! - TOML configuration loading and store path resolution
//! - Tracing setup for the binaries
//! - SQLite store access (track records, recording cache, play history)
//! - Play timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
