//! Infrastructure implementations for Handrail.
//!
//! Implements the repository traits from `handrail-core` with SQLite
//! (durable) and in-memory (fallback) backends, provides the one-time
//! durable-or-local storage selection, the concrete step handlers, and
//! config loading.

pub mod config;
pub mod handler;
pub mod memory;
pub mod sqlite;
pub mod storage;

use std::path::PathBuf;

/// Resolve the Handrail data directory.
///
/// `HANDRAIL_DATA_DIR` wins; otherwise `~/.handrail`; last resort is a
/// relative `.handrail` in the working directory.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HANDRAIL_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".handrail");
    }

    PathBuf::from(".handrail")
}
