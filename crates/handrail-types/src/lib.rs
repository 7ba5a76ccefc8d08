//! Shared domain types for Handrail.
//!
//! This crate contains the core domain types used across the Handrail
//! workflow engine: workflow instances, pending requests, sessions, turns,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod session;
pub mod workflow;
