//! Workflow engine, router, and repository trait definitions for Handrail.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the human-in-the-loop state machine itself. It
//! depends only on `handrail-types` -- never on `handrail-infra` or any
//! database/IO crate.

pub mod chat;
pub mod repository;
pub mod router;
pub mod workflow;
