//! Concrete step handler implementations.
//!
//! The engine only sees the `StepHandler` contract; these are the two
//! implementations the binary wires in -- an outbound HTTP chat-completion
//! handler and a deterministic scripted handler for offline use and tests.

pub mod http;
pub mod scripted;
