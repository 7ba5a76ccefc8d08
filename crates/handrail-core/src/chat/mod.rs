//! Conversation-facing service layer: ties the router, the workflow engine,
//! and the session store together for one inbound turn.

pub mod service;
