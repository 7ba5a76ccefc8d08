//! SQLite-backed repository implementations using sqlx.

pub mod checkpoint;
pub mod pool;
pub mod session;
