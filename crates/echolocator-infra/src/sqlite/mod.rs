//! SQLite storage layer.
//!
//! The durable item log behind the in-memory store, with WAL mode and split
//! read/write connection pools.

pub mod item;
pub mod pool;
