//! Asset storage implementations.

pub mod filesystem;
