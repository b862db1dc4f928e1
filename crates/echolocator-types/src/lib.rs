//! Shared domain types for Echo-Locator.
//!
//! This crate contains the domain types used across the engine: items and
//! their boundary views, search and stats payloads, configuration, and the
//! error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod item;
pub mod search;
pub mod stats;
