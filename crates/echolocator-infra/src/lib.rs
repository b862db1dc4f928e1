//! Infrastructure layer for Echo-Locator.
//!
//! Contains implementations of the ports defined in `echolocator-core`:
//! SQLite item persistence, the local-filesystem image store, the fastembed
//! CLIP and offline embedders, SHA-256 content hashing, and configuration
//! and data-directory resolution.

pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod sqlite;
pub mod storage;
pub mod vector;
