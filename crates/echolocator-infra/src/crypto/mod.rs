//! Content hashing for Echo-Locator.
//!
//! - `hash`: SHA-256 fingerprints of uploaded images for duplicate rejection

pub mod hash;
