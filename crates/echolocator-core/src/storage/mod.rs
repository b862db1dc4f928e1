//! Asset storage trait definitions.
//!
//! Image bytes belong to an external asset store; the engine keeps only the
//! opaque reference it hands back.

pub mod asset_store;
