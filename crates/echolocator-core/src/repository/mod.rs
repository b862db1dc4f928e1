//! Repository trait definitions (ports).
//!
//! These traits define the durability interface that the infrastructure
//! layer (echolocator-infra) implements. The core crate never depends on
//! any specific storage technology.

pub mod box_item;
pub mod ephemeral;
pub mod item;
