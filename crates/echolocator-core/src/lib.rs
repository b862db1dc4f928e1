//! Similarity search engine and port traits for Echo-Locator.
//!
//! This crate defines the "ports" (embedder, asset store, item repository,
//! content hasher) that the infrastructure layer implements, and the engine
//! built on them: the snapshot-isolated item store, the similarity index,
//! the ingestion pipeline, the stats aggregator and the query gateway. It
//! depends only on `echolocator-types` -- never on `echolocator-infra` or any
//! database/model crate.

pub mod embedding;
pub mod index;
pub mod ingest;
pub mod repository;
pub mod service;
pub mod stats;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
