//! Ingestion of new items.

mod orphan;
pub mod pipeline;
pub mod retry;

pub use pipeline::IngestionPipeline;
pub use retry::RetryPolicy;
