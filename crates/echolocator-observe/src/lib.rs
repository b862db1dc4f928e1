//! Observability setup for Echo-Locator: structured logging through
//! `tracing-subscriber`, with optional OpenTelemetry span export.

pub mod tracing_setup;
