//! HTTP request handlers for the REST API.

pub mod items;
pub mod search;
pub mod stats;
