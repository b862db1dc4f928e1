//! Aggregate statistics over the item corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the most-frequent-locations ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: u64,
}

/// Summary counters computed from a single store snapshot.
///
/// All fields are derived from the same snapshot, so `total_items` and
/// `last_uploaded_at` always describe the same set of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_items: u64,
    pub unique_locations: u64,
    pub items_last_7_days: u64,
    pub last_uploaded_at: Option<DateTime<Utc>>,
    pub top_locations: Vec<LocationCount>,
}

impl StatsSnapshot {
    /// Statistics for an empty corpus.
    pub fn empty() -> Self {
        Self {
            total_items: 0,
            unique_locations: 0,
            items_last_7_days: 0,
            last_uploaded_at: None,
            top_locations: Vec::new(),
        }
    }
}
