//! Stats aggregator: summary counters over one store snapshot.
//!
//! The location histogram is the only part whose cost grows with the corpus
//! and is independent of wall-clock time, so it is cached against the
//! snapshot version. Every committed insert bumps the version, which makes
//! the next read recompute it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};

use echolocator_types::config::StatsConfig;
use echolocator_types::stats::{LocationCount, StatsSnapshot};

use crate::store::{ItemStore, StoreSnapshot};

#[derive(Debug)]
struct LocationHistogram {
    version: u64,
    /// Every location, ranked by count descending then name ascending.
    ranked: Arc<Vec<LocationCount>>,
}

/// Computes [`StatsSnapshot`]s for a store.
#[derive(Debug)]
pub struct StatsAggregator {
    store: Arc<ItemStore>,
    top_n: usize,
    /// `None` when the configured window is too large to represent; every
    /// item then counts as recent.
    window: Option<TimeDelta>,
    cache: Mutex<Option<LocationHistogram>>,
}

impl StatsAggregator {
    pub fn new(store: Arc<ItemStore>, config: &StatsConfig) -> Self {
        Self {
            store,
            top_n: config.top_locations,
            window: TimeDelta::try_days(config.recent_window_days.max(0)),
            cache: Mutex::new(None),
        }
    }

    /// Stats as of the current wall-clock time.
    pub fn compute(&self) -> StatsSnapshot {
        self.compute_at(Utc::now())
    }

    /// Stats with the recency window ending at `now`.
    pub fn compute_at(&self, now: DateTime<Utc>) -> StatsSnapshot {
        let snapshot = self.store.snapshot();
        let ranked = self.ranked_locations(&snapshot);
        let recent = match self.window.and_then(|window| now.checked_sub_signed(window)) {
            Some(cutoff) => snapshot.count_since(cutoff),
            None => snapshot.len(),
        };

        StatsSnapshot {
            total_items: snapshot.len() as u64,
            unique_locations: ranked.len() as u64,
            items_last_7_days: recent as u64,
            last_uploaded_at: snapshot.latest().map(|item| item.created_at),
            top_locations: ranked.iter().take(self.top_n).cloned().collect(),
        }
    }

    fn ranked_locations(&self, snapshot: &StoreSnapshot) -> Arc<Vec<LocationCount>> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(hist) = cache.as_ref().filter(|h| h.version == snapshot.version()) {
            return Arc::clone(&hist.ranked);
        }

        let ranked = Arc::new(rank_locations(snapshot));
        *cache = Some(LocationHistogram {
            version: snapshot.version(),
            ranked: Arc::clone(&ranked),
        });
        tracing::debug!(
            version = snapshot.version(),
            locations = ranked.len(),
            "location histogram rebuilt"
        );
        ranked
    }
}

fn rank_locations(snapshot: &StoreSnapshot) -> Vec<LocationCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for item in snapshot.iter() {
        *counts.entry(item.location.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<LocationCount> = counts
        .into_iter()
        .map(|(location, count)| LocationCount {
            location: location.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
    ranked
}
