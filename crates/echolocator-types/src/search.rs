//! Similarity search types.
//!
//! Cosine similarity lives in `[-1, 1]`; thresholds and reported scores live
//! in `[0, 1]`. `SimilarityMapping` is the single place that conversion is
//! defined, so the score an item is ranked by and the score compared against
//! the threshold are always the same number.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Multiplier of [`SimilarityMapping::Scaled`] when none is configured.
pub const DEFAULT_SCALE_FACTOR: f32 = 3.0;

/// How raw cosine similarity is mapped into the `[0, 1]` score space.
///
/// Every variant is monotone non-decreasing in cosine and maps `cos = 1`
/// to exactly `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimilarityMapping {
    /// `(cos + 1) / 2`. Suitable for signed embedding spaces.
    Shifted,
    /// `max(cos, 0)`. For embedding spaces known to be non-negative.
    Clamped,
    /// `clamp(cos * factor, 0, 1)`. Stretches the narrow band of
    /// text-to-image CLIP scores.
    Scaled { factor: f32 },
}

impl SimilarityMapping {
    /// A `Scaled` mapping, or `None` unless `factor` is finite and at least 1.
    /// Smaller factors would score an item's own embedding below 1.0.
    pub fn scaled(factor: f32) -> Option<Self> {
        (factor.is_finite() && factor >= 1.0).then_some(SimilarityMapping::Scaled { factor })
    }

    /// Map a cosine similarity into `[0, 1]`.
    pub fn apply(self, cosine: f32) -> f32 {
        let cosine = cosine.clamp(-1.0, 1.0);
        match self {
            SimilarityMapping::Shifted => (cosine + 1.0) / 2.0,
            SimilarityMapping::Clamped => cosine.max(0.0),
            SimilarityMapping::Scaled { factor } => (cosine * factor).clamp(0.0, 1.0),
        }
    }

    pub fn kind(self) -> MappingKind {
        match self {
            SimilarityMapping::Shifted => MappingKind::Shifted,
            SimilarityMapping::Clamped => MappingKind::Clamped,
            SimilarityMapping::Scaled { .. } => MappingKind::Scaled,
        }
    }
}

impl Default for SimilarityMapping {
    fn default() -> Self {
        SimilarityMapping::Shifted
    }
}

/// Configuration-level name of a [`SimilarityMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    #[default]
    Shifted,
    Clamped,
    Scaled,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKind::Shifted => write!(f, "shifted"),
            MappingKind::Clamped => write!(f, "clamped"),
            MappingKind::Scaled => write!(f, "scaled"),
        }
    }
}

impl FromStr for MappingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shifted" => Ok(MappingKind::Shifted),
            "clamped" => Ok(MappingKind::Clamped),
            "scaled" => Ok(MappingKind::Scaled),
            other => Err(format!("invalid similarity mapping: '{other}'")),
        }
    }
}

/// A ranked nearest-neighbour query against the similarity index.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityQuery<'a> {
    pub vector: &'a [f32],
    /// Minimum mapped similarity, inclusive.
    pub threshold: f32,
    pub top_k: usize,
    /// Exact, case-insensitive location restriction.
    pub location: Option<&'a str>,
}
