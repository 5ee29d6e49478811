// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Ranking of location candidates from external scorers.
//!
//! Scorers hand back coordinates with confidences; the engine only orders,
//! deduplicates and truncates them. Sorting is stable, so equal confidences
//! keep producer order.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Candidates closer than this collapse into one suggestion.
pub const DEDUPE_EPSILON_M: f64 = 10.0;

/// How many suggestions survive ranking by default.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
  pub latitude:   f64,
  pub longitude:  f64,
  /// In `[0, 1]`.
  pub confidence: f64,
  pub place_name: Option<String>,
}

/// A source of location candidates for a photo, e.g. a visual-similarity
/// model. Only the candidate list crosses this seam.
pub trait LocationScorer {
  fn score(&self, path: &std::path::Path) -> Result<Vec<LocationCandidate>, Error>;
}

/// Orders candidates by descending confidence, collapses near-duplicate
/// coordinates (keeping the most confident representative), and truncates to
/// `limit`.
#[must_use]
pub fn rank(mut candidates: Vec<LocationCandidate>, limit: usize) -> Vec<LocationCandidate> {
  candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut ranked: Vec<LocationCandidate> = vec![];
  for candidate in candidates {
    let duplicate = ranked.iter().any(|kept| {
      crate::prim::conv::great_circle_m(
        kept.latitude,
        kept.longitude,
        candidate.latitude,
        candidate.longitude,
      ) < DEDUPE_EPSILON_M
    });
    if !duplicate {
      ranked.push(candidate);
    }
    if ranked.len() == limit {
      break;
    }
  }
  ranked
}
