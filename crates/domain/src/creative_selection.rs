// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Picks the creative a campaign enters into an auction.
//!
//! Scoring is behind the [`CreativeScorer`] trait. The shipped scorer is the
//! CTR-boosted quality heuristic; a relevance model can replace it without
//! touching the auction.

use rust_decimal::Decimal;

use crate::types::{
    AdGroup, AdGroupStatus, Creative, CreativeStatus, PerformanceCounters, Placement,
};

/// Quality score assumed for creatives that have never been rated.
pub const DEFAULT_QUALITY_SCORE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Upper bound of the CTR boost (the multiplier never exceeds `1 + 2`).
const MAX_CTR_BOOST: Decimal = Decimal::TWO;

/// Scores a creative for selection within its campaign.
pub trait CreativeScorer: Send + Sync {
    /// Returns the selection score; higher is better.
    fn score(&self, creative: &Creative, counters: &PerformanceCounters) -> Decimal;
}

/// `quality_score × (1 + min(ctr% / 2, 2))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtrBoostedScorer;

impl CreativeScorer for CtrBoostedScorer {
    fn score(&self, creative: &Creative, counters: &PerformanceCounters) -> Decimal {
        let boost: Decimal = (counters.ctr_percent() / Decimal::TWO).min(MAX_CTR_BOOST);
        effective_quality_score(creative) * (Decimal::ONE + boost)
    }
}

/// Returns the creative's quality score, or [`DEFAULT_QUALITY_SCORE`].
#[must_use]
pub fn effective_quality_score(creative: &Creative) -> Decimal {
    creative.quality_score.unwrap_or(DEFAULT_QUALITY_SCORE)
}

/// Returns true if the creative may serve on the placement.
#[must_use]
pub fn is_servable(ad_group: &AdGroup, creative: &Creative, placement: &Placement) -> bool {
    ad_group.status == AdGroupStatus::Active
        && creative.status == CreativeStatus::Active
        && placement.supports(creative.creative_type)
}

/// A creative paired with its ad group and live counters.
#[derive(Debug, Clone)]
pub struct CreativeCandidate<'a> {
    pub ad_group: &'a AdGroup,
    pub creative: &'a Creative,
    pub counters: PerformanceCounters,
}

/// Selects the highest-scoring candidate.
///
/// Ties keep the first candidate in iteration order. That order is the catalog
/// order, so the outcome is deterministic but carries no meaning.
#[must_use]
pub fn select_best_creative<'c, 'a>(
    candidates: &'c [CreativeCandidate<'a>],
    scorer: &dyn CreativeScorer,
) -> Option<&'c CreativeCandidate<'a>> {
    let mut best: Option<(&CreativeCandidate<'a>, Decimal)> = None;
    for candidate in candidates {
        let score: Decimal = scorer.score(candidate.creative, &candidate.counters);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}
