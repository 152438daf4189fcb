//! Neighborhood-to-boundary matching with tier escalation.
//!
//! Tier 1 keys are tried first. Only when Tier 1 joins nothing (or the
//! caller forces it) are both sides re-canonicalized at Tier 2, which
//! tolerates diacritics and punctuation drift at the cost of a higher
//! chance of false positives.

use crime_dashboard_resolution_models::{
    MatchOptions, MatchReport, MatchedNeighborhood, NeighborhoodCount, Tier,
};

use crate::boundary::BoundaryIndex;
use crate::canonical::Canonicalizer;

/// Joins aggregated neighborhood counts to a [`BoundaryIndex`].
///
/// The index must be fully built before matching; it is only read here.
#[derive(Debug, Clone, Copy)]
pub struct NameMatcher<'a> {
    index: &'a BoundaryIndex,
    canonicalizer: &'a Canonicalizer,
}

impl<'a> NameMatcher<'a> {
    #[must_use]
    pub const fn new(index: &'a BoundaryIndex, canonicalizer: &'a Canonicalizer) -> Self {
        Self {
            index,
            canonicalizer,
        }
    }

    /// Partitions rows into matched and unmatched, preserving input order.
    ///
    /// Rows with a zero count, and rows whose name is empty or a sentinel,
    /// are dropped first and counted in [`MatchReport::discarded_empty`]
    /// and [`MatchReport::discarded_unknown`]; neither affects the coverage
    /// ratio. Never fails; an empty match set is a valid result.
    #[must_use]
    pub fn match_counts(&self, rows: &[NeighborhoodCount], options: MatchOptions) -> MatchReport {
        let mut candidates = Vec::new();
        let mut discarded_empty = 0;
        let mut discarded_unknown = 0;
        for row in rows {
            if row.count == 0 {
                discarded_empty += 1;
            } else if self.is_unknown(row) {
                discarded_unknown += 1;
            } else {
                candidates.push(row);
            }
        }
        if discarded_empty + discarded_unknown > 0 {
            log::debug!(
                "Discarded {discarded_empty} empty and {discarded_unknown} unknown neighborhoods"
            );
        }

        let tier1 = self.lookup_all(&candidates, Tier::Tier1);
        let (tier, ids) = if options.force_fallback {
            log::debug!("Tier 2 matching forced");
            (Tier::Tier2, self.lookup_all(&candidates, Tier::Tier2))
        } else if tier1.iter().any(Option::is_some) {
            (Tier::Tier1, tier1)
        } else {
            log::info!("No tier 1 neighborhood matches; retrying at tier 2");
            (Tier::Tier2, self.lookup_all(&candidates, Tier::Tier2))
        };

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for (row, id) in candidates.into_iter().zip(ids) {
            match id {
                Some(boundary_id) => matched.push(MatchedNeighborhood {
                    row: row.clone(),
                    boundary_id,
                }),
                None => unmatched.push(row.clone()),
            }
        }

        if !unmatched.is_empty() {
            let names: Vec<&str> = unmatched.iter().map(|u| u.neighborhood.as_str()).collect();
            log::debug!("Unmatched neighborhoods: {}", names.join(", "));
        }

        let report = MatchReport::new(matched, unmatched, tier, discarded_empty, discarded_unknown);
        log::info!(
            "Matched {}/{} neighborhoods at {tier} ({:.1}% of incidents)",
            report.matched.len(),
            report.matched.len() + report.unmatched.len(),
            report.coverage_ratio * 100.0
        );

        report
    }

    fn is_unknown(&self, row: &NeighborhoodCount) -> bool {
        self.canonicalizer
            .canonicalize(&row.neighborhood, Tier::Tier1)
            .is_unknown()
    }

    fn lookup_all(&self, rows: &[&NeighborhoodCount], tier: Tier) -> Vec<Option<String>> {
        rows.iter()
            .map(|row| self.lookup(&row.neighborhood, tier))
            .collect()
    }

    fn lookup(&self, name: &str, tier: Tier) -> Option<String> {
        let key = self.canonicalizer.canonicalize(name, tier).into_known()?;
        self.index.lookup(&key, tier).map(ToString::to_string)
    }
}
