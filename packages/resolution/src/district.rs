//! Majority-vote district resolution.
//!
//! The same neighborhood is sometimes recorded under more than one district
//! code because of data-entry drift. The authoritative district is the one
//! most incidents agree on; ties go to the district encountered first in
//! input order so the result never depends on hash or sort order.

use std::collections::BTreeMap;

use crime_dashboard_incident_models::IncidentRecord;
use crime_dashboard_resolution_models::{
    CanonicalName, DistrictAssociation, DistrictResolution, DistrictShare, NeighborhoodCount,
    ResolvedDistrict, Tier, UNKNOWN_MARKER,
};

use crate::canonical::Canonicalizer;

/// District counts for one neighborhood, in first-encountered order.
#[derive(Debug, Default)]
struct Tally {
    counts: Vec<(String, u64)>,
    positions: BTreeMap<String, usize>,
}

impl Tally {
    fn add(&mut self, district: String) {
        if let Some(&pos) = self.positions.get(&district) {
            self.counts[pos].1 += 1;
        } else {
            self.positions.insert(district.clone(), self.counts.len());
            self.counts.push((district, 1));
        }
    }

    fn resolve(self, neighborhood: &str) -> DistrictResolution {
        let total: u64 = self.counts.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return DistrictResolution::NoDistrictData {
                neighborhood: neighborhood.to_string(),
            };
        }

        let mut breakdown: Vec<DistrictShare> = self
            .counts
            .into_iter()
            .map(|(district, count)| DistrictShare {
                district,
                count,
                percentage: percentage(count, total),
            })
            .collect();
        // Stable: equal counts keep first-encountered order.
        breakdown.sort_by(|a, b| b.count.cmp(&a.count));

        let winner = &breakdown[0];
        let resolved = ResolvedDistrict {
            neighborhood: neighborhood.to_string(),
            district: winner.district.clone(),
            supporting_count: winner.count,
            total_count: total,
            is_ambiguous: breakdown.len() > 1,
            breakdown,
        };

        if resolved.is_ambiguous {
            log::debug!(
                "Neighborhood {neighborhood} spans {} districts; resolved to {} ({}/{total})",
                resolved.breakdown.len(),
                resolved.district,
                resolved.supporting_count
            );
        }

        DistrictResolution::Resolved(resolved)
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: u64, total: u64) -> f64 {
    count as f64 / total as f64 * 100.0
}

/// Resolves each neighborhood's authoritative district from incident rows.
#[derive(Debug, Clone, Copy)]
pub struct DistrictResolver<'a> {
    canonicalizer: &'a Canonicalizer,
}

impl<'a> DistrictResolver<'a> {
    #[must_use]
    pub const fn new(canonicalizer: &'a Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    fn neighborhood_of(&self, record: &IncidentRecord) -> CanonicalName {
        self.canonicalizer
            .canonicalize_place(&record.neighborhood_raw, Tier::Tier1)
    }

    fn district_of(&self, record: &IncidentRecord) -> CanonicalName {
        self.canonicalizer
            .canonicalize_place(&record.district_raw, Tier::Tier1)
    }

    /// Resolves the district for one neighborhood.
    ///
    /// `neighborhood` may be raw; it is canonicalized at Tier 1. Records
    /// with an unknown district are ignored. Returns
    /// [`DistrictResolution::NoDistrictData`] when nothing remains.
    #[must_use]
    pub fn resolve(&self, records: &[IncidentRecord], neighborhood: &str) -> DistrictResolution {
        let canonical = self.canonicalizer.canonicalize(neighborhood, Tier::Tier1);
        let CanonicalName::Known(target) = canonical else {
            return DistrictResolution::NoDistrictData {
                neighborhood: UNKNOWN_MARKER.to_string(),
            };
        };

        let mut tally = Tally::default();
        for record in records {
            if self.neighborhood_of(record).as_known() != Some(target.as_str()) {
                continue;
            }
            if let CanonicalName::Known(district) = self.district_of(record) {
                tally.add(district);
            }
        }

        tally.resolve(&target)
    }

    /// Resolves every known neighborhood, in first-encountered order.
    ///
    /// Neighborhoods whose rows all lack a district are included as
    /// [`DistrictResolution::NoDistrictData`].
    #[must_use]
    pub fn resolve_all(&self, records: &[IncidentRecord]) -> Vec<DistrictResolution> {
        let mut order: Vec<String> = Vec::new();
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

        for record in records {
            let CanonicalName::Known(neighborhood) = self.neighborhood_of(record) else {
                continue;
            };
            let tally = tallies.entry(neighborhood.clone()).or_insert_with(|| {
                order.push(neighborhood);
                Tally::default()
            });
            if let CanonicalName::Known(district) = self.district_of(record) {
                tally.add(district);
            }
        }

        let resolutions: Vec<DistrictResolution> = order
            .into_iter()
            .filter_map(|n| tallies.remove(&n).map(|t| t.resolve(&n)))
            .collect();

        log::info!(
            "Resolved districts for {} neighborhoods ({} ambiguous, {} without district data)",
            resolutions.len(),
            resolutions
                .iter()
                .filter(|r| r.resolved().is_some_and(|d| d.is_ambiguous))
                .count(),
            resolutions
                .iter()
                .filter(|r| r.resolved().is_none())
                .count()
        );

        resolutions
    }

    /// Counts incidents per `(neighborhood, district)` pair, excluding
    /// unknowns on either side, in first-encountered order.
    #[must_use]
    pub fn associations(&self, records: &[IncidentRecord]) -> Vec<DistrictAssociation> {
        let mut positions: BTreeMap<(String, String), usize> = BTreeMap::new();
        let mut associations: Vec<DistrictAssociation> = Vec::new();

        for record in records {
            let (CanonicalName::Known(neighborhood), CanonicalName::Known(district)) =
                (self.neighborhood_of(record), self.district_of(record))
            else {
                continue;
            };

            let key = (neighborhood, district);
            if let Some(&pos) = positions.get(&key) {
                associations[pos].count += 1;
            } else {
                positions.insert(key.clone(), associations.len());
                associations.push(DistrictAssociation {
                    neighborhood: key.0,
                    district: key.1,
                    count: 1,
                });
            }
        }

        associations
    }

    /// Neighborhoods whose resolved district is `district`, with the number
    /// of their incidents recorded under it. Most incidents first; ties keep
    /// first-encountered order.
    #[must_use]
    pub fn neighborhoods_in_district(
        &self,
        records: &[IncidentRecord],
        district: &str,
    ) -> Vec<NeighborhoodCount> {
        let CanonicalName::Known(target) = self.canonicalizer.canonicalize(district, Tier::Tier1)
        else {
            return Vec::new();
        };

        let mut members: Vec<NeighborhoodCount> = self
            .resolve_all(records)
            .into_iter()
            .filter_map(|resolution| match resolution {
                DistrictResolution::Resolved(r) if r.district == target => Some(NeighborhoodCount {
                    neighborhood: r.neighborhood,
                    count: r.supporting_count,
                }),
                _ => None,
            })
            .collect();
        members.sort_by(|a, b| b.count.cmp(&a.count));
        members
    }
}
