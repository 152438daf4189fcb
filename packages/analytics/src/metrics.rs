//! Headline metrics and rankings.

use std::collections::BTreeSet;

use crime_dashboard_incident_models::IncidentRecord;
use crime_dashboard_resolution::canonical::Canonicalizer;
use crime_dashboard_resolution_models::Tier;
use serde::{Deserialize, Serialize};

use crate::{KeyCount, sort_by_count_desc};

/// Summary numbers shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    pub total_incidents: u64,
    /// Share of incidents involving a weapon, 0-100.
    pub weapon_percentage: f64,
    /// Share of incidents involving a motorcycle, 0-100.
    pub motorcycle_percentage: f64,
    /// Distinct known districts with at least one incident.
    pub districts_affected: usize,
}

/// Computes headline metrics. Percentages are 0 for empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn headline_metrics(
    records: &[IncidentRecord],
    canonicalizer: &Canonicalizer,
) -> HeadlineMetrics {
    let total = records.len();
    let share = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 / total as f64 * 100.0
        }
    };

    let weapons = records.iter().filter(|r| r.weapon_used).count();
    let motorcycles = records.iter().filter(|r| r.motorcycle_used).count();
    let districts: BTreeSet<String> = records
        .iter()
        .filter_map(|r| {
            canonicalizer
                .canonicalize_place(&r.district_raw, Tier::Tier1)
                .into_known()
        })
        .collect();

    HeadlineMetrics {
        total_incidents: total as u64,
        weapon_percentage: share(weapons),
        motorcycle_percentage: share(motorcycles),
        districts_affected: districts.len(),
    }
}

/// The `n` largest counts, most first; ties by key.
#[must_use]
pub fn top_n(counts: &[KeyCount], n: usize) -> Vec<KeyCount> {
    let mut ranked = counts.to_vec();
    sort_by_count_desc(&mut ranked);
    ranked.truncate(n);
    ranked
}
