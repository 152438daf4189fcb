#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grouped incident counts for the dashboard charts.
//!
//! Every function here is a pure group-and-count over an already filtered
//! slice of [`IncidentRecord`]s. Place keys (district, neighborhood) go
//! through Tier 1 canonicalization, and rows whose place is unknown are
//! left out of that grouping; they still count everywhere else.

pub mod filter;
pub mod metrics;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crime_dashboard_incident_models::IncidentRecord;
use crime_dashboard_resolution::canonical::Canonicalizer;
use crime_dashboard_resolution_models::{NeighborhoodCount, Tier};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A column incidents can be grouped by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupKey {
    Category,
    Year,
    WeekdayType,
    /// Tier 1 canonical district; unknown districts are excluded.
    District,
    /// Tier 1 canonical neighborhood; unknown neighborhoods are excluded.
    Neighborhood,
    /// `YYYY-MM` from the incident date; undated incidents are excluded.
    YearMonth,
    /// `0` (Monday) through `6` (Sunday).
    DayOfWeek,
    /// Hour of the day, `0` through `23`.
    HourBand,
}

/// Count for one combination of group key values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount {
    /// One value per requested [`GroupKey`], in request order.
    pub key: Vec<String>,
    pub count: u64,
}

/// Count for a single key value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

/// Orders numeric strings numerically and everything else lexically, so
/// district `"2"` sorts before `"10"`.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn natural_cmp_keys(a: &[String], b: &[String]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| natural_cmp(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Sorts by count descending; ties by key in natural order.
pub(crate) fn sort_by_count_desc(rows: &mut [KeyCount]) {
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| natural_cmp(&a.key, &b.key))
    });
}

/// Group-and-count over incident records.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    canonicalizer: &'a Canonicalizer,
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub const fn new(canonicalizer: &'a Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    fn district_of(&self, record: &IncidentRecord) -> Option<String> {
        self.canonicalizer
            .canonicalize_place(&record.district_raw, Tier::Tier1)
            .into_known()
    }

    fn neighborhood_of(&self, record: &IncidentRecord) -> Option<String> {
        self.canonicalizer
            .canonicalize_place(&record.neighborhood_raw, Tier::Tier1)
            .into_known()
    }

    fn value_of(&self, record: &IncidentRecord, key: GroupKey) -> Option<String> {
        match key {
            GroupKey::Category => Some(record.category.trim().to_string()),
            GroupKey::Year => Some(record.year.to_string()),
            GroupKey::WeekdayType => Some(record.weekday_type.to_string()),
            GroupKey::District => self.district_of(record),
            GroupKey::Neighborhood => self.neighborhood_of(record),
            GroupKey::YearMonth => record.year_month(),
            GroupKey::DayOfWeek => record.day_of_week.map(|d| d.to_string()),
            GroupKey::HourBand => record.hour_band.map(|h| h.to_string()),
        }
    }

    /// Counts records per combination of `keys`, sorted by key.
    ///
    /// A record is left out when any requested key has no value for it.
    /// Empty input yields an empty table.
    #[must_use]
    pub fn count_by(&self, records: &[IncidentRecord], keys: &[GroupKey]) -> Vec<GroupCount> {
        let mut groups: BTreeMap<Vec<String>, u64> = BTreeMap::new();
        let mut excluded = 0usize;

        for record in records {
            let Some(key) = keys
                .iter()
                .map(|k| self.value_of(record, *k))
                .collect::<Option<Vec<String>>>()
            else {
                excluded += 1;
                continue;
            };
            *groups.entry(key).or_insert(0) += 1;
        }

        if excluded > 0 {
            log::debug!("Excluded {excluded} incidents without a value for {keys:?}");
        }

        let mut rows: Vec<GroupCount> = groups
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect();
        rows.sort_by(|a, b| natural_cmp_keys(&a.key, &b.key));
        rows
    }

    /// Counts records per value of a single key, sorted by key.
    #[must_use]
    pub fn counts_by(&self, records: &[IncidentRecord], key: GroupKey) -> Vec<KeyCount> {
        self.count_by(records, &[key])
            .into_iter()
            .filter_map(|g| {
                let key = g.key.into_iter().next()?;
                Some(KeyCount {
                    key,
                    count: g.count,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn counts_by_category(&self, records: &[IncidentRecord]) -> Vec<KeyCount> {
        self.counts_by(records, GroupKey::Category)
    }

    #[must_use]
    pub fn counts_by_year(&self, records: &[IncidentRecord]) -> Vec<KeyCount> {
        self.counts_by(records, GroupKey::Year)
    }

    #[must_use]
    pub fn counts_by_weekday_type(&self, records: &[IncidentRecord]) -> Vec<KeyCount> {
        self.counts_by(records, GroupKey::WeekdayType)
    }

    #[must_use]
    pub fn counts_by_district(&self, records: &[IncidentRecord]) -> Vec<KeyCount> {
        self.counts_by(records, GroupKey::District)
    }

    /// One row per known Tier 1 neighborhood, ready for matching. Every
    /// row has a count of at least one.
    #[must_use]
    pub fn neighborhood_counts(&self, records: &[IncidentRecord]) -> Vec<NeighborhoodCount> {
        self.counts_by(records, GroupKey::Neighborhood)
            .into_iter()
            .map(|k| NeighborhoodCount {
                neighborhood: k.key,
                count: k.count,
            })
            .collect()
    }

    /// Counts per `(neighborhood, YYYY-MM)`.
    #[must_use]
    pub fn neighborhood_month_counts(&self, records: &[IncidentRecord]) -> Vec<GroupCount> {
        self.count_by(records, &[GroupKey::Neighborhood, GroupKey::YearMonth])
    }

    /// Counts per `(day of week, hour band)`, the temporal heatmap.
    #[must_use]
    pub fn weekday_hour_counts(&self, records: &[IncidentRecord]) -> Vec<GroupCount> {
        self.count_by(records, &[GroupKey::DayOfWeek, GroupKey::HourBand])
    }

    /// Counts per `(district, neighborhood)`.
    #[must_use]
    pub fn district_neighborhood_counts(&self, records: &[IncidentRecord]) -> Vec<GroupCount> {
        self.count_by(records, &[GroupKey::District, GroupKey::Neighborhood])
    }

    /// Neighborhoods among the rows recorded under `district`, most
    /// incidents first.
    #[must_use]
    pub fn neighborhood_counts_in_district(
        &self,
        records: &[IncidentRecord],
        district: &str,
    ) -> Vec<NeighborhoodCount> {
        let subset = self.with_district(records, district);
        let mut rows = self.counts_by(&subset, GroupKey::Neighborhood);
        sort_by_count_desc(&mut rows);
        rows.into_iter()
            .map(|k| NeighborhoodCount {
                neighborhood: k.key,
                count: k.count,
            })
            .collect()
    }

    /// Category counts for one district, most incidents first.
    #[must_use]
    pub fn category_counts_in_district(
        &self,
        records: &[IncidentRecord],
        district: &str,
    ) -> Vec<KeyCount> {
        let subset = self.with_district(records, district);
        let mut rows = self.counts_by_category(&subset);
        sort_by_count_desc(&mut rows);
        rows
    }

    /// Category counts for one neighborhood, most incidents first.
    #[must_use]
    pub fn category_counts_in_neighborhood(
        &self,
        records: &[IncidentRecord],
        neighborhood: &str,
    ) -> Vec<KeyCount> {
        let subset = self.with_neighborhood(records, neighborhood);
        let mut rows = self.counts_by_category(&subset);
        sort_by_count_desc(&mut rows);
        rows
    }

    /// Monthly series for one district.
    #[must_use]
    pub fn monthly_series_for_district(
        &self,
        records: &[IncidentRecord],
        district: &str,
    ) -> Vec<KeyCount> {
        self.counts_by(&self.with_district(records, district), GroupKey::YearMonth)
    }

    /// Monthly series for one neighborhood.
    #[must_use]
    pub fn monthly_series_for_neighborhood(
        &self,
        records: &[IncidentRecord],
        neighborhood: &str,
    ) -> Vec<KeyCount> {
        self.counts_by(
            &self.with_neighborhood(records, neighborhood),
            GroupKey::YearMonth,
        )
    }

    fn with_district(&self, records: &[IncidentRecord], district: &str) -> Vec<IncidentRecord> {
        let Some(target) = self
            .canonicalizer
            .canonicalize(district, Tier::Tier1)
            .into_known()
        else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|r| self.district_of(r).as_deref() == Some(target.as_str()))
            .cloned()
            .collect()
    }

    fn with_neighborhood(
        &self,
        records: &[IncidentRecord],
        neighborhood: &str,
    ) -> Vec<IncidentRecord> {
        let Some(target) = self
            .canonicalizer
            .canonicalize(neighborhood, Tier::Tier1)
            .into_known()
        else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|r| self.neighborhood_of(r).as_deref() == Some(target.as_str()))
            .cloned()
            .collect()
    }
}
