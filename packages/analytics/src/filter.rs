//! Dashboard filter selections.
//!
//! An empty selection means "no restriction" for that dimension, matching
//! the dashboard's multiselect behavior where clearing every option shows
//! all incidents.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use crime_dashboard_incident_models::{IncidentRecord, WeekdayType};
use serde::{Deserialize, Serialize};

/// Year, category, weekday type, and date range selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentFilter {
    pub years: BTreeSet<i32>,
    /// Exact category labels (surrounding whitespace ignored).
    pub categories: BTreeSet<String>,
    pub weekday_types: BTreeSet<WeekdayType>,
    /// Inclusive lower date bound. Undated incidents fail any date bound.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub date_to: Option<NaiveDate>,
}

impl IncidentFilter {
    /// Whether no dimension is restricted.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.years.is_empty()
            && self.categories.is_empty()
            && self.weekday_types.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    #[must_use]
    pub fn matches(&self, record: &IncidentRecord) -> bool {
        if !self.years.is_empty() && !self.years.contains(&record.year) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(record.category.trim()) {
            return false;
        }
        if !self.weekday_types.is_empty() && !self.weekday_types.contains(&record.weekday_type) {
            return false;
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = record.date else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from)
                || self.date_to.is_some_and(|to| date > to)
            {
                return false;
            }
        }
        true
    }

    /// Returns the matching records, in input order.
    #[must_use]
    pub fn apply(&self, records: &[IncidentRecord]) -> Vec<IncidentRecord> {
        let filtered: Vec<IncidentRecord> = records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        log::debug!("Filter kept {}/{} incidents", filtered.len(), records.len());
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample;

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = IncidentFilter::default();
        assert!(filter.is_unrestricted());
        assert_eq!(filter.apply(&sample()).len(), sample().len());
    }

    #[test]
    fn filters_by_year_category_and_weekday_type() {
        let filter = IncidentFilter {
            years: BTreeSet::from([2023]),
            categories: BTreeSet::from(["Robo".to_string()]),
            weekday_types: BTreeSet::from([WeekdayType::Workday]),
            ..IncidentFilter::default()
        };
        let kept = filter.apply(&sample());
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.year == 2023 && r.category == "Robo"));
    }

    #[test]
    fn date_bounds_exclude_undated() {
        let filter = IncidentFilter {
            date_from: NaiveDate::from_ymd_opt(2023, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2023, 2, 28),
            ..IncidentFilter::default()
        };
        let kept = filter.apply(&sample());
        let months: Vec<_> = kept.iter().filter_map(IncidentRecord::year_month).collect();
        assert_eq!(months, vec!["2023-02", "2023-02"]);
    }

    #[test]
    fn unmatched_selection_yields_empty() {
        let filter = IncidentFilter {
            years: BTreeSet::from([1999]),
            ..IncidentFilter::default()
        };
        assert!(filter.apply(&sample()).is_empty());
    }
}
