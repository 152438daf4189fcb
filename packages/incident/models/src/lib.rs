#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime incident row types shared by the dashboard core.
//!
//! An [`IncidentRecord`] is created once by whatever loads the dataset and
//! is only ever read afterwards. Place identifiers are kept in their raw,
//! uncanonicalized form ([`RawPlace`]) so that every consumer goes through
//! the same canonicalization rules.

use std::borrow::Cow;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Whether an incident happened on a working day or on a weekend.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum WeekdayType {
    /// Monday through Friday.
    #[strum(to_string = "WORKDAY", serialize = "LABORAL")]
    Workday,
    /// Saturday and Sunday.
    #[strum(to_string = "WEEKEND", serialize = "FIN DE SEMANA")]
    Weekend,
}

impl WeekdayType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Workday, Self::Weekend]
    }
}

/// A place identifier exactly as it was recorded in the source row.
///
/// District codes are often numeric while neighborhood names are text, and
/// either may be absent. Nothing here decides whether a value means
/// "unknown"; that is the canonicalizer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPlace {
    /// Numeric identifier (e.g. a district number).
    Number(i64),
    /// Free-text identifier.
    Text(String),
    /// The source row had no value at all.
    Missing,
}

impl RawPlace {
    /// Parses a raw cell value.
    ///
    /// Blank cells become [`RawPlace::Missing`]; integral numbers
    /// (including `"14.0"`) become [`RawPlace::Number`]; anything else is
    /// kept verbatim as [`RawPlace::Text`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Number(n);
        }
        if let Ok(f) = trimmed.parse::<f64>()
            && f.is_finite()
            && f.fract() == 0.0
            && f.abs() < 9.0e15
        {
            #[allow(clippy::cast_possible_truncation)]
            return Self::Number(f as i64);
        }
        Self::Text(value.to_string())
    }

    /// Returns the value as text, or `None` when missing.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
            Self::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Self::Missing => None,
        }
    }
}

impl From<&str> for RawPlace {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for RawPlace {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl std::fmt::Display for RawPlace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Missing => Ok(()),
        }
    }
}

/// A single crime incident row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Crime category label as recorded by the source (e.g. `"Robo"`).
    pub category: String,
    /// Incident date. `None` when the source date was unparseable.
    pub date: Option<NaiveDate>,
    /// Incident year.
    pub year: i32,
    /// Workday or weekend.
    pub weekday_type: WeekdayType,
    /// Whether a weapon was used.
    pub weapon_used: bool,
    /// Whether a motorcycle was used.
    pub motorcycle_used: bool,
    /// District identifier as recorded.
    pub district_raw: RawPlace,
    /// Neighborhood name as recorded.
    pub neighborhood_raw: RawPlace,
    /// Latitude in unknown units (degrees or scaled integer degrees).
    pub latitude: Option<f64>,
    /// Longitude in unknown units (degrees or scaled integer degrees).
    pub longitude: Option<f64>,
    /// Day of the week, `0` = Monday through `6` = Sunday.
    pub day_of_week: Option<u8>,
    /// Hour of the day the incident falls in, `0..=23`.
    pub hour_band: Option<u8>,
}

impl IncidentRecord {
    /// Returns the `YYYY-MM` bucket for this incident's date.
    #[must_use]
    pub fn year_month(&self) -> Option<String> {
        self.date
            .map(|d| format!("{:04}-{:02}", d.year(), d.month()))
    }
}
