//! Dataset configuration schema, deserialized from TOML.
//!
//! A config describes everything dataset-specific that the resolution
//! pipeline needs: which raw values mean "no data", how to find the name
//! property in the boundary gazetteer, how to normalize coordinates for
//! the density fallback, and how the incident export names its columns.

use serde::{Deserialize, Serialize};

/// Complete configuration for one incident dataset and its gazetteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Unique config identifier (e.g. `"buenos_aires"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Sentinel vocabulary for place names.
    #[serde(default)]
    pub canonical: CanonicalConfig,
    /// Boundary name-property discovery.
    #[serde(default)]
    pub boundaries: BoundaryConfig,
    /// Matcher behavior.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Coordinate normalization for the density fallback.
    pub coordinates: CoordinateConfig,
    /// Incident export column names and value vocabularies.
    #[serde(default)]
    pub columns: ColumnMapping,
}

/// Values that canonicalize to "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalConfig {
    /// Raw values meaning "no data" (compared after Tier 2 canonicalization).
    #[serde(default)]
    pub sentinels: Vec<String>,
}

/// How to pick the name-bearing property of each boundary feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Exact property key to use. When set, keyword discovery is skipped.
    #[serde(default)]
    pub name_property: Option<String>,
    /// Case-insensitive substrings that identify a name-bearing key,
    /// tried in order.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            name_property: None,
            keywords: default_keywords(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    ["neighborhood", "barrio", "nombre", "name"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Matcher settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Always escalate to Tier 2 matching.
    #[serde(default)]
    pub force_fallback: bool,
}

/// Coordinate unit normalization and plausibility bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateConfig {
    /// A component whose magnitude exceeds this is treated as scaled.
    #[serde(default = "default_scale_threshold")]
    pub scale_threshold: f64,
    /// Divisor applied to scaled components.
    #[serde(default = "default_scale_divisor")]
    pub scale_divisor: f64,
    /// Plausible region for normalized coordinates.
    pub bounds: RegionBounds,
}

const fn default_scale_threshold() -> f64 {
    1_000.0
}

const fn default_scale_divisor() -> f64 {
    1_000_000.0
}

/// Latitude/longitude box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl RegionBounds {
    /// Whether the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

/// Column names in the incident export, plus the literal values used for
/// booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub category: String,
    pub date: String,
    pub year: String,
    pub weekday_type: String,
    pub weapon_used: String,
    pub motorcycle_used: String,
    pub district: String,
    pub neighborhood: String,
    pub latitude: String,
    pub longitude: String,
    /// Day-of-week number, `0` = Monday.
    pub day_of_week: String,
    /// Hour of the day.
    pub hour_band: String,
    /// Values meaning `true` in boolean columns (case-insensitive).
    pub true_values: Vec<String>,
    /// Accepted date formats (`chrono` syntax), tried in order.
    pub date_formats: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            category: "tipo".to_string(),
            date: "fecha".to_string(),
            year: "anio".to_string(),
            weekday_type: "tipo_dia".to_string(),
            weapon_used: "uso_arma".to_string(),
            motorcycle_used: "uso_moto".to_string(),
            district: "comuna".to_string(),
            neighborhood: "barrio".to_string(),
            latitude: "latitud".to_string(),
            longitude: "longitud".to_string(),
            day_of_week: "dia_semana_num".to_string(),
            hour_band: "franja".to_string(),
            true_values: vec!["SI".to_string(), "TRUE".to_string(), "1".to_string()],
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%d/%m/%Y".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
            ],
        }
    }
}
