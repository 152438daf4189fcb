#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic entity-resolution result types.
//!
//! These types carry the outcome of reconciling free-text neighborhood and
//! district labels against a boundary gazetteer. Every "soft" failure
//! (a boundary without a name, a neighborhood split across districts, no
//! map coverage at all) is represented as data via [`GeographicIssue`]
//! rather than as an error, so the rendering layer can decide how to
//! surface it.

pub mod config;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Text used when an unknown place has to be rendered or re-canonicalized.
///
/// Canonicalizers always treat this text as a sentinel, so canonicalizing
/// the rendered form of [`CanonicalName::Unknown`] yields `Unknown` again.
pub const UNKNOWN_MARKER: &str = "UNKNOWN";

/// Canonicalization strictness.
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
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Trimmed and uppercased.
    Tier1,
    /// Tier 1, then diacritics removed and only ASCII letters/digits kept.
    Tier2,
}

/// A place name in canonical form.
///
/// `Unknown` is a distinct variant rather than a reserved string, so no
/// real name can ever collide with it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanonicalName {
    /// A real place name.
    Known(String),
    /// Empty input or a sentinel value meaning "no data".
    Unknown,
}

impl CanonicalName {
    /// Returns the canonical text, or `None` for [`Self::Unknown`].
    #[must_use]
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::Known(s) => Some(s),
            Self::Unknown => None,
        }
    }

    /// Returns the canonical text, using [`UNKNOWN_MARKER`] for unknowns.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.as_known().unwrap_or(UNKNOWN_MARKER)
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Consumes the name, returning the canonical text if known.
    #[must_use]
    pub fn into_known(self) -> Option<String> {
        match self {
            Self::Known(s) => Some(s),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident count for one neighborhood (Tier 1 canonical name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodCount {
    /// Tier 1 canonical neighborhood name.
    pub neighborhood: String,
    /// Number of incidents.
    pub count: u64,
}

/// Number of incidents linking one neighborhood to one district value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictAssociation {
    /// Tier 1 canonical neighborhood name.
    pub neighborhood: String,
    /// Tier 1 canonical district value.
    pub district: String,
    /// Number of incidents with this pairing.
    pub count: u64,
}

/// One district's share of a neighborhood's incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictShare {
    /// Tier 1 canonical district value.
    pub district: String,
    /// Incidents recorded under this district.
    pub count: u64,
    /// Share of the neighborhood's known-district incidents, 0-100.
    pub percentage: f64,
}

/// The authoritative district for a neighborhood, chosen by majority vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDistrict {
    /// Tier 1 canonical neighborhood name.
    pub neighborhood: String,
    /// Winning district (Tier 1 canonical).
    pub district: String,
    /// Incidents supporting the winning district.
    pub supporting_count: u64,
    /// Incidents for this neighborhood with any known district.
    pub total_count: u64,
    /// `true` iff more than one distinct district was observed.
    pub is_ambiguous: bool,
    /// Every observed district, most frequent first. Ties keep the order in
    /// which districts were first encountered.
    pub breakdown: Vec<DistrictShare>,
}

impl ResolvedDistrict {
    /// Fraction of incidents supporting the winning district, 0-1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn support_ratio(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.supporting_count as f64 / self.total_count as f64
    }
}

/// Outcome of resolving a neighborhood's district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DistrictResolution {
    /// At least one incident had a known district.
    Resolved(ResolvedDistrict),
    /// No incident for this neighborhood had a known district.
    #[serde(rename_all = "camelCase")]
    NoDistrictData {
        /// Tier 1 canonical neighborhood name (or [`UNKNOWN_MARKER`]).
        neighborhood: String,
    },
}

impl DistrictResolution {
    /// Returns the resolved district, if any.
    #[must_use]
    pub const fn resolved(&self) -> Option<&ResolvedDistrict> {
        match self {
            Self::Resolved(r) => Some(r),
            Self::NoDistrictData { .. } => None,
        }
    }

    /// The reportable issue attached to this resolution, if any.
    #[must_use]
    pub fn issue(&self) -> Option<GeographicIssue> {
        match self {
            Self::Resolved(r) if r.is_ambiguous => {
                Some(GeographicIssue::AmbiguousDistrictAssociation {
                    neighborhood: r.neighborhood.clone(),
                    district_count: r.breakdown.len(),
                })
            }
            Self::Resolved(_) => None,
            Self::NoDistrictData { neighborhood } => Some(GeographicIssue::NoDistrictData {
                neighborhood: neighborhood.clone(),
            }),
        }
    }
}

/// Options controlling neighborhood-to-boundary matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOptions {
    /// Always escalate to Tier 2, even when Tier 1 found matches.
    #[serde(default)]
    pub force_fallback: bool,
}

/// A neighborhood count joined to a boundary polygon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedNeighborhood {
    /// The aggregated row.
    #[serde(flatten)]
    pub row: NeighborhoodCount,
    /// Boundary feature id the row joined to.
    pub boundary_id: String,
}

/// How the map view should be rendered for a given match result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MapRendering {
    /// At least one neighborhood joined to a polygon.
    Choropleth,
    /// Nothing joined; render raw coordinates instead.
    DensityFallback,
}

/// Result of matching neighborhood counts against a boundary index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    /// Rows that joined to a boundary, in input order.
    pub matched: Vec<MatchedNeighborhood>,
    /// Rows that joined to nothing, in input order.
    pub unmatched: Vec<NeighborhoodCount>,
    /// Matched incident count over total incident count.
    pub coverage_ratio: f64,
    /// Tier whose intersection produced the match set.
    pub tier: Tier,
    /// Rows dropped before matching because their count was zero.
    pub discarded_empty: usize,
    /// Rows dropped before matching because their name is empty or a
    /// sentinel.
    pub discarded_unknown: usize,
}

impl MatchReport {
    /// Builds a report, computing the coverage ratio from the partitions.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        matched: Vec<MatchedNeighborhood>,
        unmatched: Vec<NeighborhoodCount>,
        tier: Tier,
        discarded_empty: usize,
        discarded_unknown: usize,
    ) -> Self {
        let matched_total: u64 = matched.iter().map(|m| m.row.count).sum();
        let unmatched_total: u64 = unmatched.iter().map(|u| u.count).sum();
        let total = matched_total + unmatched_total;
        let coverage_ratio = if total == 0 {
            0.0
        } else {
            matched_total as f64 / total as f64
        };

        Self {
            matched,
            unmatched,
            coverage_ratio,
            tier,
            discarded_empty,
            discarded_unknown,
        }
    }

    /// Total incidents in matched rows.
    #[must_use]
    pub fn matched_total(&self) -> u64 {
        self.matched.iter().map(|m| m.row.count).sum()
    }

    /// Total incidents in unmatched rows.
    #[must_use]
    pub fn unmatched_total(&self) -> u64 {
        self.unmatched.iter().map(|u| u.count).sum()
    }

    #[must_use]
    pub const fn rendering(&self) -> MapRendering {
        if self.matched.is_empty() {
            MapRendering::DensityFallback
        } else {
            MapRendering::Choropleth
        }
    }

    /// Returns [`GeographicIssue::NoGeographicMatch`] when nothing joined.
    #[must_use]
    pub const fn issue(&self) -> Option<GeographicIssue> {
        if self.matched.is_empty() {
            Some(GeographicIssue::NoGeographicMatch)
        } else {
            None
        }
    }

    /// Sums matched counts per boundary id.
    ///
    /// Different raw spellings of the same neighborhood can join to the
    /// same polygon at Tier 2; the choropleth needs one value per polygon.
    #[must_use]
    pub fn counts_by_boundary(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for m in &self.matched {
            *totals.entry(m.boundary_id.clone()).or_insert(0) += m.row.count;
        }
        totals
    }
}

/// Reportable, non-fatal conditions found while resolving places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeographicIssue {
    /// A boundary feature had no usable name and was not indexed.
    #[serde(rename_all = "camelCase")]
    MissingNameProperty {
        /// Position of the feature in the input collection.
        feature_index: usize,
    },
    /// A boundary feature repeats an earlier feature's Tier 1 name and was
    /// not indexed.
    #[serde(rename_all = "camelCase")]
    DuplicateBoundaryName {
        /// Position of the feature in the input collection.
        feature_index: usize,
        /// Tier 1 canonical name shared with the earlier feature.
        name: String,
    },
    /// Neither tier joined any neighborhood to a boundary.
    NoGeographicMatch,
    /// A neighborhood was recorded under more than one district.
    #[serde(rename_all = "camelCase")]
    AmbiguousDistrictAssociation {
        /// Tier 1 canonical neighborhood name.
        neighborhood: String,
        /// Number of distinct districts observed.
        district_count: usize,
    },
    /// A neighborhood has no incident with a known district.
    #[serde(rename_all = "camelCase")]
    NoDistrictData {
        /// Tier 1 canonical neighborhood name.
        neighborhood: String,
    },
    /// A coordinate fell outside the region after unit normalization.
    #[serde(rename_all = "camelCase")]
    MalformedCoordinate {
        /// Position of the incident in the input slice.
        row: usize,
        /// Latitude after normalization.
        latitude: f64,
        /// Longitude after normalization.
        longitude: f64,
    },
}

impl std::fmt::Display for GeographicIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingNameProperty { feature_index } => {
                write!(f, "boundary feature {feature_index} has no usable name")
            }
            Self::DuplicateBoundaryName {
                feature_index,
                name,
            } => write!(
                f,
                "boundary feature {feature_index} repeats the name {name}"
            ),
            Self::NoGeographicMatch => f.write_str("no neighborhood matched any boundary"),
            Self::AmbiguousDistrictAssociation {
                neighborhood,
                district_count,
            } => write!(
                f,
                "neighborhood {neighborhood} is recorded under {district_count} districts"
            ),
            Self::NoDistrictData { neighborhood } => {
                write!(f, "neighborhood {neighborhood} has no known district")
            }
            Self::MalformedCoordinate {
                row,
                latitude,
                longitude,
            } => write!(
                f,
                "incident {row} has out-of-region coordinates ({latitude}, {longitude})"
            ),
        }
    }
}
