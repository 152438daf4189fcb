#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic entity resolution for the crime dashboard.
//!
//! Reconciles free-text neighborhood and district labels from incident rows
//! with an external boundary gazetteer. Names are canonicalized at two
//! strictness tiers ([`canonical`]), boundary names are indexed at both
//! tiers ([`boundary`]), aggregated neighborhood counts are joined to
//! boundaries with tier escalation ([`matcher`]), and each neighborhood's
//! authoritative district is picked by majority vote ([`district`]).
//!
//! Everything here is a pure function of its inputs. Loading the incident
//! and boundary datasets, and caching results across filter changes, are
//! left to the caller.

pub mod boundary;
pub mod canonical;
pub mod coordinates;
pub mod district;
pub mod matcher;
pub mod registry;

use thiserror::Error;

/// Hard failures. Soft, reportable conditions are returned as
/// [`crime_dashboard_resolution_models::GeographicIssue`] values instead.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The boundary document is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A dataset configuration failed to parse.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The boundary dataset contains no features.
    #[error("Boundary dataset contains no features")]
    EmptyBoundaries,

    /// No boundary feature carries any properties.
    #[error("No boundary feature has properties")]
    NoProperties,

    /// The name-property selector rejected every key.
    #[error("No name property among boundary keys {keys:?}")]
    NoNameProperty {
        /// Keys offered to the selector.
        keys: Vec<String>,
    },

    /// Valid `GeoJSON` of an unsupported shape.
    #[error("Unsupported GeoJSON: {message}")]
    Unsupported {
        /// Description of what went wrong.
        message: String,
    },
}
