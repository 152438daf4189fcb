//! Compile-time registry of dataset configurations.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Supporting a new city requires adding a TOML file in `config/` and a
//! corresponding entry here.

use crime_dashboard_resolution_models::config::DashboardConfig;

use crate::ResolutionError;

/// Identifier of the config used when none is requested.
pub const DEFAULT_CONFIG_ID: &str = "buenos_aires";

/// Embedded TOML dataset configurations.
const CONFIG_TOMLS: &[(&str, &str)] = &[
    ("buenos_aires", include_str!("../config/buenos_aires.toml")),
];

/// Parses a dataset configuration from TOML.
///
/// # Errors
///
/// Returns [`ResolutionError::Config`] if the TOML is malformed or does not
/// match the schema.
pub fn parse_config(toml_str: &str) -> Result<DashboardConfig, ResolutionError> {
    Ok(toml::de::from_str(toml_str)?)
}

/// Returns all embedded dataset configurations.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_configs() -> Vec<DashboardConfig> {
    CONFIG_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            parse_config(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse dataset config '{name}': {e}"))
        })
        .collect()
}

/// Looks up an embedded configuration by id.
#[must_use]
pub fn config_by_id(id: &str) -> Option<DashboardConfig> {
    all_configs().into_iter().find(|c| c.id == id)
}

/// Returns the default embedded configuration.
///
/// # Panics
///
/// Panics if [`DEFAULT_CONFIG_ID`] is not registered.
#[must_use]
pub fn default_config() -> DashboardConfig {
    config_by_id(DEFAULT_CONFIG_ID)
        .unwrap_or_else(|| panic!("Default dataset config '{DEFAULT_CONFIG_ID}' is not registered"))
}
