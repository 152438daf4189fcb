#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! File-backed front end for the crime dashboard core.
//!
//! Loads an incident CSV export and a boundary `GeoJSON` gazetteer, runs
//! the resolution and aggregation pipeline, and produces serializable
//! reports. The binary in `main.rs` is a thin `clap` wrapper around
//! [`pipeline`].

pub mod loader;
pub mod pipeline;

use std::path::{Path, PathBuf};

use crime_dashboard_resolution::ResolutionError;
use crime_dashboard_resolution::registry::{config_by_id, parse_config};
use crime_dashboard_resolution_models::config::DashboardConfig;
use thiserror::Error;

/// Errors that can occur while loading inputs or producing a report.
#[derive(Debug, Error)]
pub enum CliError {
    /// An I/O operation failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Boundary or config resolution failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A configured column is absent from the CSV header.
    #[error("Missing column '{column}' in incident header")]
    MissingColumn {
        /// Configured column name.
        column: String,
    },

    /// No embedded config has the requested id.
    #[error("Unknown dataset config '{id}'")]
    UnknownConfig {
        /// Requested id.
        id: String,
    },
}

/// Reads a file to a string, tagging errors with the path.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file cannot be read.
pub fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a dataset configuration from a TOML file, or by embedded id.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if `id` is
/// not a registered config.
pub fn load_config(path: Option<&Path>, id: &str) -> Result<DashboardConfig, CliError> {
    if let Some(path) = path {
        log::info!("Loading dataset config from {}", path.display());
        return Ok(parse_config(&read_file(path)?)?);
    }
    config_by_id(id).ok_or_else(|| CliError::UnknownConfig { id: id.to_string() })
}
