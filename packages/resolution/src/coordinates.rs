//! Coordinate unit normalization for the density-map fallback.
//!
//! Some exports store degrees as scaled integers (e.g. `-34603722` for
//! `-34.603722`). Each component whose magnitude exceeds
//! [`CoordinateNormalizer::scale_threshold`] is divided by
//! [`CoordinateNormalizer::scale_divisor`]; the threshold is fixed by
//! configuration rather than inferred from the data, so a partially
//! corrupt column cannot flip the interpretation of the good rows.

use crime_dashboard_incident_models::IncidentRecord;
use crime_dashboard_resolution_models::GeographicIssue;
use crime_dashboard_resolution_models::config::{CoordinateConfig, RegionBounds};
use serde::Serialize;

/// A plottable incident location in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityPoint {
    /// Position of the incident in the input slice.
    pub row: usize,
    pub latitude: f64,
    pub longitude: f64,
}

/// Points for a density rendering plus the rows that could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityPoints {
    pub points: Vec<DensityPoint>,
    /// Rows whose normalized coordinates fell outside the region.
    pub rejected: Vec<GeographicIssue>,
    /// Rows without coordinates (missing or zero).
    pub missing: usize,
}

/// Converts raw coordinates to degrees and checks them against a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateNormalizer {
    pub scale_threshold: f64,
    pub scale_divisor: f64,
    pub bounds: RegionBounds,
}

impl CoordinateNormalizer {
    #[must_use]
    pub const fn from_config(config: &CoordinateConfig) -> Self {
        Self {
            scale_threshold: config.scale_threshold,
            scale_divisor: config.scale_divisor,
            bounds: config.bounds,
        }
    }

    /// Converts one component to degrees.
    #[must_use]
    pub fn to_degrees(&self, value: f64) -> f64 {
        if value.abs() > self.scale_threshold {
            value / self.scale_divisor
        } else {
            value
        }
    }

    /// Normalizes a raw pair. Returns `Err` with the normalized values when
    /// the point lies outside the region.
    ///
    /// # Errors
    ///
    /// Returns the normalized `(latitude, longitude)` if it is not a
    /// plausible location within [`Self::bounds`].
    pub fn normalize(&self, latitude: f64, longitude: f64) -> Result<(f64, f64), (f64, f64)> {
        let lat = self.to_degrees(latitude);
        let lng = self.to_degrees(longitude);
        if self.bounds.contains(lat, lng) {
            Ok((lat, lng))
        } else {
            Err((lat, lng))
        }
    }

    /// Builds density points from every record with coordinates.
    ///
    /// Out-of-region rows are reported as
    /// [`GeographicIssue::MalformedCoordinate`]; they are only excluded
    /// from the map, never from count tables.
    #[must_use]
    pub fn density_points(&self, records: &[IncidentRecord]) -> DensityPoints {
        let mut result = DensityPoints::default();

        for (row, record) in records.iter().enumerate() {
            let Some((latitude, longitude)) = present(record.latitude, record.longitude) else {
                result.missing += 1;
                continue;
            };

            match self.normalize(latitude, longitude) {
                Ok((latitude, longitude)) => result.points.push(DensityPoint {
                    row,
                    latitude,
                    longitude,
                }),
                Err((latitude, longitude)) => {
                    result.rejected.push(GeographicIssue::MalformedCoordinate {
                        row,
                        latitude,
                        longitude,
                    });
                }
            }
        }

        if !result.rejected.is_empty() {
            log::warn!(
                "Excluded {} incidents with out-of-region coordinates from the density map",
                result.rejected.len()
            );
        }
        log::debug!(
            "Density map: {} points, {} rejected, {} without coordinates",
            result.points.len(),
            result.rejected.len(),
            result.missing
        );

        result
    }
}

/// Returns the pair if both are present and non-zero.
fn present(latitude: Option<f64>, longitude: Option<f64>) -> Option<(f64, f64)> {
    let latitude = latitude?;
    let longitude = longitude?;
    if latitude == 0.0 || longitude == 0.0 {
        return None;
    }
    Some((latitude, longitude))
}
