//! End-to-end dashboard computations over loaded inputs.
//!
//! Each function here is pure: it takes already-loaded incidents (and a
//! boundary index where needed) and returns a serializable report.
//! Filters are applied first, so every table and the map reflect the
//! same subset of incidents.

use std::collections::BTreeMap;

use crime_dashboard_analytics::filter::IncidentFilter;
use crime_dashboard_analytics::metrics::{HeadlineMetrics, headline_metrics, top_n};
use crime_dashboard_analytics::{Aggregator, GroupCount, GroupKey, KeyCount};
use crime_dashboard_incident_models::IncidentRecord;
use crime_dashboard_resolution::boundary::BoundaryIndex;
use crime_dashboard_resolution::canonical::Canonicalizer;
use crime_dashboard_resolution::coordinates::{CoordinateNormalizer, DensityPoints};
use crime_dashboard_resolution::district::DistrictResolver;
use crime_dashboard_resolution::matcher::NameMatcher;
use crime_dashboard_resolution_models::config::DashboardConfig;
use crime_dashboard_resolution_models::{
    DistrictResolution, GeographicIssue, MapRendering, MatchOptions, MatchReport,
    NeighborhoodCount,
};
use geojson::FeatureCollection;
use serde::Serialize;

/// Property added to each boundary feature in the choropleth output.
pub const INCIDENTS_PROPERTY: &str = "incidents";

/// Knobs for [`build_report`].
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub filter: IncidentFilter,
    /// Forces Tier 2 matching in addition to the config setting.
    pub force_fallback: bool,
    /// Rows kept in ranked tables.
    pub top: usize,
}

/// Everything the dashboard's main view shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub config_id: String,
    pub metrics: HeadlineMetrics,
    pub by_category: Vec<KeyCount>,
    pub by_year: Vec<KeyCount>,
    pub by_weekday_type: Vec<KeyCount>,
    pub top_districts: Vec<KeyCount>,
    pub top_neighborhoods: Vec<KeyCount>,
    pub neighborhood_months: Vec<GroupCount>,
    /// Incidents per `(day of week, hour band)`, the temporal heatmap.
    pub weekday_hours: Vec<GroupCount>,
    pub map: MapSection,
    /// Data-quality findings, in pipeline order.
    pub issues: Vec<GeographicIssue>,
}

/// The neighborhood map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSection {
    pub rendering: MapRendering,
    /// Boundary property the join keys were read from.
    pub name_property: String,
    pub matches: MatchReport,
    /// Density points, present only when the choropleth cannot be drawn.
    pub density: Option<DensityPoints>,
}

/// Drill-down for one district.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictReport {
    pub district: String,
    /// Neighborhoods whose majority district is this one.
    pub neighborhoods: Vec<NeighborhoodCount>,
    /// Every neighborhood recorded under this district, including
    /// minority associations.
    pub recorded_neighborhoods: Vec<NeighborhoodCount>,
    pub categories: Vec<KeyCount>,
    pub monthly: Vec<KeyCount>,
}

/// Drill-down for one neighborhood.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodReport {
    pub neighborhood: String,
    pub district: DistrictResolution,
    /// Every neighborhood recorded under the resolved district, this one
    /// included. Empty when the neighborhood has no district data.
    pub peers: Vec<NeighborhoodCount>,
    pub categories: Vec<KeyCount>,
    pub monthly: Vec<KeyCount>,
}

/// Builds the main dashboard report.
#[must_use]
pub fn build_report(
    records: &[IncidentRecord],
    index: &BoundaryIndex,
    config: &DashboardConfig,
    options: &ReportOptions,
) -> DashboardReport {
    let canonicalizer = Canonicalizer::from_config(&config.canonical);
    let records = options.filter.apply(records);
    if !options.filter.is_unrestricted() {
        log::info!("{} incidents after filtering", records.len());
    }

    let aggregator = Aggregator::new(&canonicalizer);
    let neighborhood_counts = aggregator.neighborhood_counts(&records);
    let match_options = MatchOptions {
        force_fallback: options.force_fallback || config.matching.force_fallback,
    };
    let matcher = NameMatcher::new(index, &canonicalizer);
    let matches = matcher.match_counts(&neighborhood_counts, match_options);

    let mut issues: Vec<GeographicIssue> = index.skipped().to_vec();
    issues.extend(matches.issue());
    let resolutions = DistrictResolver::new(&canonicalizer).resolve_all(&records);
    issues.extend(resolutions.iter().filter_map(DistrictResolution::issue));

    let rendering = matches.rendering();
    let density = match rendering {
        MapRendering::Choropleth => None,
        MapRendering::DensityFallback => {
            log::warn!("No neighborhood matched a boundary; falling back to a density map");
            let normalizer = CoordinateNormalizer::from_config(&config.coordinates);
            let points = normalizer.density_points(&records);
            issues.extend(points.rejected.iter().cloned());
            Some(points)
        }
    };

    let neighborhoods = aggregator.counts_by(&records, GroupKey::Neighborhood);
    DashboardReport {
        config_id: config.id.clone(),
        metrics: headline_metrics(&records, &canonicalizer),
        by_category: aggregator.counts_by_category(&records),
        by_year: aggregator.counts_by_year(&records),
        by_weekday_type: aggregator.counts_by_weekday_type(&records),
        top_districts: top_n(&aggregator.counts_by_district(&records), options.top),
        top_neighborhoods: top_n(&neighborhoods, options.top),
        neighborhood_months: aggregator.neighborhood_month_counts(&records),
        weekday_hours: aggregator.weekday_hour_counts(&records),
        map: MapSection {
            rendering,
            name_property: index.name_property().to_string(),
            matches,
            density,
        },
        issues,
    }
}

/// Boundary features with an [`INCIDENTS_PROPERTY`] count attached.
/// Boundaries with no matched incidents get zero.
#[must_use]
pub fn choropleth(index: &BoundaryIndex, matches: &MatchReport) -> FeatureCollection {
    let counts: BTreeMap<String, u64> = matches.counts_by_boundary();
    let mut collection = index.to_feature_collection();

    for (feature, boundary) in collection.features.iter_mut().zip(index.features()) {
        let count = counts.get(&boundary.id).copied().unwrap_or(0);
        feature.set_property(INCIDENTS_PROPERTY, count);
    }

    collection
}

/// Resolves districts for one neighborhood, or for all of them.
#[must_use]
pub fn resolve_districts(
    records: &[IncidentRecord],
    config: &DashboardConfig,
    neighborhood: Option<&str>,
) -> Vec<DistrictResolution> {
    let canonicalizer = Canonicalizer::from_config(&config.canonical);
    let resolver = DistrictResolver::new(&canonicalizer);
    match neighborhood {
        Some(name) => vec![resolver.resolve(records, name)],
        None => resolver.resolve_all(records),
    }
}

/// Builds the drill-down for one district.
#[must_use]
pub fn district_report(
    records: &[IncidentRecord],
    config: &DashboardConfig,
    filter: &IncidentFilter,
    district: &str,
) -> DistrictReport {
    let canonicalizer = Canonicalizer::from_config(&config.canonical);
    let records = filter.apply(records);
    let aggregator = Aggregator::new(&canonicalizer);
    let resolver = DistrictResolver::new(&canonicalizer);

    DistrictReport {
        district: district.to_string(),
        neighborhoods: resolver.neighborhoods_in_district(&records, district),
        recorded_neighborhoods: aggregator.neighborhood_counts_in_district(&records, district),
        categories: aggregator.category_counts_in_district(&records, district),
        monthly: aggregator.monthly_series_for_district(&records, district),
    }
}

/// Builds the drill-down for one neighborhood.
#[must_use]
pub fn neighborhood_report(
    records: &[IncidentRecord],
    config: &DashboardConfig,
    filter: &IncidentFilter,
    neighborhood: &str,
) -> NeighborhoodReport {
    let canonicalizer = Canonicalizer::from_config(&config.canonical);
    let records = filter.apply(records);
    let aggregator = Aggregator::new(&canonicalizer);
    let district = DistrictResolver::new(&canonicalizer).resolve(&records, neighborhood);
    let peers = district
        .resolved()
        .map(|r| aggregator.neighborhood_counts_in_district(&records, &r.district))
        .unwrap_or_default();

    NeighborhoodReport {
        neighborhood: neighborhood.to_string(),
        district,
        peers,
        categories: aggregator.category_counts_in_neighborhood(&records, neighborhood),
        monthly: aggregator.monthly_series_for_neighborhood(&records, neighborhood),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_dashboard_incident_models::{RawPlace, WeekdayType};
    use crime_dashboard_resolution_models::Tier;
    use crime_dashboard_resolution::boundary::KeywordSelector;
    use crime_dashboard_resolution::registry::default_config;

    const BARRIOS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"BARRIO": "Palermo", "COMUNA": 14}, "geometry": null},
        {"type": "Feature", "properties": {"BARRIO": "Núñez", "COMUNA": 13}, "geometry": null},
        {"type": "Feature", "properties": {"BARRIO": "Recoleta", "COMUNA": 2}, "geometry": null}
    ]}"#;

    fn incident(
        category: &str,
        district: RawPlace,
        neighborhood: &str,
        coordinates: Option<(f64, f64)>,
    ) -> IncidentRecord {
        IncidentRecord {
            category: category.to_string(),
            date: None,
            year: 2023,
            weekday_type: WeekdayType::Workday,
            weapon_used: false,
            motorcycle_used: false,
            district_raw: district,
            neighborhood_raw: RawPlace::from(neighborhood),
            latitude: coordinates.map(|c| c.0),
            longitude: coordinates.map(|c| c.1),
            day_of_week: None,
            hour_band: None,
        }
    }

    fn index(config: &DashboardConfig) -> BoundaryIndex {
        let canon = Canonicalizer::from_config(&config.canonical);
        BoundaryIndex::from_geojson_str(BARRIOS, &KeywordSelector::default(), &canon).unwrap()
    }

    fn options() -> ReportOptions {
        ReportOptions {
            top: 10,
            ..ReportOptions::default()
        }
    }

    #[test]
    fn builds_choropleth_report() {
        let config = default_config();
        let index = index(&config);
        let records = vec![
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Robo", RawPlace::Number(14), "Palermo", None),
            incident("Hurto", RawPlace::Number(13), "NUÑEZ", None),
            incident("Hurto", RawPlace::from("Sin datos"), "Sin datos", None),
        ];

        let report = build_report(&records, &index, &config, &options());

        assert_eq!(report.metrics.total_incidents, 4);
        assert_eq!(report.metrics.districts_affected, 2);
        assert_eq!(report.map.rendering, MapRendering::Choropleth);
        assert!(report.map.density.is_none());
        assert_eq!(report.map.name_property, "BARRIO");
        assert_eq!(report.map.matches.tier, Tier::Tier1);
        assert_eq!(report.map.matches.matched.len(), 1);
        assert_eq!(
            report.map.matches.unmatched,
            vec![NeighborhoodCount {
                neighborhood: "NUÑEZ".to_string(),
                count: 1,
            }]
        );
        assert_eq!(report.map.matches.discarded_unknown, 0);
        assert_eq!(report.top_neighborhoods[0].key, "PALERMO");
        assert_eq!(report.top_neighborhoods[0].count, 2);
    }

    #[test]
    fn falls_back_to_density_when_nothing_matches() {
        let config = default_config();
        let index = index(&config);
        let district = || RawPlace::Number(1);
        let records = vec![
            incident("Robo", district(), "ATLANTIDA", Some((-34.60, -58.38))),
            incident("Robo", district(), "ATLANTIDA", Some((-31.4, -64.18))),
            incident("Robo", district(), "ATLANTIDA", None),
        ];

        let report = build_report(&records, &index, &config, &options());

        assert_eq!(report.map.rendering, MapRendering::DensityFallback);
        let density = report.map.density.unwrap();
        assert_eq!(density.points.len(), 1);
        assert_eq!(density.missing, 1);
        assert!(report.issues.contains(&GeographicIssue::NoGeographicMatch));
        assert!(
            report
                .issues
                .iter()
                .any(|i| matches!(i, GeographicIssue::MalformedCoordinate { row: 1, .. }))
        );
        assert_eq!(report.metrics.total_incidents, 3);
    }

    #[test]
    fn reports_ambiguous_districts() {
        let config = default_config();
        let index = index(&config);
        let records = vec![
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Robo", RawPlace::Number(3), "PALERMO", None),
        ];

        let report = build_report(&records, &index, &config, &options());

        let ambiguous = GeographicIssue::AmbiguousDistrictAssociation {
            neighborhood: "PALERMO".to_string(),
            district_count: 2,
        };
        assert!(report.issues.contains(&ambiguous));
    }

    #[test]
    fn choropleth_attaches_counts() {
        let config = default_config();
        let index = index(&config);
        let records = vec![
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Robo", RawPlace::Number(2), "RECOLETA", None),
            incident("Robo", RawPlace::Number(2), "RECOLETA", None),
        ];
        let report = build_report(&records, &index, &config, &options());

        let collection = choropleth(&index, &report.map.matches);
        let counts: Vec<u64> = collection
            .features
            .iter()
            .map(|f| {
                f.property(INCIDENTS_PROPERTY)
                    .and_then(serde_json::Value::as_u64)
                    .unwrap()
            })
            .collect();
        assert_eq!(counts, vec![1, 0, 2]);
    }

    #[test]
    fn district_drill_down_uses_majority_membership() {
        let config = default_config();
        let records = vec![
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Hurto", RawPlace::Number(14), "PALERMO", None),
            incident("Robo", RawPlace::Number(13), "PALERMO", None),
            incident("Robo", RawPlace::Number(13), "NUNEZ", None),
        ];

        let report = district_report(&records, &config, &IncidentFilter::default(), "13");

        let members: Vec<&str> = report
            .neighborhoods
            .iter()
            .map(|n| n.neighborhood.as_str())
            .collect();
        assert_eq!(members, vec!["NUNEZ"]);
        let recorded: Vec<&str> = report
            .recorded_neighborhoods
            .iter()
            .map(|n| n.neighborhood.as_str())
            .collect();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.contains(&"PALERMO"));
        assert_eq!(report.categories[0].key, "Robo");
        assert_eq!(report.categories[0].count, 2);
    }

    #[test]
    fn neighborhood_drill_down_resolves_district() {
        let config = default_config();
        let records = vec![
            incident("Robo", RawPlace::Number(14), "Palermo", None),
            incident("Hurto", RawPlace::Number(14), "PALERMO ", None),
            incident("Robo", RawPlace::from("Sin datos"), "PALERMO", None),
        ];

        let filter = IncidentFilter::default();
        let report = neighborhood_report(&records, &config, &filter, "palermo");

        let resolved = report.district.resolved().unwrap();
        assert_eq!(resolved.district, "14");
        assert_eq!(resolved.supporting_count, 2);
        assert!(!resolved.is_ambiguous);
        assert_eq!(report.categories.len(), 2);
        assert!(report.monthly.is_empty());
    }

    #[test]
    fn neighborhood_drill_down_lists_district_peers() {
        let config = default_config();
        let records = vec![
            incident("Robo", RawPlace::Number(14), "Palermo", None),
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Hurto", RawPlace::Number(14), "Colegiales", None),
            incident("Robo", RawPlace::Number(13), "NUNEZ", None),
            incident("Robo", RawPlace::from("Sin datos"), "Atlantida", None),
        ];
        let filter = IncidentFilter::default();

        let report = neighborhood_report(&records, &config, &filter, "palermo");
        assert_eq!(
            report.peers,
            vec![
                NeighborhoodCount {
                    neighborhood: "PALERMO".to_string(),
                    count: 2,
                },
                NeighborhoodCount {
                    neighborhood: "COLEGIALES".to_string(),
                    count: 1,
                },
            ]
        );

        let report = neighborhood_report(&records, &config, &filter, "Atlantida");
        assert!(matches!(report.district, DistrictResolution::NoDistrictData { .. }));
        assert!(report.peers.is_empty());
    }

    #[test]
    fn builds_weekday_hour_heatmap() {
        let config = default_config();
        let index = index(&config);
        let at = |day: u8, hour: u8| IncidentRecord {
            day_of_week: Some(day),
            hour_band: Some(hour),
            ..incident("Robo", RawPlace::Number(14), "PALERMO", None)
        };
        let records = vec![at(4, 21), at(4, 21), at(0, 8), at(6, 3)];

        let report = build_report(&records, &index, &config, &options());

        let cells: Vec<(&str, &str, u64)> = report
            .weekday_hours
            .iter()
            .map(|g| (g.key[0].as_str(), g.key[1].as_str(), g.count))
            .collect();
        assert_eq!(cells, vec![("0", "8", 1), ("4", "21", 2), ("6", "3", 1)]);
    }

    #[test]
    fn resolves_single_or_all() {
        let config = default_config();
        let records = vec![
            incident("Robo", RawPlace::Number(14), "PALERMO", None),
            incident("Robo", RawPlace::Number(13), "NUNEZ", None),
        ];

        assert_eq!(resolve_districts(&records, &config, None).len(), 2);
        let single = resolve_districts(&records, &config, Some("Núñez"));
        assert_eq!(single.len(), 1);
        assert!(matches!(&single[0], DistrictResolution::NoDistrictData { .. }));
    }
}
