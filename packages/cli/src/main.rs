#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime dashboard.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use crime_dashboard_analytics::filter::IncidentFilter;
use crime_dashboard_cli::loader::load_incidents_file;
use crime_dashboard_cli::pipeline::{
    ReportOptions, build_report, choropleth, district_report, neighborhood_report,
    resolve_districts,
};
use crime_dashboard_cli::{CliError, load_config, read_file};
use crime_dashboard_incident_models::WeekdayType;
use crime_dashboard_resolution::boundary::{BoundaryIndex, selector_for};
use crime_dashboard_resolution::canonical::Canonicalizer;
use crime_dashboard_resolution::registry::{DEFAULT_CONFIG_ID, all_configs};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crime_dashboard", about = "Crime dashboard reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Dataset selection shared by every command that reads incidents.
#[derive(Args)]
struct DatasetArgs {
    /// Incident CSV export
    #[arg(long)]
    incidents: PathBuf,
    /// Embedded dataset config id
    #[arg(long, default_value = DEFAULT_CONFIG_ID)]
    dataset: String,
    /// Dataset config TOML file (overrides `--dataset`)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Incident filters. Repeat a flag to select several values.
#[derive(Args)]
struct FilterArgs {
    /// Keep only these years
    #[arg(long)]
    year: Vec<i32>,
    /// Keep only these categories
    #[arg(long)]
    category: Vec<String>,
    /// Keep only these weekday types (e.g. "WORKDAY", "Fin de semana")
    #[arg(long, value_parser = parse_weekday_type)]
    weekday_type: Vec<WeekdayType>,
    /// Earliest incident date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Latest incident date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

fn parse_weekday_type(value: &str) -> Result<WeekdayType, String> {
    value.parse().map_err(|_| {
        format!(
            "unknown weekday type '{value}', expected one of: {}",
            WeekdayType::all()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        )
    })
}

impl FilterArgs {
    fn into_filter(self) -> IncidentFilter {
        IncidentFilter {
            years: self.year.into_iter().collect(),
            categories: self.category.into_iter().collect(),
            weekday_types: self.weekday_type.into_iter().collect(),
            date_from: self.from,
            date_to: self.to,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full dashboard report as JSON
    Report {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Neighborhood boundary `GeoJSON`
        #[arg(long)]
        boundaries: PathBuf,
        /// Always match neighborhoods at tier 2
        #[arg(long)]
        force_fallback: bool,
        /// Rows kept in ranked tables
        #[arg(long, default_value = "10")]
        top: usize,
        /// Also write the boundaries with incident counts to this file
        #[arg(long)]
        choropleth_out: Option<PathBuf>,
    },
    /// Resolve the authoritative district of neighborhoods
    Resolve {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Resolve only this neighborhood
        #[arg(long)]
        neighborhood: Option<String>,
    },
    /// Drill down into one district
    District {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// District identifier (e.g. "14")
        district: String,
    },
    /// Drill down into one neighborhood
    Neighborhood {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Neighborhood name
        neighborhood: String,
    },
    /// List embedded dataset configs
    Datasets,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Datasets => {
            println!("{:<20} NAME", "ID");
            println!("{}", "-".repeat(50));
            for config in all_configs() {
                println!("{:<20} {}", config.id, config.name);
            }
        }
        Commands::Report {
            dataset,
            filter,
            boundaries,
            force_fallback,
            top,
            choropleth_out,
        } => {
            let config = load_config(dataset.config.as_deref(), &dataset.dataset)?;
            let incidents = load_incidents_file(&dataset.incidents, &config.columns)?;

            log::info!("Reading boundaries from {}", boundaries.display());
            let canonicalizer = Canonicalizer::from_config(&config.canonical);
            let selector = selector_for(&config.boundaries);
            let index = BoundaryIndex::from_geojson_str(
                &read_file(&boundaries)?,
                selector.as_ref(),
                &canonicalizer,
            )?;

            let options = ReportOptions {
                filter: filter.into_filter(),
                force_fallback,
                top,
            };
            let report = build_report(&incidents.records, &index, &config, &options);

            if let Some(path) = choropleth_out {
                write_json(&path, &choropleth(&index, &report.map.matches))?;
                log::info!("Wrote choropleth boundaries to {}", path.display());
            }
            print_json(&report)?;
        }
        Commands::Resolve {
            dataset,
            neighborhood,
        } => {
            let config = load_config(dataset.config.as_deref(), &dataset.dataset)?;
            let incidents = load_incidents_file(&dataset.incidents, &config.columns)?;
            let neighborhood = neighborhood.as_deref();
            print_json(&resolve_districts(&incidents.records, &config, neighborhood))?;
        }
        Commands::District {
            dataset,
            filter,
            district,
        } => {
            let config = load_config(dataset.config.as_deref(), &dataset.dataset)?;
            let incidents = load_incidents_file(&dataset.incidents, &config.columns)?;
            print_json(&district_report(
                &incidents.records,
                &config,
                &filter.into_filter(),
                &district,
            ))?;
        }
        Commands::Neighborhood {
            dataset,
            filter,
            neighborhood,
        } => {
            let config = load_config(dataset.config.as_deref(), &dataset.dataset)?;
            let incidents = load_incidents_file(&dataset.incidents, &config.columns)?;
            print_json(&neighborhood_report(
                &incidents.records,
                &config,
                &filter.into_filter(),
                &neighborhood,
            ))?;
        }
    }

    Ok(())
}
