//! Incident CSV loading.
//!
//! Column names and value vocabularies come from
//! [`ColumnMapping`]; nothing about a particular export is hard-coded.
//! Rows that cannot be placed in time (no usable year) or classified as
//! workday/weekend are skipped and counted, never fatal.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use crime_dashboard_incident_models::{IncidentRecord, RawPlace, WeekdayType};
use crime_dashboard_resolution_models::config::ColumnMapping;
use csv::StringRecord;

use crate::CliError;

/// Records read from an export plus the number of rows dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedIncidents {
    pub records: Vec<IncidentRecord>,
    /// Rows without a usable year or weekday type.
    pub skipped: usize,
}

/// Header positions of the configured columns.
struct ColumnIndex<'a> {
    mapping: &'a ColumnMapping,
    category: usize,
    district: usize,
    neighborhood: usize,
    date: Option<usize>,
    year: Option<usize>,
    weekday_type: Option<usize>,
    weapon_used: Option<usize>,
    motorcycle_used: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    day_of_week: Option<usize>,
    hour_band: Option<usize>,
}

impl<'a> ColumnIndex<'a> {
    fn new(headers: &StringRecord, mapping: &'a ColumnMapping) -> Result<Self, CliError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| CliError::MissingColumn {
                column: name.to_string(),
            })
        };

        let index = Self {
            mapping,
            category: require(&mapping.category)?,
            district: require(&mapping.district)?,
            neighborhood: require(&mapping.neighborhood)?,
            date: find(&mapping.date),
            year: find(&mapping.year),
            weekday_type: find(&mapping.weekday_type),
            weapon_used: find(&mapping.weapon_used),
            motorcycle_used: find(&mapping.motorcycle_used),
            latitude: find(&mapping.latitude),
            longitude: find(&mapping.longitude),
            day_of_week: find(&mapping.day_of_week),
            hour_band: find(&mapping.hour_band),
        };

        if index.year.is_none() && index.date.is_none() {
            return Err(CliError::MissingColumn {
                column: mapping.year.clone(),
            });
        }

        Ok(index)
    }

    fn parse(&self, row: &StringRecord) -> Option<IncidentRecord> {
        let cell = |i: Option<usize>| i.and_then(|i| row.get(i)).map_or("", str::trim);

        let date = parse_date(cell(self.date), &self.mapping.date_formats);
        let year = parse_year(cell(self.year)).or_else(|| date.map(|d| d.year()))?;
        let weekday_type = cell(self.weekday_type)
            .parse::<WeekdayType>()
            .ok()
            .or_else(|| date.map(weekday_type_of))?;

        Some(IncidentRecord {
            category: cell(Some(self.category)).to_string(),
            date,
            year,
            weekday_type,
            weapon_used: self.is_true(cell(self.weapon_used)),
            motorcycle_used: self.is_true(cell(self.motorcycle_used)),
            district_raw: RawPlace::parse(cell(Some(self.district))),
            neighborhood_raw: RawPlace::parse(cell(Some(self.neighborhood))),
            latitude: parse_coordinate(cell(self.latitude)),
            longitude: parse_coordinate(cell(self.longitude)),
            day_of_week: parse_bounded(cell(self.day_of_week), 6)
                .or_else(|| date.and_then(day_of_week_of)),
            hour_band: parse_bounded(cell(self.hour_band), 23),
        })
    }

    fn is_true(&self, value: &str) -> bool {
        self.mapping
            .true_values
            .iter()
            .any(|t| t.eq_ignore_ascii_case(value))
    }
}

fn parse_date(value: &str, formats: &[String]) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, format)
                    .ok()
                    .map(|dt| dt.date())
            })
    })
}

fn parse_year(value: &str) -> Option<i32> {
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    let year = value.parse::<f64>().ok()?;
    if year.is_finite() && year.fract() == 0.0 && year.abs() < 1.0e5 {
        #[allow(clippy::cast_possible_truncation)]
        return Some(year as i32);
    }
    None
}

/// Parses an integral cell (`"5"` or `"5.0"`) no greater than `max`.
fn parse_bounded(value: &str, max: u8) -> Option<u8> {
    let n = parse_year(value)?;
    u8::try_from(n).ok().filter(|n| *n <= max)
}

fn day_of_week_of(date: NaiveDate) -> Option<u8> {
    u8::try_from(date.weekday().num_days_from_monday()).ok()
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn weekday_type_of(date: NaiveDate) -> WeekdayType {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => WeekdayType::Weekend,
        _ => WeekdayType::Workday,
    }
}

/// Reads incident rows from CSV.
///
/// # Errors
///
/// Returns [`CliError::MissingColumn`] if a required column is absent from
/// the header, or [`CliError::Csv`] if the CSV is malformed.
pub fn load_incidents<R: Read>(
    reader: R,
    columns: &ColumnMapping,
) -> Result<LoadedIncidents, CliError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();
    let index = ColumnIndex::new(&headers, columns)?;

    let mut loaded = LoadedIncidents::default();
    for result in reader.records() {
        let row = result?;
        match index.parse(&row) {
            Some(record) => loaded.records.push(record),
            None => loaded.skipped += 1,
        }
    }

    if loaded.skipped > 0 {
        log::warn!(
            "Skipped {} incident rows without a usable year or weekday type",
            loaded.skipped
        );
    }
    log::info!("Loaded {} incidents", loaded.records.len());

    Ok(loaded)
}

/// Reads incident rows from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn load_incidents_file(
    path: &Path,
    columns: &ColumnMapping,
) -> Result<LoadedIncidents, CliError> {
    log::info!("Reading incidents from {}", path.display());
    let file = std::fs::File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_incidents(std::io::BufReader::new(file), columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
tipo,fecha,anio,tipo_dia,uso_arma,uso_moto,comuna,barrio,latitud,longitud,dia_semana_num,franja
Robo,2023-02-03,2023,Laboral,SI,NO,14,Palermo,-34.58,-58.42,4,21
Hurto,2023-02-11,2023,Fin de semana,NO,si,14.0,PALERMO,-34581000,-58421000,5.0,3
Lesiones,,2022,LABORAL,,,Sin datos,Sin datos,,,9,24
Robo,2023-03-04,,,NO,NO,2,Recoleta,0,0,,
Robo,,,,NO,NO,2,Recoleta,,,,
";

    #[test]
    fn loads_rows_with_default_mapping() {
        let loaded = load_incidents(EXPORT.as_bytes(), &ColumnMapping::default()).unwrap();

        assert_eq!(loaded.records.len(), 4);
        assert_eq!(loaded.skipped, 1);

        let first = &loaded.records[0];
        assert_eq!(first.category, "Robo");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 2, 3));
        assert_eq!(first.year, 2023);
        assert_eq!(first.weekday_type, WeekdayType::Workday);
        assert!(first.weapon_used);
        assert!(!first.motorcycle_used);
        assert_eq!(first.district_raw, RawPlace::Number(14));
        assert_eq!(
            first.neighborhood_raw,
            RawPlace::Text("Palermo".to_string())
        );
        assert_eq!(first.latitude, Some(-34.58));
    }

    #[test]
    fn parses_vocabularies_case_insensitively() {
        let loaded = load_incidents(EXPORT.as_bytes(), &ColumnMapping::default()).unwrap();
        let second = &loaded.records[1];

        assert_eq!(second.weekday_type, WeekdayType::Weekend);
        assert!(second.motorcycle_used);
        assert_eq!(second.district_raw, RawPlace::Number(14));
        assert_eq!(second.latitude, Some(-34_581_000.0));
    }

    #[test]
    fn keeps_blank_places_as_missing() {
        let loaded = load_incidents(EXPORT.as_bytes(), &ColumnMapping::default()).unwrap();
        let third = &loaded.records[2];

        assert_eq!(third.date, None);
        assert_eq!(third.district_raw, RawPlace::Text("Sin datos".to_string()));
        assert_eq!(third.latitude, None);
        assert!(!third.weapon_used);
    }

    #[test]
    fn derives_year_and_weekday_type_from_date() {
        let loaded = load_incidents(EXPORT.as_bytes(), &ColumnMapping::default()).unwrap();
        let fourth = &loaded.records[3];

        assert_eq!(fourth.year, 2023);
        // 2023-03-04 was a Saturday.
        assert_eq!(fourth.weekday_type, WeekdayType::Weekend);
    }

    #[test]
    fn reads_day_of_week_and_hour_band() {
        let loaded = load_incidents(EXPORT.as_bytes(), &ColumnMapping::default()).unwrap();
        let cells: Vec<(Option<u8>, Option<u8>)> = loaded
            .records
            .iter()
            .map(|r| (r.day_of_week, r.hour_band))
            .collect();

        assert_eq!(
            cells,
            vec![
                (Some(4), Some(21)),
                (Some(5), Some(3)),
                (None, None),
                (Some(5), None),
            ]
        );
    }

    #[test]
    fn accepts_alternate_date_formats() {
        let formats = ColumnMapping::default().date_formats;
        assert_eq!(
            parse_date("03/02/2023", &formats),
            NaiveDate::from_ymd_opt(2023, 2, 3)
        );
        assert_eq!(
            parse_date("2023-02-03 14:30:00", &formats),
            NaiveDate::from_ymd_opt(2023, 2, 3)
        );
        assert_eq!(parse_date("yesterday", &formats), None);
    }

    #[test]
    fn parses_float_years() {
        assert_eq!(parse_year("2021.0"), Some(2021));
        assert_eq!(parse_year("2021.5"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn honors_custom_column_names() {
        let mapping = ColumnMapping {
            category: "offense".to_string(),
            year: "year".to_string(),
            weekday_type: "day_type".to_string(),
            district: "district".to_string(),
            neighborhood: "neighborhood".to_string(),
            ..ColumnMapping::default()
        };
        let csv = "offense,year,day_type,district,neighborhood\nTheft,2020,weekend,3,Balvanera\n";

        let loaded = load_incidents(csv.as_bytes(), &mapping).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].weekday_type, WeekdayType::Weekend);
        assert_eq!(loaded.records[0].latitude, None);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "tipo,anio,tipo_dia,barrio\nRobo,2023,Laboral,Palermo\n";
        let err = load_incidents(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(
            err,
            CliError::MissingColumn { column } if column == "comuna"
        ));
    }
}
