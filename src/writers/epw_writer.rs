use crate::error::{ProcessingError, Result};
use crate::models::{HourlyObservation, Metric};
use chrono::{Datelike, Duration, NaiveDate};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const EPW_HEADER_LINES: usize = 8;
pub const EPW_FIELD_COUNT: usize = 35;

pub mod field {
    pub const YEAR: usize = 0;
    pub const DRY_BULB: usize = 6;
    pub const DEW_POINT: usize = 7;
    pub const RELATIVE_HUMIDITY: usize = 8;
    pub const PRESSURE: usize = 9;
    pub const WIND_DIRECTION: usize = 20;
    pub const WIND_SPEED: usize = 21;
    pub const TOTAL_SKY_COVER: usize = 22;
    pub const OPAQUE_SKY_COVER: usize = 23;
    pub const VISIBILITY: usize = 24;
    pub const SNOW_DEPTH: usize = 30;
    pub const PRECIPITATION: usize = 33;
}

pub const MISSING_TEMPERATURE: f64 = 99.9;
pub const MISSING_PRESSURE: f64 = 999_999.0;
pub const MISSING_WIND_DIRECTION: f64 = 999.0;
pub const MISSING_WIND_SPEED: f64 = 999.0;
pub const MISSING_SKY_COVER: f64 = 99.0;

/// Data-row fields 6..35 of an all-missing EPW record.
const MISSING_DATA_FIELDS: [&str; EPW_FIELD_COUNT - 6] = [
    "99.9", "99.9", "999", "999999", "9999", "9999", "9999", "9999", "9999", "9999", "999999",
    "999999", "999999", "9999", "999", "999", "99", "99", "9999", "99999", "9", "999999999",
    "999", "0.999", "999", "99", "999", "999", "99",
];

const MISSING_SOURCE_FLAGS: &str = "?9?9?9?9E0?9?9?9?9?9?9?9?9?9?9?9?9?9?9?9*9*9?9?9?9";

pub fn clamp_temperature(value: f64) -> f64 {
    if value >= 70.0 {
        69.0
    } else if value <= -70.0 {
        -69.0
    } else {
        value
    }
}

pub fn clamp_pressure(value: f64) -> f64 {
    if value >= 120_000.0 {
        119_999.0
    } else if value <= 31_000.0 {
        31_001.0
    } else {
        value
    }
}

pub fn clamp_wind_speed(value: f64) -> f64 {
    if value >= 40.0 {
        39.9
    } else {
        value
    }
}

/// An EPW file split into its header block and comma-separated data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EpwTemplate {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl EpwTemplate {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let header: Vec<String> = lines
            .by_ref()
            .take(EPW_HEADER_LINES)
            .map(str::to_string)
            .collect();

        if header.len() < EPW_HEADER_LINES {
            return Err(ProcessingError::InvalidFormat(format!(
                "EPW header has {} lines, expected {}",
                header.len(),
                EPW_HEADER_LINES
            )));
        }

        let mut rows = Vec::with_capacity(8784);
        for (index, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<String> = line.split(',').map(str::to_string).collect();
            if fields.len() < EPW_FIELD_COUNT {
                return Err(ProcessingError::InvalidFormat(format!(
                    "EPW data row {} has {} fields, expected {}",
                    index + 1,
                    fields.len(),
                    EPW_FIELD_COUNT
                )));
            }
            rows.push(fields);
        }

        Ok(Self { header, rows })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    /// Use the template at `path`, or build a synthetic one when it is absent.
    pub fn load_or_synthetic(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Using EPW template {}", path.display());
            Self::load(path)
        } else {
            warn!(
                "EPW template {} not found, using a synthetic template",
                path.display()
            );
            Self::synthetic()
        }
    }

    /// A non-leap year of hourly rows carrying EPW missing codes.
    pub fn synthetic() -> Result<Self> {
        let header = vec![
            "LOCATION,Unknown,,,,999999,0.00,0.00,0.0,0.0".to_string(),
            "DESIGN CONDITIONS,0".to_string(),
            "TYPICAL/EXTREME PERIODS,0".to_string(),
            "GROUND TEMPERATURES,0".to_string(),
            "HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0".to_string(),
            "COMMENTS 1,Synthetic template".to_string(),
            "COMMENTS 2,".to_string(),
            "DATA PERIODS,1,1,Data,Sunday, 1/ 1,12/31".to_string(),
        ];

        let start = NaiveDate::from_ymd_opt(2019, 1, 1)
            .ok_or_else(|| ProcessingError::InvalidFormat("template start date".to_string()))?;

        let rows = (0..365)
            .map(|offset| start + Duration::days(offset))
            .flat_map(|date| {
                (1..=24).map(move |hour| {
                    let mut row = vec![
                        date.year().to_string(),
                        date.month().to_string(),
                        date.day().to_string(),
                        hour.to_string(),
                        "60".to_string(),
                        MISSING_SOURCE_FLAGS.to_string(),
                    ];
                    row.extend(MISSING_DATA_FIELDS.iter().map(|f| f.to_string()));
                    row
                })
            })
            .collect();

        Ok(Self { header, rows })
    }
}

fn set(row: &mut [String], index: usize, value: f64, precision: usize) {
    row[index] = format!("{:.*}", precision, value);
}

/// Overlay hourly rows onto the template and write the result.
///
/// `min(template rows, hourly rows)` records are written; the template's
/// month/day/hour columns are kept and only the year is replaced.
pub fn write_epw(hourly: &[HourlyObservation], template: &EpwTemplate, path: &Path) -> Result<usize> {
    let length = template.rows.len().min(hourly.len());
    if length < template.rows.len() {
        debug!(
            "Writing {} of {} template rows to {}",
            length,
            template.rows.len(),
            path.display()
        );
    }

    let mut out = String::with_capacity(length * 160);
    for line in &template.header {
        out.push_str(line);
        out.push('\n');
    }

    for (template_row, observation) in template.rows.iter().zip(hourly).take(length) {
        let mut row = template_row.clone();
        row[field::YEAR] = observation.timestamp.year().to_string();

        let dry_bulb = observation
            .value(Metric::TemperatureC)
            .map(clamp_temperature)
            .unwrap_or(MISSING_TEMPERATURE);
        set(&mut row, field::DRY_BULB, dry_bulb, 1);

        let dew_point = observation
            .value(Metric::DewPointC)
            .map(clamp_temperature)
            .unwrap_or(MISSING_TEMPERATURE);
        set(&mut row, field::DEW_POINT, dew_point, 1);

        let humidity = observation.value(Metric::RelativeHumidity).unwrap_or(0.0);
        set(&mut row, field::RELATIVE_HUMIDITY, humidity, 0);

        let pressure = observation
            .value(Metric::SeaLevelPressurePa)
            .or_else(|| observation.value(Metric::StationPressurePa))
            .map(clamp_pressure)
            .unwrap_or(MISSING_PRESSURE);
        set(&mut row, field::PRESSURE, pressure, 0);

        let direction = observation
            .value(Metric::WindDirection)
            .unwrap_or(MISSING_WIND_DIRECTION);
        set(&mut row, field::WIND_DIRECTION, direction, 0);

        let speed = observation
            .value(Metric::WindSpeedMs)
            .map(clamp_wind_speed)
            .unwrap_or(MISSING_WIND_SPEED);
        set(&mut row, field::WIND_SPEED, speed, 1);

        let total_sky = observation
            .value(Metric::TotalSkyCover)
            .unwrap_or(MISSING_SKY_COVER);
        set(&mut row, field::TOTAL_SKY_COVER, total_sky, 0);

        let opaque_sky = observation
            .value(Metric::OpaqueSkyCover)
            .unwrap_or(MISSING_SKY_COVER);
        set(&mut row, field::OPAQUE_SKY_COVER, opaque_sky, 0);

        out.push_str(&row.join(","));
        out.push('\n');
    }

    fs::write(path, out)?;
    Ok(length)
}
