use crate::error::{ProcessingError, Result};
use crate::models::{HourlyObservation, Metric, MetricValues, StationId};
use crate::processors::unit_converter::celsius_to_fahrenheit;
use crate::writers::epw_writer::{field, EpwTemplate};
use chrono::NaiveDate;
use std::path::Path;
use tracing::debug;

/// TMY rows mix source years, so they are placed on one non-leap calendar.
pub const TMY_REFERENCE_YEAR: i32 = 2019;

/// Columns produced from an EPW file.
pub const TMY_METRICS: [Metric; 13] = [
    Metric::TemperatureF,
    Metric::TemperatureC,
    Metric::DewPointF,
    Metric::DewPointC,
    Metric::StationPressurePa,
    Metric::VisibilityKm,
    Metric::WindSpeedMs,
    Metric::WindDirection,
    Metric::RelativeHumidity,
    Metric::TotalSkyCover,
    Metric::OpaqueSkyCover,
    Metric::PrecipitationMm,
    Metric::SnowDepthCm,
];

/// The `LOCATION` header line.
#[derive(Debug, Clone, PartialEq)]
pub struct EpwLocation {
    pub city: String,
    pub state: String,
    pub country: String,
    pub wmo: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl EpwLocation {
    fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 8 || !parts[0].eq_ignore_ascii_case("LOCATION") {
            return Err(ProcessingError::InvalidFormat(format!(
                "not an EPW LOCATION line: {}",
                line
            )));
        }

        let number = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| ProcessingError::InvalidFormat(format!("bad EPW coordinate '{}'", s)))
        };

        Ok(Self {
            city: parts[1].to_string(),
            state: parts[2].to_string(),
            country: parts[3].to_string(),
            wmo: parts[5].to_string(),
            latitude: number(parts[6])?,
            longitude: number(parts[7])?,
        })
    }

    /// EPW files carry a WMO number only; it maps onto the USAF component.
    pub fn station_id(&self) -> Result<StationId> {
        StationId::new(&self.wmo, "99999")
    }
}

#[derive(Debug, Clone)]
pub struct EpwFile {
    pub location: EpwLocation,
    pub hourly: Vec<HourlyObservation>,
    pub skipped_rows: usize,
}

fn value(row: &[String], index: usize, missing: f64) -> Option<f64> {
    row.get(index)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| *v < missing)
}

/// Parse EPW text into hourly observations on the reference calendar.
pub fn parse_epw(text: &str) -> Result<EpwFile> {
    let template = EpwTemplate::parse(text)?;
    let location = EpwLocation::parse(&template.header[0])?;

    let mut hourly = Vec::with_capacity(template.rows.len());
    let mut skipped_rows = 0;

    for row in &template.rows {
        let int = |index: usize| row[index].trim().parse::<u32>().ok();
        let timestamp = match (int(1), int(2), int(3)) {
            (Some(month), Some(day), Some(hour)) if (1..=24).contains(&hour) => {
                NaiveDate::from_ymd_opt(TMY_REFERENCE_YEAR, month, day)
                    .and_then(|d| d.and_hms_opt(hour - 1, 0, 0))
            }
            _ => None,
        };

        let Some(timestamp) = timestamp else {
            skipped_rows += 1;
            continue;
        };

        let mut values = MetricValues::new();
        if let Some(c) = value(row, field::DRY_BULB, 99.9) {
            values.set(Metric::TemperatureC, Some(c));
            values.set(Metric::TemperatureF, Some(celsius_to_fahrenheit(c)));
        }
        if let Some(c) = value(row, field::DEW_POINT, 99.9) {
            values.set(Metric::DewPointC, Some(c));
            values.set(Metric::DewPointF, Some(celsius_to_fahrenheit(c)));
        }
        values.set(Metric::RelativeHumidity, value(row, field::RELATIVE_HUMIDITY, 999.0));
        values.set(Metric::StationPressurePa, value(row, field::PRESSURE, 999_999.0));
        values.set(Metric::WindDirection, value(row, field::WIND_DIRECTION, 999.0));
        values.set(Metric::WindSpeedMs, value(row, field::WIND_SPEED, 999.0));
        values.set(Metric::TotalSkyCover, value(row, field::TOTAL_SKY_COVER, 99.0));
        values.set(Metric::OpaqueSkyCover, value(row, field::OPAQUE_SKY_COVER, 99.0));
        values.set(Metric::VisibilityKm, value(row, field::VISIBILITY, 9999.0));
        values.set(Metric::SnowDepthCm, value(row, field::SNOW_DEPTH, 999.0));
        values.set(Metric::PrecipitationMm, value(row, field::PRECIPITATION, 999.0));

        hourly.push(HourlyObservation::new(timestamp, values));
    }

    if skipped_rows > 0 {
        debug!("Skipped {} EPW rows outside the reference calendar", skipped_rows);
    }
    hourly.sort_by_key(|h| h.timestamp);

    Ok(EpwFile {
        location,
        hourly,
        skipped_rows,
    })
}

pub fn read_epw(path: &Path) -> Result<EpwFile> {
    let bytes = std::fs::read(path)?;
    parse_epw(&String::from_utf8_lossy(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_epw() -> String {
        let mut text = String::from(
            "LOCATION,New York J F Kennedy Int'l Arpt,NY,USA,TMY3,744860,40.65,-73.80,-5.0,7.0\n",
        );
        for line in [
            "DESIGN CONDITIONS,0",
            "TYPICAL/EXTREME PERIODS,0",
            "GROUND TEMPERATURES,0",
            "HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0",
            "COMMENTS 1,",
            "COMMENTS 2,",
            "DATA PERIODS,1,1,Data,Sunday, 1/ 1,12/31",
        ] {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("1988,1,1,1,60,?9?9?9?9E0,-2.0,-6.0,74,101800,0,0,9999,0,0,0,0,0,0,0,330,4.6,2,1,16,77777,9,999999999,0,0.0,0,88,0.0,0.0,0.0\n");
        text.push_str("1988,1,1,2,60,?9?9?9?9E0,-1.0,99.9,999,101700,0,0,9999,0,0,0,0,0,0,0,999,5.1,99,99,16,77777,9,999999999,0,0.0,0,88,0.0,0.0,0.0\n");
        text
    }

    #[test]
    fn test_parse_location_and_rows() {
        let epw = parse_epw(&sample_epw()).unwrap();

        assert_eq!(epw.location.country, "USA");
        assert_eq!(epw.location.state, "NY");
        assert_eq!(epw.location.station_id().unwrap().to_string(), "744860-99999");
        assert_eq!(epw.hourly.len(), 2);

        let first = &epw.hourly[0];
        assert_eq!(
            first.timestamp,
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(first.value(Metric::TemperatureC), Some(-2.0));
        assert!((first.value(Metric::TemperatureF).unwrap() - 28.4).abs() < 1e-9);
        assert_eq!(first.value(Metric::RelativeHumidity), Some(74.0));
        assert_eq!(first.value(Metric::WindDirection), Some(330.0));

        let second = &epw.hourly[1];
        assert_eq!(second.value(Metric::DewPointC), None);
        assert_eq!(second.value(Metric::RelativeHumidity), None);
        assert_eq!(second.value(Metric::WindDirection), None);
        assert_eq!(second.value(Metric::TotalSkyCover), None);
    }

    #[test]
    fn test_leap_day_rows_are_skipped() {
        let text = sample_epw().replace("1988,1,1,2,", "1988,2,29,2,");
        let epw = parse_epw(&text).unwrap();
        assert_eq!(epw.hourly.len(), 1);
        assert_eq!(epw.skipped_rows, 1);
    }
}
