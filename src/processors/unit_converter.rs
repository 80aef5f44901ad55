use crate::models::{Metric, MetricValues, Observation, RawField, RawStationRecord};
use crate::readers::additional_data;
use crate::readers::format_profile::{FormatProfile, SpeedUnit, TemperatureUnit};

pub const HPA_TO_PA: f64 = 100.0;
pub const KNOTS_TO_MS: f64 = 1852.0 / 3600.0;
pub const MILES_TO_KM: f64 = 1.60934;
pub const INCHES_TO_CM: f64 = 2.54;
pub const INCHES_TO_MM: f64 = 25.4;

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 1.8 + 32.0
}

/// Convert decoded records to observations carrying both native and SI columns.
pub fn convert(records: &[RawStationRecord], profile: &FormatProfile) -> Vec<Observation> {
    records
        .iter()
        .map(|record| {
            Observation::new(
                record.station_id.clone(),
                record.timestamp,
                convert_values(record, profile),
            )
        })
        .collect()
}

fn convert_values(record: &RawStationRecord, profile: &FormatProfile) -> MetricValues {
    let mut values = MetricValues::default();
    let raw = |field| record.value(field);

    for (field, f_metric, c_metric) in [
        (RawField::Temperature, Metric::TemperatureF, Metric::TemperatureC),
        (RawField::DewPoint, Metric::DewPointF, Metric::DewPointC),
        (RawField::MaxTemperature, Metric::MaxTemperatureF, Metric::MaxTemperatureC),
        (RawField::MinTemperature, Metric::MinTemperatureF, Metric::MinTemperatureC),
    ] {
        let (f, c) = match profile.units.temperature {
            TemperatureUnit::Fahrenheit => (raw(field), raw(field).map(fahrenheit_to_celsius)),
            TemperatureUnit::Celsius => (raw(field).map(celsius_to_fahrenheit), raw(field)),
        };
        values.set(f_metric, f);
        values.set(c_metric, c);
    }

    for (field, hpa_metric, pa_metric) in [
        (RawField::SeaLevelPressure, Metric::SeaLevelPressureHpa, Metric::SeaLevelPressurePa),
        (RawField::StationPressure, Metric::StationPressureHpa, Metric::StationPressurePa),
    ] {
        values.set(hpa_metric, raw(field));
        values.set(pa_metric, raw(field).map(|p| p * HPA_TO_PA));
    }

    for (field, knots_metric, ms_metric) in [
        (RawField::WindSpeed, Metric::WindSpeedKnots, Metric::WindSpeedMs),
        (RawField::MaxWindSpeed, Metric::MaxWindSpeedKnots, Metric::MaxWindSpeedMs),
        (RawField::Gust, Metric::GustKnots, Metric::GustMs),
    ] {
        match profile.units.wind_speed {
            SpeedUnit::Knots => {
                values.set(knots_metric, raw(field));
                values.set(ms_metric, raw(field).map(|v| v * KNOTS_TO_MS));
            }
            SpeedUnit::MetersPerSecond => values.set(ms_metric, raw(field)),
        }
    }

    values.set(Metric::WindDirection, raw(RawField::WindDirection));

    values.set(Metric::VisibilityMiles, raw(RawField::Visibility));
    values.set(Metric::VisibilityKm, raw(RawField::Visibility).map(|v| v * MILES_TO_KM));

    values.set(Metric::SnowDepthInches, raw(RawField::SnowDepth));
    values.set(Metric::SnowDepthCm, raw(RawField::SnowDepth).map(|v| v * INCHES_TO_CM));

    match profile.units.temperature {
        // Fahrenheit products report precipitation in inches.
        TemperatureUnit::Fahrenheit => {
            values.set(Metric::PrecipitationInches, raw(RawField::Precipitation));
            values.set(
                Metric::PrecipitationMm,
                raw(RawField::Precipitation).map(|v| v * INCHES_TO_MM),
            );
        }
        TemperatureUnit::Celsius => {
            values.set(Metric::PrecipitationMm, raw(RawField::Precipitation));
            values.set(Metric::Precipitation6hMm, raw(RawField::Precipitation6h));
        }
    }

    values.set(Metric::SkyCondition, raw(RawField::SkyCondition));

    // 0/1 per day, so aggregate means read as the fraction of days.
    if let Some(flags) = record.indicators {
        let flag = |set: bool| Some(if set { 1.0 } else { 0.0 });
        values.set(Metric::Fog, flag(flags.fog));
        values.set(Metric::RainOrDrizzle, flag(flags.rain));
        values.set(Metric::SnowOrIcePellets, flag(flags.snow));
        values.set(Metric::Hail, flag(flags.hail));
        values.set(Metric::Thunder, flag(flags.thunder));
        values.set(Metric::TornadoOrFunnelCloud, flag(flags.tornado));
    }

    if let Some(data) = record.additional_data.as_deref() {
        // GF1 coverage runs 0-20; halve it onto the EPW tenths scale.
        values.set(Metric::TotalSkyCover, additional_data::total_sky_cover(data).map(|v| v / 2.0));
        values.set(Metric::OpaqueSkyCover, additional_data::opaque_sky_cover(data).map(|v| v / 2.0));
        values.set(Metric::SolarZenith, additional_data::solar_zenith(data));
        values.set(Metric::SolarAzimuth, additional_data::solar_azimuth(data));
        values.set(Metric::RelativeHumidity, additional_data::relative_humidity(data));
    }

    restrict_to_profile(values, profile)
}

fn restrict_to_profile(values: MetricValues, profile: &FormatProfile) -> MetricValues {
    let mut restricted = MetricValues::default();
    for &metric in profile.metrics {
        restricted.set(metric, values.get(metric));
    }
    restricted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherIndicators;
    use crate::readers::format_profile::{GSOD, ISD_FULL, ISD_LITE};
    use chrono::NaiveDate;

    fn record(profile_fields: &[(RawField, f64)], additional_data: Option<&str>) -> RawStationRecord {
        let mut record = RawStationRecord::new(
            "744860-94789".parse().unwrap(),
            NaiveDate::from_ymd_opt(2018, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        );
        for &(field, value) in profile_fields {
            record.values.set(field, Some(value));
        }
        record.additional_data = additional_data.map(str::to_string);
        record
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_gsod_imperial_to_si() {
        let raw = record(
            &[
                (RawField::Temperature, 212.0),
                (RawField::SeaLevelPressure, 1013.25),
                (RawField::WindSpeed, 10.0),
                (RawField::Visibility, 10.0),
                (RawField::SnowDepth, 2.0),
                (RawField::Precipitation, 0.5),
            ],
            None,
        );
        let obs = &convert(&[raw], &GSOD)[0];

        assert_eq!(obs.value(Metric::TemperatureF), Some(212.0));
        assert!(close(obs.value(Metric::TemperatureC), 100.0));
        assert!(close(obs.value(Metric::SeaLevelPressurePa), 101325.0));
        assert!(close(obs.value(Metric::WindSpeedMs), 5.144444444444445));
        assert!(close(obs.value(Metric::VisibilityKm), 16.0934));
        assert!(close(obs.value(Metric::SnowDepthCm), 5.08));
        assert!(close(obs.value(Metric::PrecipitationMm), 12.7));
        assert_eq!(obs.value(Metric::DewPointC), None);
    }

    #[test]
    fn test_isd_celsius_not_reconverted() {
        let raw = record(
            &[(RawField::Temperature, 5.6), (RawField::WindSpeed, 4.1), (RawField::SeaLevelPressure, 1025.7)],
            None,
        );
        let obs = &convert(&[raw], &ISD_FULL)[0];

        assert_eq!(obs.value(Metric::TemperatureC), Some(5.6));
        assert!(close(obs.value(Metric::TemperatureF), 42.08));
        assert_eq!(obs.value(Metric::WindSpeedMs), Some(4.1));
        assert_eq!(obs.value(Metric::WindSpeedKnots), None);
        assert!(close(obs.value(Metric::SeaLevelPressurePa), 102570.0));
    }

    #[test]
    fn test_sky_cover_halved() {
        let raw = record(&[(RawField::Temperature, 1.0)], Some("ADDGF104021"));
        let obs = &convert(&[raw], &ISD_FULL)[0];
        assert_eq!(obs.value(Metric::TotalSkyCover), Some(2.0));
        assert_eq!(obs.value(Metric::OpaqueSkyCover), Some(1.0));

        // Full coverage on the 0-20 scale lands on 10 tenths.
        let raw = record(&[(RawField::Temperature, 1.0)], Some("ADDGF120101"));
        let obs = &convert(&[raw], &ISD_FULL)[0];
        assert_eq!(obs.value(Metric::TotalSkyCover), Some(10.0));
        assert_eq!(obs.value(Metric::OpaqueSkyCover), Some(5.0));

        let raw = record(&[(RawField::Temperature, 1.0)], Some("ADDMA1101861999999"));
        let obs = &convert(&[raw], &ISD_FULL)[0];
        assert_eq!(obs.value(Metric::TotalSkyCover), None);
    }

    #[test]
    fn test_gsod_indicators_become_columns() {
        let mut raw = record(&[(RawField::Temperature, 40.0)], None);
        raw.indicators = WeatherIndicators::parse("010010");
        let obs = &convert(&[raw], &GSOD)[0];

        assert_eq!(obs.value(Metric::Fog), Some(0.0));
        assert_eq!(obs.value(Metric::RainOrDrizzle), Some(1.0));
        assert_eq!(obs.value(Metric::SnowOrIcePellets), Some(0.0));
        assert_eq!(obs.value(Metric::Hail), Some(0.0));
        assert_eq!(obs.value(Metric::Thunder), Some(1.0));
        assert_eq!(obs.value(Metric::TornadoOrFunnelCloud), Some(0.0));

        let raw = record(&[(RawField::Temperature, 5.0)], None);
        let obs = &convert(&[raw], &ISD_FULL)[0];
        assert_eq!(obs.value(Metric::Thunder), None);
    }

    #[test]
    fn test_columns_restricted_to_profile() {
        let raw = record(&[(RawField::Precipitation, 1.2), (RawField::Precipitation6h, 3.4)], None);
        let obs = &convert(&[raw], &ISD_LITE)[0];
        assert_eq!(obs.value(Metric::PrecipitationMm), Some(1.2));
        assert_eq!(obs.value(Metric::Precipitation6hMm), Some(3.4));
        assert_eq!(obs.value(Metric::PrecipitationInches), None);
        assert_eq!(obs.value(Metric::MaxTemperatureC), None);
    }
}
