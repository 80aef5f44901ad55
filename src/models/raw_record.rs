use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::station::StationId;

/// A native-unit quantity a format profile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawField {
    Temperature,
    DewPoint,
    SeaLevelPressure,
    StationPressure,
    Visibility,
    WindDirection,
    WindSpeed,
    MaxWindSpeed,
    Gust,
    MaxTemperature,
    MinTemperature,
    Precipitation,
    Precipitation6h,
    SnowDepth,
    SkyCondition,
}

impl RawField {
    pub const COUNT: usize = 15;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Descaled native values; `None` where the source held a sentinel or the
/// profile lacks the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawValues([Option<f64>; RawField::COUNT]);

impl Default for RawValues {
    fn default() -> Self {
        Self([None; RawField::COUNT])
    }
}

impl RawValues {
    pub fn get(&self, field: RawField) -> Option<f64> {
        self.0[field.index()]
    }

    pub fn set(&mut self, field: RawField, value: Option<f64>) {
        self.0[field.index()] = value;
    }
}

/// GSOD `FRSHTT` flags: fog, rain, snow, hail, thunder, tornado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherIndicators {
    pub fog: bool,
    pub rain: bool,
    pub snow: bool,
    pub hail: bool,
    pub thunder: bool,
    pub tornado: bool,
}

impl WeatherIndicators {
    /// Parse the six-character flag block. Anything other than `0`/`1` is rejected.
    pub fn parse(flags: &str) -> Option<Self> {
        let bits: Vec<bool> = flags
            .chars()
            .map(|c| match c {
                '1' => Some(true),
                '0' => Some(false),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        if bits.len() != 6 {
            return None;
        }

        Some(Self {
            fog: bits[0],
            rain: bits[1],
            snow: bits[2],
            hail: bits[3],
            thunder: bits[4],
            tornado: bits[5],
        })
    }
}

/// One decoded line of a raw station file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStationRecord {
    pub station_id: StationId,
    pub timestamp: NaiveDateTime,
    pub values: RawValues,
    pub indicators: Option<WeatherIndicators>,
    pub additional_data: Option<String>,
}

impl RawStationRecord {
    pub fn new(station_id: StationId, timestamp: NaiveDateTime) -> Self {
        Self {
            station_id,
            timestamp,
            values: RawValues::default(),
            indicators: None,
            additional_data: None,
        }
    }

    pub fn value(&self, field: RawField) -> Option<f64> {
        self.values.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_indicators() {
        let flags = WeatherIndicators::parse("010010").unwrap();
        assert!(!flags.fog);
        assert!(flags.rain);
        assert!(flags.thunder);
        assert!(!flags.tornado);

        assert!(WeatherIndicators::parse("0100").is_none());
        assert!(WeatherIndicators::parse("01001x").is_none());
    }
}
