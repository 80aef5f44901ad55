use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::aggregate::DegreeDayThresholds;
use super::station::StationId;
use crate::error::{ProcessingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Historical,
    Tmy,
}

impl FileType {
    pub fn stub_suffix(self) -> &'static str {
        match self {
            FileType::Historical => "Historical",
            FileType::Tmy => "TMY3",
        }
    }
}

/// Which NOAA product a historical request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    IsdFull,
    IsdLite,
    Gsod,
}

impl DataSource {
    /// Directory name used both remotely and under the weather dir.
    pub fn dir_name(self) -> &'static str {
        match self {
            DataSource::IsdFull => "isd_full",
            DataSource::IsdLite => "isd_lite",
            DataSource::Gsod => "gsod",
        }
    }

    pub fn is_daily(self) -> bool {
        matches!(self, DataSource::Gsod)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Csv,
    Json,
    Xlsx,
    Parquet,
    Epw,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Epw => "epw",
        }
    }
}

/// How the stations of a request are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StationSelector {
    ByName {
        country: String,
        name: String,
        state: Option<String>,
    },
    Ids(Vec<StationId>),
    Location {
        latitude: f64,
        longitude: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationRequest {
    pub file_type: FileType,
    pub data_source: DataSource,
    pub selector: StationSelector,

    #[validate(range(min = 1901, max = 2100))]
    pub start_year: i32,

    #[validate(range(min = 1901, max = 2100))]
    pub end_year: i32,

    pub output_format: OutputFormat,

    #[validate(nested)]
    pub thresholds: DegreeDayThresholds,
}

impl StationRequest {
    pub fn new(
        file_type: FileType,
        data_source: DataSource,
        selector: StationSelector,
        start_year: i32,
        end_year: i32,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            file_type,
            data_source,
            selector,
            start_year,
            end_year,
            output_format,
            thresholds: DegreeDayThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: DegreeDayThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    /// Check the request is internally consistent. Runs before any I/O.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if self.end_year < self.start_year {
            return Err(ProcessingError::Config(format!(
                "end year {} is before start year {}",
                self.end_year, self.start_year
            )));
        }

        match &self.selector {
            StationSelector::ByName { country, name, .. } => {
                if country.trim().is_empty() || name.trim().is_empty() {
                    return Err(ProcessingError::Config(
                        "a station lookup needs both a country and a station name".to_string(),
                    ));
                }
            }
            StationSelector::Ids(ids) => {
                if ids.is_empty() {
                    return Err(ProcessingError::Config("no station ids given".to_string()));
                }
            }
            StationSelector::Location {
                latitude,
                longitude,
            } => {
                if !(-90.0..=90.0).contains(latitude) || !(-180.0..=180.0).contains(longitude) {
                    return Err(ProcessingError::Config(format!(
                        "coordinates out of range: {}, {}",
                        latitude, longitude
                    )));
                }
            }
        }

        if self.file_type == FileType::Tmy
            && !matches!(self.selector, StationSelector::ByName { .. })
        {
            return Err(ProcessingError::Config(
                "TMY files are looked up by country, state and station name".to_string(),
            ));
        }

        if self.file_type == FileType::Historical
            && self.data_source.is_daily()
            && self.output_format == OutputFormat::Epw
        {
            return Err(ProcessingError::Config(
                "EPW output needs hourly data; GSOD is daily".to_string(),
            ));
        }

        Ok(())
    }

    /// Stem shared by every output file of `station`.
    pub fn filename_stub(&self, station: &StationId) -> String {
        let base = match &self.selector {
            StationSelector::ByName { country, name, .. } => format!("{}-{}", country, name),
            StationSelector::Location {
                latitude,
                longitude,
            } => format!("{}-{}", latitude, longitude),
            StationSelector::Ids(_) => station.to_string(),
        };
        format!("{}-{}", base, self.file_type.stub_suffix())
    }
}
