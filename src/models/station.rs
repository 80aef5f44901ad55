use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::utils::coordinates::haversine_distance;

pub const USAF_WIDTH: usize = 6;
pub const WBAN_WIDTH: usize = 5;

/// NOAA station key, rendered as `USAF-WBAN` (e.g. `744860-94789`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId {
    usaf: String,
    wban: String,
}

impl StationId {
    /// Build an id from its two components, left-padding with zeros.
    pub fn new(usaf: &str, wban: &str) -> Result<Self> {
        let usaf = usaf.trim();
        let wban = wban.trim();

        if usaf.is_empty() || wban.is_empty() {
            return Err(ProcessingError::InvalidStationId(format!(
                "empty component in '{}-{}'",
                usaf, wban
            )));
        }

        if usaf.len() > USAF_WIDTH || wban.len() > WBAN_WIDTH {
            return Err(ProcessingError::InvalidStationId(format!(
                "USAF must be at most {} characters and WBAN at most {}, got '{}-{}'",
                USAF_WIDTH, WBAN_WIDTH, usaf, wban
            )));
        }

        if !usaf.chars().all(|c| c.is_ascii_alphanumeric()) || !wban.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ProcessingError::InvalidStationId(format!(
                "unexpected characters in '{}-{}'",
                usaf, wban
            )));
        }

        Ok(Self {
            usaf: format!("{:0>width$}", usaf, width = USAF_WIDTH),
            wban: format!("{:0>width$}", wban, width = WBAN_WIDTH),
        })
    }

    pub fn usaf(&self) -> &str {
        &self.usaf
    }

    pub fn wban(&self) -> &str {
        &self.wban
    }

    /// Extract the id from a raw file name such as `744860-94789-2017` or
    /// `744860-94789-2017.op`.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let mut parts = file_name.split('-');
        match (parts.next(), parts.next()) {
            (Some(usaf), Some(wban)) => Self::new(usaf, wban),
            _ => Err(ProcessingError::InvalidStationId(format!(
                "file name '{}' does not start with USAF-WBAN",
                file_name
            ))),
        }
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.usaf, self.wban)
    }
}

impl FromStr for StationId {
    type Err = ProcessingError;

    /// Parses user input, warning when a component has to be padded.
    fn from_str(s: &str) -> Result<Self> {
        let (usaf, wban) = s.trim().split_once('-').ok_or_else(|| {
            ProcessingError::InvalidStationId(format!("expected USAF-WBAN, got '{}'", s))
        })?;

        let id = Self::new(usaf, wban)?;
        if usaf.len() < USAF_WIDTH {
            warn!("USAF must be {} characters, padded '{}' to '{}'", USAF_WIDTH, usaf, id.usaf);
        }
        if wban.len() < WBAN_WIDTH {
            warn!("WBAN must be {} digits, padded '{}' to '{}'", WBAN_WIDTH, wban, id.wban);
        }
        Ok(id)
    }
}

impl TryFrom<String> for StationId {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.to_string()
    }
}

/// One row of `isd-history.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    pub id: StationId,

    #[validate(length(min = 1))]
    pub name: String,

    pub country: String,

    pub state: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub elevation: Option<f64>,

    pub begin: NaiveDate,

    pub end: NaiveDate,
}

impl StationMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: StationId,
        name: String,
        country: String,
        state: Option<String>,
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            id,
            name,
            country,
            state,
            latitude,
            longitude,
            elevation,
            begin,
            end,
        }
    }

    /// Whether the recorded coverage reaches `year`.
    pub fn covers_year(&self, year: i32) -> bool {
        year <= self.end.year()
    }

    pub fn distance_km(&self, latitude: f64, longitude: f64) -> f64 {
        haversine_distance(self.latitude, self.longitude, latitude, longitude)
    }

    /// Station name made safe for use in a file name.
    pub fn file_safe_name(&self) -> String {
        self.name.replace(['/', '\\'], " ")
    }
}
