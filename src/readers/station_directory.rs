use crate::error::{ProcessingError, Result};
use crate::models::{StationId, StationMetadata, StationSelector};
use crate::utils::coordinates::{parse_coordinate, validate_coordinates};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Raw `isd-history.csv` row.
#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "USAF")]
    usaf: String,
    #[serde(rename = "WBAN")]
    wban: String,
    #[serde(rename = "STATION NAME")]
    name: String,
    #[serde(rename = "CTRY")]
    country: String,
    #[serde(rename = "STATE")]
    state: String,
    #[serde(rename = "LAT")]
    latitude: String,
    #[serde(rename = "LON")]
    longitude: String,
    #[serde(rename = "ELEV(M)")]
    elevation: String,
    #[serde(rename = "BEGIN")]
    begin: String,
    #[serde(rename = "END")]
    end: String,
}

impl HistoryRow {
    fn into_metadata(self) -> Result<StationMetadata> {
        let id = StationId::new(&self.usaf, &self.wban)?;
        let latitude = parse_coordinate(&self.latitude)?;
        let longitude = parse_coordinate(&self.longitude)?;
        validate_coordinates(latitude, longitude)?;
        let elevation = self.elevation.trim().parse::<f64>().ok();
        let begin = NaiveDate::parse_from_str(self.begin.trim(), "%Y%m%d")?;
        let end = NaiveDate::parse_from_str(self.end.trim(), "%Y%m%d")?;
        let state = Some(self.state.trim().to_string()).filter(|s| !s.is_empty());

        Ok(StationMetadata::new(
            id,
            self.name.trim().to_string(),
            self.country.trim().to_string(),
            state,
            latitude,
            longitude,
            elevation,
            begin,
            end,
        ))
    }
}

/// A station chosen for a request, with its directory entry when known.
#[derive(Debug, Clone, PartialEq)]
pub struct StationTarget {
    pub id: StationId,
    pub metadata: Option<StationMetadata>,
}

/// Index over the NOAA station history.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    stations: Vec<StationMetadata>,
    by_id: HashMap<StationId, usize>,
}

impl StationDirectory {
    pub fn from_stations(stations: Vec<StationMetadata>) -> Self {
        let by_id = stations
            .iter()
            .enumerate()
            .map(|(index, station)| (station.id.clone(), index))
            .collect();
        Self { stations, by_id }
    }

    /// Load `isd-history.csv` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = decode_text(&bytes);
        let directory = Self::parse(&text)?;
        debug!("Loaded {} stations from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// Parse CSV text. Rows without coordinates or dates are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let mut stations = Vec::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<HistoryRow>() {
            match row?.into_metadata() {
                Ok(station) => stations.push(station),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} incomplete station history rows", skipped);
        }

        Ok(Self::from_stations(stations))
    }

    /// Whether the file is absent or older than `max_age`.
    pub fn needs_refresh(path: &Path, max_age: Duration) -> bool {
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return true,
        };

        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > max_age)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[StationMetadata] {
        &self.stations
    }

    pub fn get(&self, id: &StationId) -> Option<&StationMetadata> {
        self.by_id.get(id).map(|&index| &self.stations[index])
    }

    /// Exact (case-insensitive) match on country, name and optionally state.
    pub fn find_by_name(&self, country: &str, name: &str, state: Option<&str>) -> Vec<&StationMetadata> {
        self.stations
            .iter()
            .filter(|s| s.country.eq_ignore_ascii_case(country.trim()))
            .filter(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .filter(|s| match state {
                Some(state) => s
                    .state
                    .as_deref()
                    .is_some_and(|st| st.eq_ignore_ascii_case(state.trim())),
                None => true,
            })
            .collect()
    }

    /// Case-insensitive substring search on station names.
    pub fn search(&self, query: &str, country: Option<&str>) -> Vec<&StationMetadata> {
        let query = query.trim().to_uppercase();
        self.stations
            .iter()
            .filter(|s| s.name.to_uppercase().contains(&query))
            .filter(|s| country.map_or(true, |c| s.country.eq_ignore_ascii_case(c)))
            .collect()
    }

    /// The `limit` closest stations, optionally restricted to those with data
    /// through `year`, paired with their distance in km.
    pub fn nearest(
        &self,
        latitude: f64,
        longitude: f64,
        year: Option<i32>,
        limit: usize,
    ) -> Vec<(&StationMetadata, f64)> {
        let mut candidates: Vec<(&StationMetadata, f64)> = self
            .stations
            .iter()
            .filter(|s| year.map_or(true, |y| s.covers_year(y)))
            .map(|s| (s, s.distance_km(latitude, longitude)))
            .collect();

        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(limit);
        candidates
    }

    /// Turn a request selector into concrete stations.
    pub fn resolve(&self, selector: &StationSelector, year: i32) -> Result<Vec<StationTarget>> {
        match selector {
            StationSelector::ByName {
                country,
                name,
                state,
            } => {
                let matches = self.find_by_name(country, name, state.as_deref());
                if matches.is_empty() {
                    return Err(ProcessingError::NoStationMatch {
                        query: format!("{} {} {}", country, state.as_deref().unwrap_or(""), name),
                    });
                }
                Ok(matches
                    .into_iter()
                    .map(|s| StationTarget {
                        id: s.id.clone(),
                        metadata: Some(s.clone()),
                    })
                    .collect())
            }
            StationSelector::Ids(ids) => Ok(ids
                .iter()
                .map(|id| {
                    let metadata = self.get(id).cloned();
                    if metadata.is_none() {
                        warn!("Station {} is not in the station history", id);
                    }
                    StationTarget {
                        id: id.clone(),
                        metadata,
                    }
                })
                .collect()),
            StationSelector::Location {
                latitude,
                longitude,
            } => {
                let (station, distance) = self
                    .nearest(*latitude, *longitude, Some(year), 1)
                    .into_iter()
                    .next()
                    .ok_or_else(|| ProcessingError::NoStationMatch {
                        query: format!("{}, {} with data through {}", latitude, longitude, year),
                    })?;
                debug!("Closest station to {}, {} is {} ({:.1} km)", latitude, longitude, station.id, distance);
                Ok(vec![StationTarget {
                    id: station.id.clone(),
                    metadata: Some(station.clone()),
                }])
            }
        }
    }
}

/// `isd-history.csv` is mostly ASCII; a few names carry Latin-1 bytes.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Parse a station list: one `USAF-WBAN` per line, `#` starts a comment.
/// Short components are zero-padded.
pub fn parse_station_list(text: &str) -> Result<Vec<StationId>> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse::<StationId>())
        .collect()
}

pub fn read_station_list(path: &Path) -> Result<Vec<StationId>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ProcessingError::Config(format!("cannot read station list {}: {}", path.display(), e))
    })?;
    let stations = parse_station_list(&text)?;
    debug!("Read {} stations from {}", stations.len(), path.display());
    Ok(stations)
}
