use crate::error::{ProcessingError, Result};
use crate::models::{DataSource, OutputFormat, StationId, StationSelector};
use crate::readers::read_station_list;
use crate::utils::constants::COMPRESSION_SNAPPY;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "noaa-weather")]
#[command(about = "Fetch NOAA and TMY weather files and turn them into hourly, daily and monthly series")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    IsdFull,
    IsdLite,
    Gsod,
}

impl From<SourceArg> for DataSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::IsdFull => DataSource::IsdFull,
            SourceArg::IsdLite => DataSource::IsdLite,
            SourceArg::Gsod => DataSource::Gsod,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
    Xlsx,
    Parquet,
    Epw,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Xlsx => OutputFormat::Xlsx,
            FormatArg::Parquet => OutputFormat::Parquet,
            FormatArg::Epw => OutputFormat::Epw,
        }
    }
}

fn parse_station_id(value: &str) -> std::result::Result<StationId, String> {
    value.parse().map_err(|e: ProcessingError| e.to_string())
}

/// Directory overrides; unset values come from the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    #[arg(long, help = "Directory for station history, EPW template and error log")]
    pub support_dir: Option<PathBuf>,

    #[arg(long, help = "Directory for downloaded weather files")]
    pub weather_dir: Option<PathBuf>,

    #[arg(long, help = "Directory for generated output")]
    pub results_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    #[arg(short, long, default_value = COMPRESSION_SNAPPY, help = "Parquet compression")]
    pub compression: String,

    #[arg(long, help = "Heating degree-day base in °F [default: from config, 65]")]
    pub heating_base: Option<f64>,

    #[arg(long, help = "Cooling degree-day base in °F [default: from config, 65]")]
    pub cooling_base: Option<f64>,

    #[arg(long, default_value_t = num_cpus::get())]
    pub max_workers: usize,
}

/// Exactly one way of choosing stations.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectorArgs {
    #[arg(long, help = "Country code as used by the station history (e.g. US)")]
    pub country: Option<String>,

    #[arg(long, help = "State code (e.g. NY)")]
    pub state: Option<String>,

    #[arg(long, help = "Station name as listed in the station history")]
    pub name: Option<String>,

    #[arg(long = "station", value_parser = parse_station_id, help = "Station id USAF-WBAN, repeatable")]
    pub stations: Vec<StationId>,

    #[arg(long, help = "File with one USAF-WBAN per line, '#' starts a comment")]
    pub stations_file: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    pub latitude: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    pub longitude: Option<f64>,
}

impl SelectorArgs {
    pub fn to_selector(&self) -> Result<StationSelector> {
        let by_name = self.country.is_some() || self.name.is_some();
        let by_ids = !self.stations.is_empty() || self.stations_file.is_some();
        let by_location = self.latitude.is_some() || self.longitude.is_some();

        match (by_name, by_ids, by_location) {
            (true, false, false) => Ok(StationSelector::ByName {
                country: self.country.clone().unwrap_or_default(),
                name: self.name.clone().unwrap_or_default(),
                state: self.state.clone(),
            }),
            (false, true, false) => {
                let mut ids = self.stations.clone();
                if let Some(path) = &self.stations_file {
                    ids.extend(read_station_list(path)?);
                }
                if ids.is_empty() {
                    return Err(ProcessingError::Config("the station list is empty".to_string()));
                }
                Ok(StationSelector::Ids(ids))
            }
            (false, false, true) => match (self.latitude, self.longitude) {
                (Some(latitude), Some(longitude)) => Ok(StationSelector::Location {
                    latitude,
                    longitude,
                }),
                _ => Err(ProcessingError::Config(
                    "both --latitude and --longitude are required".to_string(),
                )),
            },
            (false, false, false) => Err(ProcessingError::Config(
                "choose stations with --country/--name, --station/--stations-file or --latitude/--longitude".to_string(),
            )),
            _ => Err(ProcessingError::Config(
                "use only one of --country/--name, --station/--stations-file or --latitude/--longitude".to_string(),
            )),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download historical station-years and convert them
    Fetch {
        #[arg(short, long, value_enum, default_value = "isd-full")]
        source: SourceArg,

        #[arg(long)]
        start_year: i32,

        #[arg(long, help = "Last year to fetch [default: start year]")]
        end_year: Option<i32>,

        #[command(flatten)]
        selector: SelectorArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Download a typical meteorological year and summarise it
    Tmy {
        #[arg(long)]
        country: String,

        #[arg(long)]
        state: Option<String>,

        #[arg(long, help = "Location name as used in the EnergyPlus weather index")]
        name: String,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Convert raw files that are already on disk
    Convert {
        #[arg(short, long, value_enum, default_value = "isd-full")]
        source: SourceArg,

        #[arg(required = true, help = "Raw files or directories named USAF-WBAN-YEAR")]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Search the station history
    Stations {
        #[arg(long, help = "Substring of the station name")]
        query: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long, allow_hyphen_values = true, requires = "longitude")]
        latitude: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "latitude")]
        longitude: Option<f64>,

        #[arg(long, help = "Only stations with data through this year")]
        year: Option<i32>,

        #[arg(long, default_value = "10")]
        limit: usize,

        #[arg(long, help = "Download the station history even if it is recent")]
        refresh: bool,

        #[command(flatten)]
        paths: PathArgs,
    },
}
