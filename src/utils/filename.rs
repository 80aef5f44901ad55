use crate::error::{ProcessingError, Result};
use crate::models::{DataSource, OutputFormat, StationId};
use std::path::{Path, PathBuf};

/// Replace characters that are not allowed in file names.
pub fn sanitize_component(component: &str) -> String {
    component
        .trim()
        .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], " ")
}

/// `<stub>-<year>-<granularity>.<ext>` inside `results_dir`.
pub fn granularity_output_path(
    results_dir: &Path,
    stub: &str,
    year: i32,
    granularity: &str,
    format: OutputFormat,
) -> PathBuf {
    results_dir.join(format!(
        "{}-{}-{}.{}",
        sanitize_component(stub),
        year,
        granularity,
        format.extension()
    ))
}

/// `<stub>-<year>.epw` inside `results_dir`.
pub fn epw_output_path(results_dir: &Path, stub: &str, year: i32) -> PathBuf {
    results_dir.join(format!(
        "{}-{}.{}",
        sanitize_component(stub),
        year,
        OutputFormat::Epw.extension()
    ))
}

/// Remote path of a raw file below the NOAA base URL.
pub fn remote_path(source: DataSource, station: &StationId, year: i32) -> String {
    match source {
        DataSource::IsdFull => format!("noaa/{}/{}-{}.gz", year, station, year),
        DataSource::IsdLite => format!("noaa/isd-lite/{}/{}-{}.gz", year, station, year),
        DataSource::Gsod => format!("gsod/{}/{}-{}.op.gz", year, station, year),
    }
}

/// Local name of a decompressed raw file.
pub fn local_file_name(source: DataSource, station: &StationId, year: i32) -> String {
    match source {
        DataSource::Gsod => format!("{}-{}.op", station, year),
        DataSource::IsdFull | DataSource::IsdLite => format!("{}-{}", station, year),
    }
}

/// `<weather_dir>/<source>/<year>/<file>`
pub fn local_raw_path(weather_dir: &Path, source: DataSource, station: &StationId, year: i32) -> PathBuf {
    weather_dir
        .join(source.dir_name())
        .join(year.to_string())
        .join(local_file_name(source, station, year))
}

/// Station and year from a raw file name: `USAF-WBAN-YEAR`, optionally
/// followed by `.op` and/or `.gz`.
pub fn parse_raw_file_name(file_name: &str) -> Result<(StationId, i32)> {
    let station = StationId::from_file_name(file_name)?;
    let year = file_name
        .split('-')
        .nth(2)
        .and_then(|rest| rest.split('.').next())
        .and_then(|digits| digits.parse::<i32>().ok())
        .ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("no year in file name '{}'", file_name))
        })?;
    Ok((station, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> StationId {
        "744860-94789".parse().unwrap()
    }

    #[test]
    fn test_granularity_output_path() {
        let path = granularity_output_path(
            Path::new("results"),
            "US-JOHN F KENNEDY INTERNATIONAL AIRPORT-Historical",
            2018,
            "daily",
            OutputFormat::Csv,
        );
        assert_eq!(
            path,
            PathBuf::from("results/US-JOHN F KENNEDY INTERNATIONAL AIRPORT-Historical-2018-daily.csv")
        );
    }

    #[test]
    fn test_epw_output_path() {
        let path = epw_output_path(Path::new("results"), "40.6-73.8-Historical", 2017);
        assert_eq!(path, PathBuf::from("results/40.6-73.8-Historical-2017.epw"));
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("A/B:C"), "A B C");
    }

    #[test]
    fn test_remote_paths() {
        assert_eq!(
            remote_path(DataSource::IsdFull, &station(), 2017),
            "noaa/2017/744860-94789-2017.gz"
        );
        assert_eq!(
            remote_path(DataSource::IsdLite, &station(), 2017),
            "noaa/isd-lite/2017/744860-94789-2017.gz"
        );
        assert_eq!(
            remote_path(DataSource::Gsod, &station(), 2017),
            "gsod/2017/744860-94789-2017.op.gz"
        );
    }

    #[test]
    fn test_local_raw_path() {
        let path = local_raw_path(Path::new("weather"), DataSource::Gsod, &station(), 2017);
        assert_eq!(path, PathBuf::from("weather/gsod/2017/744860-94789-2017.op"));
    }

    #[test]
    fn test_parse_raw_file_name() {
        assert_eq!(parse_raw_file_name("744860-94789-2017").unwrap(), (station(), 2017));
        assert_eq!(parse_raw_file_name("744860-94789-2017.op").unwrap(), (station(), 2017));
        assert_eq!(parse_raw_file_name("744860-94789-2017.gz").unwrap(), (station(), 2017));
        assert!(parse_raw_file_name("744860-94789").is_err());
        assert!(parse_raw_file_name("readme.txt").is_err());
    }
}
