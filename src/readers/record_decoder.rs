use crate::error::{ProcessingError, Result};
use crate::models::{RawStationRecord, StationId, WeatherIndicators};
use crate::readers::format_profile::{Column, FormatProfile, StationSource, TimeOfDay};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use chrono::{NaiveDate, NaiveDateTime};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// A line that could not be decoded, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub line_number: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOutput {
    pub records: Vec<RawStationRecord>,
    pub malformed: Vec<MalformedLine>,
    pub lines_read: usize,
}

/// Decode raw lines with `profile`.
///
/// `file_station` supplies the station id for profiles that do not carry it
/// on each line. Bad lines are collected in `malformed`; decoding continues.
pub fn decode<'a, I>(lines: I, profile: &FormatProfile, file_station: Option<&StationId>) -> DecodeOutput
where
    I: IntoIterator<Item = &'a str>,
{
    let mut output = DecodeOutput::default();

    for (index, line) in lines.into_iter().enumerate() {
        output.lines_read += 1;

        if index < profile.header_lines {
            continue;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        match decode_line(line, profile, file_station) {
            Ok(record) => output.records.push(record),
            Err(reason) => output.malformed.push(MalformedLine {
                line_number: index + 1,
                reason,
            }),
        }
    }

    if !output.malformed.is_empty() {
        debug!(
            "{}: {} of {} lines malformed",
            profile.name,
            output.malformed.len(),
            output.lines_read
        );
    }

    output
}

/// Decode a single data line.
pub fn decode_line(
    line: &str,
    profile: &FormatProfile,
    file_station: Option<&StationId>,
) -> std::result::Result<RawStationRecord, String> {
    let tokens: Vec<&str> = match profile.station {
        StationSource::FileName => line.split_whitespace().collect(),
        StationSource::Columns { .. } => Vec::new(),
    };

    let station_id = match profile.station {
        StationSource::Columns { usaf, wban } => {
            let usaf = text(line, &tokens, usaf, "USAF")?;
            let wban = text(line, &tokens, wban, "WBAN")?;
            StationId::new(usaf, wban).map_err(|e| e.to_string())?
        }
        StationSource::FileName => file_station
            .cloned()
            .ok_or_else(|| "station id not available from file name".to_string())?,
    };

    let timestamp = timestamp(line, &tokens, profile)?;
    let mut record = RawStationRecord::new(station_id, timestamp);

    for spec in profile.fields {
        let raw = text(line, &tokens, spec.column, &format!("{:?}", spec.field))?;
        let value: f64 = raw
            .parse()
            .map_err(|_| format!("{:?} is not numeric: '{}'", spec.field, raw))?;

        // Sentinels are defined on the unscaled value.
        let value = if value == spec.sentinel {
            None
        } else {
            Some(value / spec.scale)
        };
        record.values.set(spec.field, value);
    }

    record.indicators = profile
        .indicators
        .and_then(|column| column.extract(line, &tokens))
        .and_then(WeatherIndicators::parse);

    record.additional_data = profile
        .additional_data_from
        .and_then(|start| line.get(start..))
        .map(str::trim)
        .filter(|tail| !tail.is_empty())
        .map(str::to_string);

    Ok(record)
}

fn text<'a>(line: &'a str, tokens: &[&'a str], column: Column, label: &str) -> std::result::Result<&'a str, String> {
    column
        .extract(line, tokens)
        .map(str::trim)
        .ok_or_else(|| format!("line too short for {}", label))
}

fn number(line: &str, tokens: &[&str], column: Column, label: &str) -> std::result::Result<u32, String> {
    let raw = text(line, tokens, column, label)?;
    raw.parse()
        .map_err(|_| format!("{} is not numeric: '{}'", label, raw))
}

fn timestamp(line: &str, tokens: &[&str], profile: &FormatProfile) -> std::result::Result<NaiveDateTime, String> {
    let year = number(line, tokens, profile.year, "YEAR")?;
    let month = number(line, tokens, profile.month, "MONTH")?;
    let day = number(line, tokens, profile.day, "DAY")?;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| format!("invalid date {:04}-{:02}-{:02}", year, month, day))?;

    let (hour, minute) = match profile.time {
        TimeOfDay::Midnight => (0, 0),
        TimeOfDay::Hhmm(column) => {
            let hhmm = number(line, tokens, column, "TIME")?;
            (hhmm / 100, hhmm % 100)
        }
        TimeOfDay::Hour(column) => (number(line, tokens, column, "HOUR")?, 0),
    };

    date.and_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("invalid time {:02}:{:02}", hour, minute))
}

/// Reads raw station files from disk and decodes them.
pub struct RecordReader {
    use_mmap: bool,
}

impl RecordReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read and decode one station-year file.
    pub fn read_file(&self, path: &Path, profile: &FormatProfile) -> Result<DecodeOutput> {
        let file_station = match profile.station {
            StationSource::FileName => Some(self.station_from_path(path)?),
            StationSource::Columns { .. } => None,
        };

        let output = if self.use_mmap {
            self.read_mmap(path, profile, file_station.as_ref())?
        } else {
            self.read_buffered(path, profile, file_station.as_ref())?
        };

        debug!(
            "Decoded {} records from {}",
            output.records.len(),
            path.display()
        );
        Ok(output)
    }

    /// Extract the station id from names like `725020-14734-2019`.
    pub fn station_from_path(&self, path: &Path) -> Result<StationId> {
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| ProcessingError::InvalidFormat("Invalid file path".to_string()))?;
        StationId::from_file_name(filename)
    }

    fn read_buffered(
        &self,
        path: &Path,
        profile: &FormatProfile,
        file_station: Option<&StationId>,
    ) -> Result<DecodeOutput> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);

        // Raw files are ASCII in practice; stray bytes should not sink the file.
        let lines = reader
            .split(b'\n')
            .map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
            .collect::<std::io::Result<Vec<String>>>()?;

        Ok(decode(lines.iter().map(String::as_str), profile, file_station))
    }

    fn read_mmap(
        &self,
        path: &Path,
        profile: &FormatProfile,
        file_station: Option<&StationId>,
    ) -> Result<DecodeOutput> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(DecodeOutput::default());
        }
        let mmap = unsafe { Mmap::map(&file)? };
        let content = String::from_utf8_lossy(&mmap);

        Ok(decode(content.lines(), profile, file_station))
    }
}

impl Default for RecordReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawField;
    use crate::readers::format_profile::{GSOD, ISD_FULL, ISD_LITE};
    use std::io::Write;
    use tempfile::TempDir;

    const GSOD_HEADER: &str = "STN--- WBAN   YEARMODA    TEMP       DEWP      SLP        STP       VISIB      WDSP     MXSPD   GUST    MAX     MIN   PRCP   SNDP   FRSHTT";
    const GSOD_LINE: &str = "725020 14734  20180101    14.2 24    -1.5 24  1027.9 24  1026.4 24   10.0 24   12.7 24   19.0   26.0    21.0*    9.0*  0.00G 999.9  000000";
    const ISD_FULL_LINE: &str = "0206744860947892018010500514+40639-073762FM-15+0007KJFK V0203401N00411220001CN0160931N5+00561-00831102571ADDAA101000095GF108991081999009001999999MA1102521102401";

    #[test]
    fn test_decode_gsod_line() {
        let output = decode([GSOD_HEADER, GSOD_LINE], &GSOD, None);

        assert!(output.malformed.is_empty());
        assert_eq!(output.records.len(), 1);

        let record = &output.records[0];
        assert_eq!(record.station_id.to_string(), "725020-14734");
        assert_eq!(record.timestamp.to_string(), "2018-01-01 00:00:00");
        assert_eq!(record.value(RawField::Temperature), Some(14.2));
        assert_eq!(record.value(RawField::DewPoint), Some(-1.5));
        assert_eq!(record.value(RawField::SeaLevelPressure), Some(1027.9));
        assert_eq!(record.value(RawField::WindSpeed), Some(12.7));
        assert_eq!(record.value(RawField::MaxTemperature), Some(21.0));
        assert_eq!(record.value(RawField::Precipitation), Some(0.0));
        assert_eq!(record.value(RawField::SnowDepth), None);
        assert_eq!(record.indicators, Some(WeatherIndicators::default()));
    }

    #[test]
    fn test_decode_isd_full_line() {
        let output = decode([ISD_FULL_LINE], &ISD_FULL, None);

        assert!(output.malformed.is_empty(), "{:?}", output.malformed);
        let record = &output.records[0];
        assert_eq!(record.station_id.to_string(), "744860-94789");
        assert_eq!(record.timestamp.to_string(), "2018-01-05 00:51:00");
        assert_eq!(record.value(RawField::WindDirection), Some(340.0));
        assert_eq!(record.value(RawField::WindSpeed), Some(4.1));
        assert_eq!(record.value(RawField::Temperature), Some(5.6));
        assert_eq!(record.value(RawField::DewPoint), Some(-8.3));
        assert_eq!(record.value(RawField::SeaLevelPressure), Some(1025.7));
        assert!(record.additional_data.as_deref().unwrap_or("").contains("GF1"));
    }

    #[test]
    fn test_isd_sentinels_masked_before_scaling() {
        let line = ISD_FULL_LINE
            .replacen("+00561", "+99999", 1)
            .replacen("102571", "999999", 1);
        let output = decode([line.as_str()], &ISD_FULL, None);
        let record = &output.records[0];

        assert_eq!(record.value(RawField::Temperature), None);
        assert_eq!(record.value(RawField::SeaLevelPressure), None);
        assert_eq!(record.value(RawField::DewPoint), Some(-8.3));
    }

    #[test]
    fn test_decode_isd_lite_line() {
        let station: StationId = "725020-14734".parse().unwrap();
        let line = "2019 01 01 00    78   -22 10184   320    51     0     0 -9999";
        let output = decode([line], &ISD_LITE, Some(&station));

        let record = &output.records[0];
        assert_eq!(record.station_id, station);
        assert_eq!(record.timestamp.to_string(), "2019-01-01 00:00:00");
        assert_eq!(record.value(RawField::Temperature), Some(7.8));
        assert_eq!(record.value(RawField::DewPoint), Some(-2.2));
        assert_eq!(record.value(RawField::SeaLevelPressure), Some(1018.4));
        assert_eq!(record.value(RawField::WindDirection), Some(320.0));
        assert_eq!(record.value(RawField::WindSpeed), Some(5.1));
        assert_eq!(record.value(RawField::Precipitation6h), None);
    }

    #[test]
    fn test_empty_and_header_only_input() {
        assert_eq!(decode(std::iter::empty(), &ISD_FULL, None).records.len(), 0);

        let output = decode([GSOD_HEADER], &GSOD, None);
        assert!(output.records.is_empty());
        assert!(output.malformed.is_empty());
    }

    #[test]
    fn test_malformed_lines_collected() {
        let bad_date = ISD_FULL_LINE.replacen("20180105", "20181305", 1);
        let bad_number = ISD_FULL_LINE.replacen("+00561", "+0X561", 1);
        let lines = [ISD_FULL_LINE, "too short", bad_date.as_str(), bad_number.as_str(), ISD_FULL_LINE];

        let output = decode(lines, &ISD_FULL, None);

        assert_eq!(output.records.len(), 2);
        let numbers: Vec<usize> = output.malformed.iter().map(|m| m.line_number).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
        assert!(output.malformed[1].reason.contains("invalid date"));
    }

    #[test]
    fn test_read_file_buffered_and_mmap() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("725020-14734-2019");
        let mut file = File::create(&path)?;
        writeln!(file, "2019 01 01 00    78   -22 10184   320    51     0     0 -9999")?;
        writeln!(file, "2019 01 01 01    72   -28 10188   330    46 -9999 -9999 -9999")?;

        let buffered = RecordReader::new().read_file(&path, &ISD_LITE)?;
        let mapped = RecordReader::with_mmap(true).read_file(&path, &ISD_LITE)?;

        assert_eq!(buffered.records.len(), 2);
        assert_eq!(buffered, mapped);
        assert_eq!(buffered.records[1].station_id.to_string(), "725020-14734");

        Ok(())
    }
}
