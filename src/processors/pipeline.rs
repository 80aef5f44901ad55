use crate::error::{ProcessingError, Result};
use crate::models::{
    DailyAggregate, DegreeDayThresholds, HourlyObservation, Metric, MonthlyAggregate, StationId,
};
use crate::processors::aggregator::Aggregator;
use crate::processors::hourly_resampler::HourlyResampler;
use crate::processors::integrity_checker::{IntegrityChecker, StationYearIntegrity};
use crate::processors::unit_converter::convert;
use crate::readers::{DecodeOutput, FormatProfile, RecordReader};
use crate::utils::progress::ProgressReporter;
use chrono::Datelike;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// A raw file holding one station's data for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct StationYear {
    pub station_id: StationId,
    pub year: i32,
    pub path: PathBuf,
}

/// Everything produced for one station-year.
#[derive(Debug, Clone)]
pub struct ProcessedStationYear {
    pub station_id: StationId,
    pub year: i32,
    /// Hourly columns, in output order.
    pub metrics: Vec<Metric>,
    /// Empty for daily-resolution products.
    pub hourly: Vec<HourlyObservation>,
    pub daily: Vec<DailyAggregate>,
    pub monthly: Vec<MonthlyAggregate>,
    pub integrity: StationYearIntegrity,
}

impl ProcessedStationYear {
    pub fn has_hourly(&self) -> bool {
        !self.hourly.is_empty()
    }

    /// Columns that survive daily/monthly aggregation.
    pub fn aggregate_metrics(&self) -> Vec<Metric> {
        self.metrics
            .iter()
            .copied()
            .filter(|m| !m.is_directional())
            .collect()
    }
}

/// Decode → convert → resample → aggregate, per station-year.
pub struct Pipeline {
    max_workers: usize,
    thresholds: DegreeDayThresholds,
    current_year: Option<i32>,
    use_mmap: bool,
}

impl Pipeline {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            thresholds: DegreeDayThresholds::default(),
            current_year: None,
            use_mmap: false,
        }
    }

    pub fn with_thresholds(mut self, thresholds: DegreeDayThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_current_year(mut self, current_year: i32) -> Self {
        self.current_year = Some(current_year);
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    fn resampler(&self, year: i32, metrics: &[Metric]) -> HourlyResampler {
        let resampler = HourlyResampler::new(year).with_metrics(metrics);
        match self.current_year {
            Some(current) => resampler.with_current_year(current),
            None => resampler,
        }
    }

    /// Run the in-memory stages on an already decoded file.
    pub fn process_decoded(
        &self,
        station_id: &StationId,
        year: i32,
        decoded: &DecodeOutput,
        profile: &FormatProfile,
    ) -> Result<ProcessedStationYear> {
        let aggregator = Aggregator::with_thresholds(self.thresholds);
        let checker = IntegrityChecker::new();

        let observations: Vec<_> = convert(&decoded.records, profile)
            .into_iter()
            .filter(|o| o.timestamp.year() == year)
            .collect();

        if profile.is_daily() {
            if observations.is_empty() {
                return Err(ProcessingError::MissingData(format!(
                    "no {} observations for {} in {}",
                    profile.name, station_id, year
                )));
            }

            let daily = aggregator.aggregate_daily(&observations);
            let monthly = aggregator.aggregate_monthly(&observations, &daily);
            let integrity = checker.check_station_year(station_id, year, decoded, &observations, None);

            return Ok(ProcessedStationYear {
                station_id: station_id.clone(),
                year,
                metrics: profile.metrics.to_vec(),
                hourly: Vec::new(),
                daily,
                monthly,
                integrity,
            });
        }

        let resampled = self.resampler(year, profile.metrics).resample(&observations)?;
        let daily = aggregator.aggregate_daily(&resampled.rows);
        let monthly = aggregator.aggregate_monthly(&resampled.rows, &daily);
        let integrity = checker.check_station_year(station_id, year, decoded, &observations, Some(&resampled));

        Ok(ProcessedStationYear {
            station_id: station_id.clone(),
            year,
            metrics: profile.metrics.to_vec(),
            hourly: resampled.rows,
            daily,
            monthly,
            integrity,
        })
    }

    /// Aggregate an hourly series that is already on a regular grid (TMY files).
    pub fn process_hourly(
        &self,
        station_id: &StationId,
        year: i32,
        hourly: Vec<HourlyObservation>,
        metrics: &[Metric],
    ) -> Result<ProcessedStationYear> {
        if hourly.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "no hourly rows for {}",
                station_id
            )));
        }

        let aggregator = Aggregator::with_thresholds(self.thresholds);
        let daily = aggregator.aggregate_daily(&hourly);
        let monthly = aggregator.aggregate_monthly(&hourly, &daily);

        let mut integrity = StationYearIntegrity::new(station_id.clone(), year);
        integrity.lines_read = hourly.len();
        integrity.decoded_records = hourly.len();
        integrity.observed_hours = hourly.len();

        Ok(ProcessedStationYear {
            station_id: station_id.clone(),
            year,
            metrics: metrics.to_vec(),
            hourly,
            daily,
            monthly,
            integrity,
        })
    }

    /// Read one raw file and process it.
    pub fn process_file(&self, input: &StationYear, profile: &FormatProfile) -> Result<ProcessedStationYear> {
        let reader = RecordReader::with_mmap(self.use_mmap);
        let decoded = reader.read_file(&input.path, profile)?;
        self.process_decoded(&input.station_id, input.year, &decoded, profile)
    }

    /// Process station-years in parallel. A failure affects only its own entry.
    pub fn process_all(
        &self,
        inputs: &[StationYear],
        profile: &FormatProfile,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<(StationYear, Result<ProcessedStationYear>)>> {
        let processed_count = AtomicUsize::new(0);

        if let Some(p) = progress {
            p.set_message(&format!("Processing {} station-years...", inputs.len()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let results: Vec<(StationYear, Result<ProcessedStationYear>)> = pool.install(|| {
            inputs
                .par_iter()
                .map(|input| {
                    let result = self.process_file(input, profile);
                    match &result {
                        Ok(processed) => debug!(
                            "Processed {} {}: {} hourly, {} daily rows",
                            input.station_id,
                            input.year,
                            processed.hourly.len(),
                            processed.daily.len()
                        ),
                        Err(e) => warn!("Failed to process {}: {}", input.path.display(), e),
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    (input.clone(), result)
                })
                .collect()
        });

        if let Some(p) = progress {
            p.finish_with_message(&format!("Processed {} station-years", inputs.len()));
        }

        Ok(results)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValues;
    use crate::readers::epw_reader::TMY_REFERENCE_YEAR;
    use crate::readers::{decode, GSOD, ISD_LITE, TMY_METRICS};
    use chrono::{Duration, NaiveDate};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_isd_lite_file_to_aggregates() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("725020-14734-2018");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "2018 01 01 00   100    50 10184   320    51     0     0 -9999")?;
        writeln!(file, "2018 01 01 04   140    50 10184   320    51     0     0 -9999")?;
        writeln!(file, "2018 12 31 23    20   -10 10184   320    51     0     0 -9999")?;
        writeln!(file, "garbage")?;

        let input = StationYear {
            station_id: "725020-14734".parse()?,
            year: 2018,
            path,
        };
        let pipeline = Pipeline::new(2).with_current_year(2024);
        let results = pipeline.process_all(std::slice::from_ref(&input), &ISD_LITE, None)?;

        let processed = results[0].1.as_ref().unwrap();
        assert_eq!(processed.hourly.len(), 8760);
        assert_eq!(processed.daily.len(), 365);
        assert_eq!(processed.monthly.len(), 12);
        assert_eq!(processed.integrity.malformed_lines, 1);
        assert_eq!(processed.hourly[2].value(Metric::TemperatureC), Some(12.0));
        assert!(processed.daily.iter().all(|d| d.hdd.unwrap() >= 0.0 && d.cdd.unwrap() >= 0.0));

        Ok(())
    }

    #[test]
    fn test_gsod_skips_resampling() {
        let header = "STN--- WBAN   YEARMODA    TEMP       DEWP      SLP        STP       VISIB      WDSP     MXSPD   GUST    MAX     MIN   PRCP   SNDP   FRSHTT";
        let day1 = "725020 14734  20180101    14.2 24    -1.5 24  1027.9 24  1026.4 24   10.0 24   12.7 24   19.0   26.0    21.0*    9.0*  0.00G 999.9  000000";
        let day2 = day1
            .replacen("20180101", "20180102", 1)
            .replacen("  14.2", "  75.0", 1)
            .replacen("  000000", "  010010", 1);

        let decoded = decode([header, day1, day2.as_str()], &GSOD, None);
        let station: StationId = "725020-14734".parse().unwrap();
        let processed = Pipeline::new(1)
            .process_decoded(&station, 2018, &decoded, &GSOD)
            .unwrap();

        assert!(!processed.has_hourly());
        assert_eq!(processed.daily.len(), 2);
        assert!((processed.daily[0].hdd.unwrap() - 50.8).abs() < 1e-9);
        assert!((processed.daily[1].cdd.unwrap() - 10.0).abs() < 1e-9);
        assert!((processed.monthly[0].hdd - 50.8).abs() < 1e-9);
        assert!((processed.monthly[0].cdd - 10.0).abs() < 1e-9);

        assert_eq!(processed.daily[1].value(Metric::Thunder), Some(1.0));
        assert_eq!(processed.monthly[0].value(Metric::Thunder), Some(0.5));
        assert_eq!(processed.monthly[0].value(Metric::Fog), Some(0.0));
        assert!(processed.aggregate_metrics().contains(&Metric::RainOrDrizzle));
    }

    #[test]
    fn test_tmy_series_keeps_epw_columns() {
        let station: StationId = "744860-99999".parse().unwrap();
        let start = NaiveDate::from_ymd_opt(TMY_REFERENCE_YEAR, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let hourly: Vec<HourlyObservation> = (0..48)
            .map(|h| {
                HourlyObservation::new(
                    start + Duration::hours(h),
                    MetricValues::new()
                        .with(Metric::TemperatureC, 10.0)
                        .with(Metric::TemperatureF, 50.0)
                        .with(Metric::WindDirection, 180.0),
                )
            })
            .collect();

        let processed = Pipeline::new(1)
            .process_hourly(&station, TMY_REFERENCE_YEAR, hourly, &TMY_METRICS)
            .unwrap();

        assert_eq!(processed.metrics, TMY_METRICS.to_vec());
        assert_eq!(processed.daily.len(), 2);
        assert_eq!(processed.daily[0].hdd, Some(15.0));
        assert_eq!(processed.monthly[0].hdd, 30.0);
        assert!(!processed.aggregate_metrics().contains(&Metric::WindDirection));
        assert_eq!(processed.integrity.observed_hours, 48);
    }

    #[test]
    fn test_wrong_year_is_missing_data() {
        let station: StationId = "725020-14734".parse().unwrap();
        let result = Pipeline::new(1).process_decoded(&station, 2018, &DecodeOutput::default(), &ISD_LITE);
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }
}
