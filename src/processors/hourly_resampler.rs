use crate::error::{ProcessingError, Result};
use crate::models::{HourlyObservation, Metric, MetricAccumulator, MetricValues, Observation};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Metrics that must be fully populated after gap filling.
pub const REQUIRED_METRICS: [Metric; 3] = [Metric::TemperatureC, Metric::TemperatureF, Metric::DewPointC];

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleOutput {
    pub rows: Vec<HourlyObservation>,
    /// Grid hours that had at least one observation.
    pub observed_hours: usize,
    /// Grid hours that were created empty and filled.
    pub filled_hours: usize,
    /// Expected metrics with no observation in the whole year.
    pub empty_metrics: Vec<Metric>,
}

/// Builds a regular hourly series for one year.
pub struct HourlyResampler {
    target_year: i32,
    current_year: i32,
    metrics: Vec<Metric>,
}

impl HourlyResampler {
    pub fn new(target_year: i32) -> Self {
        Self {
            target_year,
            current_year: Local::now().year(),
            metrics: Metric::ALL.to_vec(),
        }
    }

    /// Override "this year", which decides between a partial and a full grid.
    pub fn with_current_year(mut self, current_year: i32) -> Self {
        self.current_year = current_year;
        self
    }

    /// Restrict the series to the metrics a profile produces.
    pub fn with_metrics(mut self, metrics: &[Metric]) -> Self {
        self.metrics = metrics.to_vec();
        self
    }

    pub fn resample(&self, observations: &[Observation]) -> Result<ResampleOutput> {
        let mut hours: BTreeMap<NaiveDateTime, MetricAccumulator> = BTreeMap::new();
        for obs in observations.iter().filter(|o| o.timestamp.year() == self.target_year) {
            hours
                .entry(truncate_to_hour(obs.timestamp))
                .or_default()
                .add(&obs.values);
        }

        let (first, last) = match (hours.keys().next(), hours.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(ProcessingError::MissingData(format!(
                    "no observations in {}",
                    self.target_year
                )))
            }
        };

        let (start, end) = if first.year() == self.current_year {
            (first, last)
        } else {
            year_bounds(self.target_year)?
        };

        let mut rows = Vec::with_capacity((end - start).num_hours() as usize + 1);
        let mut observed_hours = 0;
        let mut timestamp = start;
        while timestamp <= end {
            let row = match hours.get(&timestamp) {
                Some(acc) => {
                    observed_hours += 1;
                    HourlyObservation::new(timestamp, self.restrict(acc))
                }
                None => HourlyObservation::empty(timestamp),
            };
            rows.push(row);
            timestamp += Duration::hours(1);
        }
        let filled_hours = rows.len() - observed_hours;

        let mut empty_metrics = Vec::new();
        for &metric in &self.metrics {
            if !fill_metric(&mut rows, metric) {
                empty_metrics.push(metric);
            }
        }

        if let Some(missing) = REQUIRED_METRICS
            .iter()
            .find(|m| self.metrics.contains(m) && empty_metrics.contains(m))
        {
            return Err(ProcessingError::MissingData(format!(
                "{} has no observations in {}",
                missing, self.target_year
            )));
        }

        if !empty_metrics.is_empty() {
            let names: Vec<&str> = empty_metrics.iter().map(|m| m.column_name()).collect();
            warn!("No data in {} for: {}", self.target_year, names.join(", "));
        }

        debug!(
            "Resampled {} to {} hourly rows ({} filled)",
            self.target_year,
            rows.len(),
            filled_hours
        );

        Ok(ResampleOutput {
            rows,
            observed_hours,
            filled_hours,
            empty_metrics,
        })
    }

    fn restrict(&self, acc: &MetricAccumulator) -> MetricValues {
        let mean = acc.mean();
        let mut values = MetricValues::default();
        for &metric in &self.metrics {
            values.set(metric, mean.get(metric));
        }
        values
    }
}

fn truncate_to_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp.date().and_time(NaiveTime::default()) + Duration::hours(timestamp.hour() as i64)
}

/// First and last hour of `year`.
pub fn year_bounds(year: i32) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("invalid year {}", year)))?;
    let next = NaiveDate::from_ymd_opt(year + 1, 1, 1)
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("invalid year {}", year + 1)))?;

    let start = start.and_time(NaiveTime::default());
    let end = next.and_time(NaiveTime::default()) - Duration::hours(1);
    Ok((start, end))
}

/// Interpolate interior gaps, then forward- and back-fill the edges.
/// Returns false when the metric has no value at all.
fn fill_metric(rows: &mut [HourlyObservation], metric: Metric) -> bool {
    let known: Vec<(usize, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.value(metric).map(|v| (i, v)))
        .collect();

    let (Some(&(first_index, first_value)), Some(&(last_index, last_value))) = (known.first(), known.last()) else {
        return false;
    };

    for pair in known.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        let span = (i1 - i0) as f64;
        for (offset, row) in rows[i0 + 1..i1].iter_mut().enumerate() {
            let fraction = (offset + 1) as f64 / span;
            row.values.set(metric, Some(v0 + (v1 - v0) * fraction));
        }
    }

    for row in &mut rows[last_index + 1..] {
        row.values.set(metric, Some(last_value));
    }
    for row in &mut rows[..first_index] {
        row.values.set(metric, Some(first_value));
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obs(month: u32, day: u32, hour: u32, minute: u32, temp_c: f64) -> Observation {
        Observation::new(
            "744860-94789".parse().unwrap(),
            NaiveDate::from_ymd_opt(2018, month, day)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
            MetricValues::new()
                .with(Metric::TemperatureC, temp_c)
                .with(Metric::TemperatureF, temp_c * 1.8 + 32.0)
                .with(Metric::DewPointC, temp_c - 5.0),
        )
    }

    fn resampler(year: i32) -> HourlyResampler {
        HourlyResampler::new(year)
            .with_current_year(2024)
            .with_metrics(&[
                Metric::TemperatureF,
                Metric::TemperatureC,
                Metric::DewPointC,
                Metric::RelativeHumidity,
            ])
    }

    #[test]
    fn test_hourly_mean_is_arithmetic() {
        let mut north = obs(1, 5, 1, 10, 10.0);
        north.values.set(Metric::WindDirection, Some(350.0));
        let mut east = obs(1, 5, 1, 40, 12.0);
        east.values.set(Metric::WindDirection, Some(10.0));

        let output = resampler(2018)
            .with_metrics(&[Metric::TemperatureC, Metric::WindDirection])
            .resample(&[north, east])
            .unwrap();

        let row = &output.rows[4 * 24 + 1];
        assert_eq!(row.value(Metric::TemperatureC), Some(11.0));
        assert_eq!(row.value(Metric::WindDirection), Some(180.0));
    }

    #[test]
    fn test_full_year_grid() {
        let output = resampler(2018).resample(&[obs(1, 5, 1, 0, 10.0)]).unwrap();
        assert_eq!(output.rows.len(), 8760);
        assert_eq!(output.observed_hours, 1);
        assert_eq!(output.filled_hours, 8759);

        let output = HourlyResampler::new(2020)
            .with_current_year(2024)
            .resample(&[Observation::new(
                "744860-94789".parse().unwrap(),
                NaiveDate::from_ymd_opt(2020, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap(),
                MetricValues::new()
                    .with(Metric::TemperatureC, 20.0)
                    .with(Metric::TemperatureF, 68.0)
                    .with(Metric::DewPointC, 10.0),
            )])
            .unwrap();
        assert_eq!(output.rows.len(), 8784);
    }

    #[test]
    fn test_interior_gap_interpolated() {
        let observations = vec![obs(1, 5, 1, 0, 10.0), obs(1, 5, 5, 0, 14.0)];
        let output = resampler(2018).resample(&observations).unwrap();

        let jan5 = NaiveDate::from_ymd_opt(2018, 1, 5).unwrap();
        let temps: Vec<Option<f64>> = (1..=5)
            .map(|h| {
                let ts = jan5.and_hms_opt(h, 0, 0).unwrap();
                output
                    .rows
                    .iter()
                    .find(|r| r.timestamp == ts)
                    .and_then(|r| r.value(Metric::TemperatureC))
            })
            .collect();
        assert_eq!(temps, vec![Some(10.0), Some(11.0), Some(12.0), Some(13.0), Some(14.0)]);

        // Edges take the nearest known value.
        assert_eq!(output.rows[0].value(Metric::TemperatureC), Some(10.0));
        assert_eq!(output.rows.last().unwrap().value(Metric::TemperatureC), Some(14.0));
    }

    #[test]
    fn test_same_hour_averaged_and_sorted() {
        let observations = vec![obs(3, 1, 6, 51, 4.0), obs(3, 1, 6, 10, 2.0), obs(2, 1, 0, 0, 0.0)];
        let output = resampler(2018).resample(&observations).unwrap();

        let ts = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
        let row = output.rows.iter().find(|r| r.timestamp == ts).unwrap();
        assert_eq!(row.value(Metric::TemperatureC), Some(3.0));
        assert!(output.rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_required_metrics_complete_and_empty_reported() {
        let output = resampler(2018).resample(&[obs(7, 1, 12, 0, 25.0)]).unwrap();
        for metric in REQUIRED_METRICS {
            assert!(output.rows.iter().all(|r| r.value(metric).is_some()));
        }
        assert_eq!(output.empty_metrics, vec![Metric::RelativeHumidity]);
    }

    #[test]
    fn test_partial_current_year() {
        let observations = vec![obs(1, 1, 0, 0, 1.0), obs(1, 2, 23, 0, 2.0)];
        let output = resampler(2018)
            .with_current_year(2018)
            .resample(&observations)
            .unwrap();
        assert_eq!(output.rows.len(), 48);
    }

    #[test]
    fn test_other_years_dropped_and_empty_rejected() {
        let observations = vec![obs(1, 1, 0, 0, 1.0)];
        assert!(matches!(
            resampler(2019).resample(&observations),
            Err(ProcessingError::MissingData(_))
        ));
        assert!(resampler(2018).resample(&[]).is_err());
    }
}
