use crate::models::{
    DailyAggregate, DegreeDayThresholds, HourlyObservation, Metric, MetricAccumulator, MetricValues,
    MonthlyAggregate, Observation,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Rows the aggregator can group by calendar period.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;
    fn values(&self) -> &MetricValues;
}

impl Timestamped for HourlyObservation {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn values(&self) -> &MetricValues {
        &self.values
    }
}

impl Timestamped for Observation {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn values(&self) -> &MetricValues {
        &self.values
    }
}

pub struct Aggregator {
    thresholds: DegreeDayThresholds,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            thresholds: DegreeDayThresholds::default(),
        }
    }

    pub fn with_thresholds(thresholds: DegreeDayThresholds) -> Self {
        Self { thresholds }
    }

    /// Mean per calendar date with degree days from the mean °F.
    ///
    /// Works on hourly rows, or directly on daily-resolution observations.
    pub fn aggregate_daily<T: Timestamped>(&self, rows: &[T]) -> Vec<DailyAggregate> {
        let mut days: BTreeMap<NaiveDate, MetricAccumulator> = BTreeMap::new();
        for row in rows {
            days.entry(row.timestamp().date()).or_default().add(row.values());
        }

        days.into_iter()
            .map(|(date, acc)| {
                let values = drop_directional(acc.mean());
                let mean_f = values.get(Metric::TemperatureF);
                DailyAggregate {
                    date,
                    values,
                    hdd: mean_f.map(|t| self.thresholds.heating_degree_days(t)),
                    cdd: mean_f.map(|t| self.thresholds.cooling_degree_days(t)),
                }
            })
            .collect()
    }

    /// Mean of `rows` per month, with the month's summed daily degree days.
    pub fn aggregate_monthly<T: Timestamped>(&self, rows: &[T], daily: &[DailyAggregate]) -> Vec<MonthlyAggregate> {
        let mut months: BTreeMap<NaiveDate, MetricAccumulator> = BTreeMap::new();
        for row in rows {
            if let Some(month) = month_start(row.timestamp().date()) {
                months.entry(month).or_default().add(row.values());
            }
        }

        let mut degree_days: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
        for day in daily {
            if let Some(month) = month_start(day.date) {
                let entry = degree_days.entry(month).or_insert((0.0, 0.0));
                entry.0 += day.hdd.unwrap_or(0.0);
                entry.1 += day.cdd.unwrap_or(0.0);
            }
        }

        let mut keys: Vec<NaiveDate> = months.keys().chain(degree_days.keys()).copied().collect();
        keys.sort();
        keys.dedup();

        keys.into_iter()
            .map(|month| {
                let values = months
                    .get(&month)
                    .map(|acc| drop_directional(acc.mean()))
                    .unwrap_or_default();
                let (hdd, cdd) = degree_days.get(&month).copied().unwrap_or((0.0, 0.0));
                MonthlyAggregate {
                    month,
                    values,
                    hdd,
                    cdd,
                }
            })
            .collect()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn drop_directional(mut values: MetricValues) -> MetricValues {
    for metric in Metric::ALL.into_iter().filter(|m| m.is_directional()) {
        values.set(metric, None);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hourly(month: u32, day: u32, hour: u32, temp_f: f64) -> HourlyObservation {
        HourlyObservation::new(
            NaiveDate::from_ymd_opt(2018, month, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            MetricValues::new()
                .with(Metric::TemperatureF, temp_f)
                .with(Metric::WindDirection, 270.0)
                .with(Metric::WindSpeedMs, 3.0),
        )
    }

    #[test]
    fn test_daily_mean_and_degree_days() {
        let rows = vec![
            hourly(1, 1, 0, 40.0),
            hourly(1, 1, 12, 50.0),
            hourly(1, 2, 0, 70.0),
            hourly(1, 2, 12, 80.0),
        ];
        let daily = Aggregator::new().aggregate_daily(&rows);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].value(Metric::TemperatureF), Some(45.0));
        assert_eq!(daily[0].hdd, Some(20.0));
        assert_eq!(daily[0].cdd, Some(0.0));
        assert_eq!(daily[1].hdd, Some(0.0));
        assert_eq!(daily[1].cdd, Some(10.0));

        // Directional metrics have no meaningful mean.
        assert_eq!(daily[0].value(Metric::WindDirection), None);
        assert_eq!(daily[0].value(Metric::WindSpeedMs), Some(3.0));
    }

    #[test]
    fn test_custom_thresholds() {
        let rows = vec![hourly(6, 1, 0, 60.0)];
        let daily = Aggregator::with_thresholds(DegreeDayThresholds::new(55.0, 58.0)).aggregate_daily(&rows);
        assert_eq!(daily[0].hdd, Some(0.0));
        assert_eq!(daily[0].cdd, Some(2.0));
    }

    #[test]
    fn test_monthly_sums_daily_degree_days() {
        let rows: Vec<HourlyObservation> = (1..=31)
            .chain(1..=28)
            .enumerate()
            .map(|(i, day)| hourly(if i < 31 { 1 } else { 2 }, day, 6, 30.0 + (i % 10) as f64))
            .collect();

        let aggregator = Aggregator::new();
        let daily = aggregator.aggregate_daily(&rows);
        let monthly = aggregator.aggregate_monthly(&rows, &daily);

        assert_eq!(monthly.len(), 2);
        for month in &monthly {
            let expected: f64 = daily
                .iter()
                .filter(|d| d.date.month() == month.month.month())
                .filter_map(|d| d.hdd)
                .sum();
            assert!((month.hdd - expected).abs() < 1e-9);
            assert!(month.hdd >= 0.0 && month.cdd >= 0.0);
        }
        assert_eq!(monthly[0].month, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(monthly[1].value(Metric::WindDirection), None);
    }
}
