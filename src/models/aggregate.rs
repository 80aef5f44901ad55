use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::metric::{Metric, MetricValues};

pub const DEFAULT_DEGREE_DAY_BASE_F: f64 = 65.0;

/// Heating/cooling base temperatures in °F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct DegreeDayThresholds {
    #[validate(range(min = -100.0, max = 150.0))]
    pub heating_f: f64,

    #[validate(range(min = -100.0, max = 150.0))]
    pub cooling_f: f64,
}

impl Default for DegreeDayThresholds {
    fn default() -> Self {
        Self {
            heating_f: DEFAULT_DEGREE_DAY_BASE_F,
            cooling_f: DEFAULT_DEGREE_DAY_BASE_F,
        }
    }
}

impl DegreeDayThresholds {
    pub fn new(heating_f: f64, cooling_f: f64) -> Self {
        Self {
            heating_f,
            cooling_f,
        }
    }

    pub fn heating_degree_days(&self, mean_temp_f: f64) -> f64 {
        (self.heating_f - mean_temp_f).max(0.0)
    }

    pub fn cooling_degree_days(&self, mean_temp_f: f64) -> f64 {
        (mean_temp_f - self.cooling_f).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub values: MetricValues,
    pub hdd: Option<f64>,
    pub cdd: Option<f64>,
}

impl DailyAggregate {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(metric)
    }
}

/// Keyed by the first day of the month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub month: NaiveDate,
    pub values: MetricValues,
    pub hdd: f64,
    pub cdd: f64,
}

impl MonthlyAggregate {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_days_never_negative() {
        let thresholds = DegreeDayThresholds::default();

        assert_eq!(thresholds.heating_degree_days(50.0), 15.0);
        assert_eq!(thresholds.cooling_degree_days(50.0), 0.0);
        assert_eq!(thresholds.heating_degree_days(80.0), 0.0);
        assert_eq!(thresholds.cooling_degree_days(80.0), 15.0);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(DegreeDayThresholds::new(65.0, 70.0).validate().is_ok());
        assert!(DegreeDayThresholds::new(500.0, 70.0).validate().is_err());
    }
}
