use chrono::NaiveDateTime;

use super::metric::{Metric, MetricValues};
use super::station::StationId;

/// A record after unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub station_id: StationId,
    pub timestamp: NaiveDateTime,
    pub values: MetricValues,
}

impl Observation {
    pub fn new(station_id: StationId, timestamp: NaiveDateTime, values: MetricValues) -> Self {
        Self {
            station_id,
            timestamp,
            values,
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(metric)
    }
}

/// One row of the hourly grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyObservation {
    pub timestamp: NaiveDateTime,
    pub values: MetricValues,
}

impl HourlyObservation {
    pub fn new(timestamp: NaiveDateTime, values: MetricValues) -> Self {
        Self { timestamp, values }
    }

    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self::new(timestamp, MetricValues::default())
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(metric)
    }
}
