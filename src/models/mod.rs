pub mod aggregate;
pub mod metric;
pub mod observation;
pub mod raw_record;
pub mod request;
pub mod station;

pub use aggregate::{DailyAggregate, DegreeDayThresholds, MonthlyAggregate};
pub use metric::{Metric, MetricAccumulator, MetricValues};
pub use observation::{HourlyObservation, Observation};
pub use raw_record::{RawField, RawStationRecord, RawValues, WeatherIndicators};
pub use request::{DataSource, FileType, OutputFormat, StationRequest, StationSelector};
pub use station::{StationId, StationMetadata};
