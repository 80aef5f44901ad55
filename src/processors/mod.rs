pub mod aggregator;
pub mod hourly_resampler;
pub mod integrity_checker;
pub mod pipeline;
pub mod unit_converter;

pub use aggregator::{Aggregator, Timestamped};
pub use hourly_resampler::{HourlyResampler, ResampleOutput};
pub use integrity_checker::{
    IntegrityChecker, IntegrityReport, StationYearIntegrity, TemperatureViolation, ViolationType,
};
pub use pipeline::{Pipeline, ProcessedStationYear, StationYear};
pub use unit_converter::convert;
