use crate::models::{Metric, Observation, StationId};
use crate::processors::hourly_resampler::ResampleOutput;
use crate::readers::{DecodeOutput, MalformedLine};
use chrono::NaiveDateTime;

/// Plausible bounds for air temperature in °C.
pub const MIN_VALID_TEMP_C: f64 = -90.0;
pub const MAX_VALID_TEMP_C: f64 = 60.0;

const MALFORMED_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureViolation {
    pub timestamp: NaiveDateTime,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationType {
    OutOfRange,
    SuspiciousJump,
}

/// Data quality of one processed station-year.
#[derive(Debug, Clone, PartialEq)]
pub struct StationYearIntegrity {
    pub station_id: StationId,
    pub year: i32,
    pub lines_read: usize,
    pub decoded_records: usize,
    pub malformed_lines: usize,
    pub malformed_sample: Vec<MalformedLine>,
    pub observed_hours: usize,
    pub filled_hours: usize,
    pub empty_metrics: Vec<Metric>,
    pub temperature_violations: Vec<TemperatureViolation>,
}

impl StationYearIntegrity {
    pub fn new(station_id: StationId, year: i32) -> Self {
        Self {
            station_id,
            year,
            lines_read: 0,
            decoded_records: 0,
            malformed_lines: 0,
            malformed_sample: Vec::new(),
            observed_hours: 0,
            filled_hours: 0,
            empty_metrics: Vec::new(),
            temperature_violations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    pub station_years: Vec<StationYearIntegrity>,
}

impl IntegrityReport {
    pub fn push(&mut self, entry: StationYearIntegrity) {
        self.station_years.push(entry);
    }

    pub fn total_lines(&self) -> usize {
        self.station_years.iter().map(|s| s.lines_read).sum()
    }

    pub fn total_malformed(&self) -> usize {
        self.station_years.iter().map(|s| s.malformed_lines).sum()
    }

    pub fn total_filled_hours(&self) -> usize {
        self.station_years.iter().map(|s| s.filled_hours).sum()
    }

    pub fn total_violations(&self) -> usize {
        self.station_years
            .iter()
            .map(|s| s.temperature_violations.len())
            .sum()
    }
}

pub struct IntegrityChecker {
    temperature_jump_threshold: f64,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            temperature_jump_threshold: 20.0, // °C between consecutive reports
        }
    }

    pub fn with_jump_threshold(temperature_jump_threshold: f64) -> Self {
        Self {
            temperature_jump_threshold,
        }
    }

    /// Assess one station-year from its decode result, converted observations
    /// and, for hourly products, the resampled series.
    pub fn check_station_year(
        &self,
        station_id: &StationId,
        year: i32,
        decoded: &DecodeOutput,
        observations: &[Observation],
        resampled: Option<&ResampleOutput>,
    ) -> StationYearIntegrity {
        let mut entry = StationYearIntegrity::new(station_id.clone(), year);
        entry.lines_read = decoded.lines_read;
        entry.decoded_records = decoded.records.len();
        entry.malformed_lines = decoded.malformed.len();
        entry.malformed_sample = decoded
            .malformed
            .iter()
            .take(MALFORMED_SAMPLE_SIZE)
            .cloned()
            .collect();

        if let Some(resampled) = resampled {
            entry.observed_hours = resampled.observed_hours;
            entry.filled_hours = resampled.filled_hours;
            entry.empty_metrics = resampled.empty_metrics.clone();
        }

        entry.temperature_violations = self.check_temperatures(observations);
        entry
    }

    fn check_temperatures(&self, observations: &[Observation]) -> Vec<TemperatureViolation> {
        let mut violations = Vec::new();
        let mut previous: Option<(NaiveDateTime, f64)> = None;

        for obs in observations {
            let Some(temp) = obs.value(Metric::TemperatureC) else {
                continue;
            };

            if !(MIN_VALID_TEMP_C..=MAX_VALID_TEMP_C).contains(&temp) {
                violations.push(TemperatureViolation {
                    timestamp: obs.timestamp,
                    violation_type: ViolationType::OutOfRange,
                    details: format!(
                        "temperature {:.1}°C is outside valid range [{}, {}]",
                        temp, MIN_VALID_TEMP_C, MAX_VALID_TEMP_C
                    ),
                });
            }

            if let Some((prev_time, prev_temp)) = previous {
                let jump = (temp - prev_temp).abs();
                if jump > self.temperature_jump_threshold {
                    violations.push(TemperatureViolation {
                        timestamp: obs.timestamp,
                        violation_type: ViolationType::SuspiciousJump,
                        details: format!("temperature jumped {:.1}°C since {}", jump, prev_time),
                    });
                }
            }
            previous = Some((obs.timestamp, temp));
        }

        violations
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Station-years: {}\n", report.station_years.len()));
        summary.push_str(&format!("Lines read: {}\n", report.total_lines()));
        summary.push_str(&format!(
            "Malformed lines: {} ({:.2}%)\n",
            report.total_malformed(),
            percentage(report.total_malformed(), report.total_lines())
        ));
        summary.push_str(&format!("Filled hours: {}\n", report.total_filled_hours()));
        summary.push_str(&format!(
            "Temperature violations: {}\n",
            report.total_violations()
        ));

        for entry in &report.station_years {
            summary.push_str(&format!(
                "\n{} {}: {} records, {} malformed, {} observed / {} filled hours\n",
                entry.station_id,
                entry.year,
                entry.decoded_records,
                entry.malformed_lines,
                entry.observed_hours,
                entry.filled_hours
            ));

            if !entry.empty_metrics.is_empty() {
                let names: Vec<&str> = entry.empty_metrics.iter().map(|m| m.column_name()).collect();
                summary.push_str(&format!("  No data: {}\n", names.join(", ")));
            }

            for line in &entry.malformed_sample {
                summary.push_str(&format!("  line {}: {}\n", line.line_number, line.reason));
            }

            for violation in entry.temperature_violations.iter().take(10) {
                summary.push_str(&format!("  {}: {}\n", violation.timestamp, violation.details));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
