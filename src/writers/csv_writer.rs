use crate::error::Result;
use crate::writers::table::Table;
use std::path::Path;

/// Write a table as CSV; missing values are empty cells.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.header())?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.key.to_string());
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HourlyObservation, Metric, MetricValues};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_write_hourly_csv() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");

        let ts = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let rows = vec![HourlyObservation::new(
            ts,
            MetricValues::new().with(Metric::TemperatureC, 1.5),
        )];
        let table = Table::hourly(&rows, &[Metric::TemperatureF, Metric::TemperatureC]);

        write_csv(&table, &path)?;

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,TEMP_F,TEMP_C");
        assert_eq!(lines[1], "2018-01-01 00:00:00,,1.5");
        Ok(())
    }
}
