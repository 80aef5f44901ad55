use crate::error::Result;
use crate::writers::table::{Table, TableRow};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

struct JsonRow<'a> {
    table: &'a Table,
    row: &'a TableRow,
}

// Entries are emitted in column order.
impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.columns.len() + 1))?;
        map.serialize_entry(self.table.key_name, &self.row.key.to_string())?;
        for (column, value) in self.table.columns.iter().zip(&self.row.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

struct JsonTable<'a>(&'a Table);

impl Serialize for JsonTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&JsonRow { table: self.0, row })?;
        }
        seq.end()
    }
}

/// Write a table as a JSON array of row objects; missing values are `null`.
pub fn write_json(table: &Table, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &JsonTable(table))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricValues, Metric, MonthlyAggregate};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_write_monthly_json() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.json");

        let month = MonthlyAggregate {
            month: NaiveDate::from_ymd_opt(2018, 2, 1).unwrap(),
            values: MetricValues::new().with(Metric::TemperatureF, 30.0),
            hdd: 980.0,
            cdd: 0.0,
        };
        let table = Table::monthly(&[month], &[Metric::TemperatureF, Metric::TemperatureC]);
        write_json(&table, &path)?;

        let content = std::fs::read_to_string(&path)?;
        let parsed: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(parsed[0]["date"], "2018-02-01");
        assert_eq!(parsed[0]["TEMP_F"], 30.0);
        assert!(parsed[0]["TEMP_C"].is_null());
        assert_eq!(parsed[0]["HDD_F"], 980.0);

        // Keys keep column order.
        let date_at = content.find("\"date\"").unwrap();
        let temp_at = content.find("\"TEMP_F\"").unwrap();
        let hdd_at = content.find("\"HDD_F\"").unwrap();
        assert!(date_at < temp_at && temp_at < hdd_at);
        Ok(())
    }
}
