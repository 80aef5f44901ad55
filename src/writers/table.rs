use crate::models::{DailyAggregate, HourlyObservation, Metric, MonthlyAggregate};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

pub const HDD_COLUMN: &str = "HDD_F";
pub const CDD_COLUMN: &str = "CDD_F";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
}

impl Granularity {
    pub fn name(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKey {
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            RowKey::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub key: RowKey,
    pub values: Vec<Option<f64>>,
}

/// A granularity's rows flattened into ordered columns, shared by every
/// tabular writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub granularity: Granularity,
    pub key_name: &'static str,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn hourly(rows: &[HourlyObservation], metrics: &[Metric]) -> Self {
        Self {
            granularity: Granularity::Hourly,
            key_name: "timestamp",
            columns: metrics.iter().map(|m| m.column_name().to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| TableRow {
                    key: RowKey::Timestamp(row.timestamp),
                    values: metrics.iter().map(|&m| row.value(m)).collect(),
                })
                .collect(),
        }
    }

    /// `metrics` should already exclude directional quantities.
    pub fn daily(rows: &[DailyAggregate], metrics: &[Metric]) -> Self {
        Self {
            granularity: Granularity::Daily,
            key_name: "date",
            columns: Self::aggregate_columns(metrics),
            rows: rows
                .iter()
                .map(|row| {
                    let mut values: Vec<Option<f64>> = metrics.iter().map(|&m| row.value(m)).collect();
                    values.push(row.hdd);
                    values.push(row.cdd);
                    TableRow {
                        key: RowKey::Date(row.date),
                        values,
                    }
                })
                .collect(),
        }
    }

    pub fn monthly(rows: &[MonthlyAggregate], metrics: &[Metric]) -> Self {
        Self {
            granularity: Granularity::Monthly,
            key_name: "date",
            columns: Self::aggregate_columns(metrics),
            rows: rows
                .iter()
                .map(|row| {
                    let mut values: Vec<Option<f64>> = metrics.iter().map(|&m| row.value(m)).collect();
                    values.push(Some(row.hdd));
                    values.push(Some(row.cdd));
                    TableRow {
                        key: RowKey::Date(row.month),
                        values,
                    }
                })
                .collect(),
        }
    }

    fn aggregate_columns(metrics: &[Metric]) -> Vec<String> {
        metrics
            .iter()
            .map(|m| m.column_name().to_string())
            .chain([HDD_COLUMN.to_string(), CDD_COLUMN.to_string()])
            .collect()
    }

    /// Header row including the key column.
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(self.key_name)
            .chain(self.columns.iter().map(String::as_str))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValues;

    #[test]
    fn test_daily_columns_end_with_degree_days() {
        let day = DailyAggregate {
            date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            values: MetricValues::new().with(Metric::TemperatureF, 40.0),
            hdd: Some(25.0),
            cdd: Some(0.0),
        };
        let table = Table::daily(&[day], &[Metric::TemperatureF, Metric::TemperatureC]);

        assert_eq!(table.header(), vec!["date", "TEMP_F", "TEMP_C", "HDD_F", "CDD_F"]);
        assert_eq!(table.rows[0].values, vec![Some(40.0), None, Some(25.0), Some(0.0)]);
        assert_eq!(table.rows[0].key.to_string(), "2018-01-01");
    }
}
