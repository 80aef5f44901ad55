use crate::error::Result;
use crate::writers::table::Table;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// Write a table to a single-worksheet workbook; missing values are blank cells.
pub fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(table.granularity.name())?;

    for (col, name) in table.header().into_iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let excel_row = index as u32 + 1;
        worksheet.write_string(excel_row, 0, row.key.to_string())?;
        for (col, value) in row.values.iter().enumerate() {
            if let Some(value) = value {
                worksheet.write_number(excel_row, col as u16 + 1, *value)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyAggregate, Metric, MetricValues};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_write_daily_xlsx() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.xlsx");

        let day = DailyAggregate {
            date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            values: MetricValues::new().with(Metric::TemperatureF, 40.0),
            hdd: Some(25.0),
            cdd: Some(0.0),
        };
        write_xlsx(&Table::daily(&[day], &[Metric::TemperatureF]), &path)?;

        let bytes = std::fs::read(&path)?;
        // xlsx files are zip containers.
        assert_eq!(&bytes[..2], b"PK");
        Ok(())
    }
}
