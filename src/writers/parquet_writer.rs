use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::table::{RowKey, Table};
use arrow::array::{ArrayRef, Date32Array, Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write a table to a Parquet file. Metric columns are nullable `Float64`.
    pub fn write_table(&self, table: &Table, path: &Path) -> Result<()> {
        let schema = self.create_schema(table);
        let batch = self.table_to_batch(table, schema.clone())?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }

    fn create_schema(&self, table: &Table) -> Arc<Schema> {
        let key_type = match table.rows.first().map(|r| r.key) {
            Some(RowKey::Date(_)) => DataType::Date32,
            _ if table.key_name == "date" => DataType::Date32,
            _ => DataType::Timestamp(TimeUnit::Millisecond, None),
        };

        let fields: Vec<Field> = std::iter::once(Field::new(table.key_name, key_type, false))
            .chain(
                table
                    .columns
                    .iter()
                    .map(|name| Field::new(name, DataType::Float64, true)),
            )
            .collect();

        Arc::new(Schema::new(fields))
    }

    fn table_to_batch(&self, table: &Table, schema: Arc<Schema>) -> Result<RecordBatch> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .ok_or_else(|| ProcessingError::InvalidFormat("epoch".to_string()))?;

        let key_array: ArrayRef = match schema.field(0).data_type() {
            DataType::Date32 => {
                let days: Vec<i32> = table
                    .rows
                    .iter()
                    .map(|row| match row.key {
                        RowKey::Date(date) => (date - epoch).num_days() as i32,
                        RowKey::Timestamp(ts) => (ts.date() - epoch).num_days() as i32,
                    })
                    .collect();
                Arc::new(Date32Array::from(days))
            }
            _ => {
                let millis: Vec<i64> = table
                    .rows
                    .iter()
                    .map(|row| match row.key {
                        RowKey::Timestamp(ts) => ts.and_utc().timestamp_millis(),
                        RowKey::Date(date) => (date - epoch).num_milliseconds(),
                    })
                    .collect();
                Arc::new(TimestampMillisecondArray::from(millis))
            }
        };

        let mut columns = vec![key_array];
        for index in 0..table.columns.len() {
            let values: Vec<Option<f64>> = table
                .rows
                .iter()
                .map(|row| row.values.get(index).copied().flatten())
                .collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let columns = metadata.file_metadata().schema_descr().num_columns();
        let file_size = std::fs::metadata(path)?.len();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups,
            columns,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: usize,
    pub columns: usize,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}",
            self.total_rows,
            self.columns,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HourlyObservation, Metric, MetricValues};
    use tempfile::NamedTempFile;

    fn hourly_table(hours: u32) -> Table {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let rows: Vec<HourlyObservation> = (0..hours)
            .map(|h| {
                HourlyObservation::new(
                    start + chrono::Duration::hours(h as i64),
                    MetricValues::new().with(Metric::TemperatureC, h as f64),
                )
            })
            .collect();
        Table::hourly(&rows, &[Metric::TemperatureF, Metric::TemperatureC])
    }

    #[test]
    fn test_write_hourly_table() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_table(&hourly_table(48), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 48);
        assert_eq!(info.columns, 3);
        Ok(())
    }

    #[test]
    fn test_row_group_size() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(24);
        let temp_file = NamedTempFile::new()?;

        writer.write_table(&hourly_table(48), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 48);
        assert_eq!(info.row_groups, 2);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;
            let result = writer.write_table(&hourly_table(3), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-9").is_err());
        Ok(())
    }
}
