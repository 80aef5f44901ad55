use crate::error::{ProcessingError, Result};
use crate::models::OutputFormat;
use crate::processors::pipeline::ProcessedStationYear;
use crate::utils::filename::{epw_output_path, granularity_output_path};
use crate::writers::csv_writer::write_csv;
use crate::writers::epw_writer::{write_epw, EpwTemplate};
use crate::writers::json_writer::write_json;
use crate::writers::parquet_writer::ParquetWriter;
use crate::writers::table::Table;
use crate::writers::xlsx_writer::write_xlsx;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes processed station-years in one output format.
pub struct Emitter {
    results_dir: PathBuf,
    format: OutputFormat,
    parquet: ParquetWriter,
    epw_template: Option<EpwTemplate>,
}

impl Emitter {
    pub fn new(results_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            results_dir: results_dir.into(),
            format,
            parquet: ParquetWriter::new(),
            epw_template: None,
        }
    }

    pub fn with_parquet_writer(mut self, parquet: ParquetWriter) -> Self {
        self.parquet = parquet;
        self
    }

    /// Load the EPW template once; a synthetic template is used if it is absent.
    pub fn with_epw_template(mut self, path: &Path) -> Result<Self> {
        if self.format == OutputFormat::Epw {
            self.epw_template = Some(EpwTemplate::load_or_synthetic(path)?);
        }
        Ok(self)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write every file for one station-year and return their paths.
    pub fn emit(&self, processed: &ProcessedStationYear, stub: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.results_dir)?;

        let written = match self.format {
            OutputFormat::Epw => vec![self.emit_epw(processed, stub)?],
            format => self.emit_tables(processed, stub, format)?,
        };

        info!(
            "Wrote {} {} file(s) for {} {}",
            written.len(),
            self.format.extension(),
            processed.station_id,
            processed.year
        );
        Ok(written)
    }

    fn emit_tables(
        &self,
        processed: &ProcessedStationYear,
        stub: &str,
        format: OutputFormat,
    ) -> Result<Vec<PathBuf>> {
        let aggregate_metrics = processed.aggregate_metrics();
        let mut tables = Vec::with_capacity(3);

        if processed.has_hourly() {
            tables.push(Table::hourly(&processed.hourly, &processed.metrics));
        } else {
            debug!(
                "No hourly rows for {} {}, skipping hourly output",
                processed.station_id, processed.year
            );
        }
        tables.push(Table::daily(&processed.daily, &aggregate_metrics));
        tables.push(Table::monthly(&processed.monthly, &aggregate_metrics));

        let mut written = Vec::with_capacity(tables.len());
        for table in &tables {
            let path = granularity_output_path(
                &self.results_dir,
                stub,
                processed.year,
                table.granularity.name(),
                format,
            );
            self.write_table(table, &path, format)?;
            debug!("Wrote {} rows to {}", table.rows.len(), path.display());
            written.push(path);
        }

        Ok(written)
    }

    fn write_table(&self, table: &Table, path: &Path, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => write_csv(table, path),
            OutputFormat::Json => write_json(table, path),
            OutputFormat::Xlsx => write_xlsx(table, path),
            OutputFormat::Parquet => self.parquet.write_table(table, path),
            OutputFormat::Epw => Err(ProcessingError::Config(
                "EPW is not a tabular format".to_string(),
            )),
        }
    }

    fn emit_epw(&self, processed: &ProcessedStationYear, stub: &str) -> Result<PathBuf> {
        if !processed.has_hourly() {
            return Err(ProcessingError::Config(format!(
                "EPW output needs hourly data, {} {} has none",
                processed.station_id, processed.year
            )));
        }

        let synthetic;
        let template = match &self.epw_template {
            Some(template) => template,
            None => {
                synthetic = EpwTemplate::synthetic()?;
                &synthetic
            }
        };

        let path = epw_output_path(&self.results_dir, stub, processed.year);
        let rows = write_epw(&processed.hourly, template, &path)?;
        debug!("Wrote {} EPW rows to {}", rows, path.display());
        Ok(path)
    }
}
