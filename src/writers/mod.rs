pub mod csv_writer;
pub mod emitter;
pub mod epw_writer;
pub mod json_writer;
pub mod parquet_writer;
pub mod table;
pub mod xlsx_writer;

pub use emitter::Emitter;
pub use epw_writer::EpwTemplate;
pub use parquet_writer::ParquetWriter;
pub use table::{Granularity, Table};
