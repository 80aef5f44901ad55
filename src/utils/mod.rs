pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use coordinates::{dms_to_decimal, haversine_distance};
pub use filename::{epw_output_path, granularity_output_path, local_raw_path, parse_raw_file_name, remote_path};
pub use progress::ProgressReporter;
