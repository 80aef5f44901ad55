pub mod additional_data;
pub mod epw_reader;
pub mod format_profile;
pub mod record_decoder;
pub mod station_directory;

pub use format_profile::{FormatProfile, ProfileKind, GSOD, ISD_FULL, ISD_LITE};
pub use record_decoder::{decode, DecodeOutput, MalformedLine, RecordReader};
pub use station_directory::{parse_station_list, read_station_list, StationDirectory, StationTarget};
pub use epw_reader::{parse_epw, read_epw, EpwFile, EpwLocation, TMY_METRICS};
