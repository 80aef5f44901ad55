/// Remote locations
pub const DEFAULT_NOAA_BASE_URL: &str = "https://www.ncei.noaa.gov/pub/data";
pub const DEFAULT_TMY_INDEX_URL: &str =
    "https://github.com/NREL/EnergyPlus/raw/develop/weather/master.geojson";
pub const ISD_HISTORY_REMOTE_PATH: &str = "noaa/isd-history.csv";

/// File names
pub const ISD_HISTORY_FILE: &str = "isd-history.csv";
pub const EPW_TEMPLATE_FILE: &str = "EPW-template-file.epw";
pub const ERRORS_FILE: &str = "errors.txt";
pub const TMY_DIR: &str = "tmy";

/// Directory defaults
pub const DEFAULT_SUPPORT_DIR: &str = "support";
pub const DEFAULT_WEATHER_DIR: &str = "weather_files";
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Network defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HISTORY_MAX_AGE_DAYS: u64 = 30;
pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 4;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Prefix for environment overrides, e.g. `NOAA_WEATHER__NETWORK__TIMEOUT_SECS`
pub const ENV_PREFIX: &str = "NOAA_WEATHER";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
