pub mod noaa_client;
pub mod staging;
pub mod tmy;

pub use noaa_client::{BatchResult, BatchSummary, FetchOutcome, FileFetcher, HttpFetcher, NoaaClient};
pub use tmy::{lookup_string, TmyClient};
