use crate::config::{NetworkConfig, PathsConfig};
use crate::error::{ProcessingError, Result};
use crate::fetch::staging::{is_present, write_gunzipped, write_plain};
use crate::models::DataSource;
use crate::processors::pipeline::StationYear;
use crate::readers::{StationDirectory, StationTarget};
use crate::utils::constants::ISD_HISTORY_REMOTE_PATH;
use crate::utils::filename::{local_raw_path, remote_path};
use crate::utils::progress::ProgressReporter;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retrieves the body of a URL. Transport failures and non-2xx responses are errors.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Result of asking for one station-year.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(PathBuf),
    Missing,
    /// The station stopped reporting before the requested year.
    Outdated { end: NaiveDate },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success: usize,
    pub missing: usize,
    pub outdated: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Success(_) => self.success += 1,
            FetchOutcome::Missing => self.missing += 1,
            FetchOutcome::Outdated { .. } => self.outdated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.missing + self.outdated
    }

    pub fn summary(&self) -> String {
        format!(
            "Fetched {} station-year(s): {} available, {} missing, {} outdated",
            self.total(),
            self.success,
            self.missing,
            self.outdated
        )
    }
}

/// Fetched station-years in request order, plus counts.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub outcomes: Vec<(StationTarget, i32, FetchOutcome)>,
    pub summary: BatchSummary,
}

impl BatchResult {
    /// Station-years whose raw file is on disk.
    pub fn available(&self) -> Vec<StationYear> {
        self.outcomes
            .iter()
            .filter_map(|(target, year, outcome)| match outcome {
                FetchOutcome::Success(path) => Some(StationYear {
                    station_id: target.id.clone(),
                    year: *year,
                    path: path.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Downloads raw NOAA files into the weather directory.
pub struct NoaaClient<F: FileFetcher> {
    fetcher: F,
    base_url: String,
    weather_dir: PathBuf,
    errors_log: PathBuf,
    concurrency: usize,
}

impl NoaaClient<HttpFetcher> {
    pub fn from_config(network: &NetworkConfig, paths: &PathsConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(network.timeout())?;
        Ok(Self::new(fetcher, &network.base_url, paths).with_concurrency(network.concurrent_downloads))
    }
}

impl<F: FileFetcher> NoaaClient<F> {
    pub fn new(fetcher: F, base_url: &str, paths: &PathsConfig) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            weather_dir: paths.weather_dir.clone(),
            errors_log: paths.errors_log_path(),
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Make sure the raw file for one station-year is on disk.
    ///
    /// Coverage is checked against the station history first, so an
    /// outdated station-year never touches the network.
    pub async fn fetch_station_year(
        &self,
        target: &StationTarget,
        source: DataSource,
        year: i32,
    ) -> Result<FetchOutcome> {
        if let Some(metadata) = &target.metadata {
            if !metadata.covers_year(year) {
                info!(
                    "{} stopped reporting on {}, skipping {}",
                    target.id, metadata.end, year
                );
                return Ok(FetchOutcome::Outdated { end: metadata.end });
            }
        }

        let local = local_raw_path(&self.weather_dir, source, &target.id, year);
        if is_present(&local) {
            debug!("{} already present", local.display());
            return Ok(FetchOutcome::Success(local));
        }

        let remote = remote_path(source, &target.id, year);
        let failure = match self.fetcher.fetch(&self.url(&remote)).await {
            Ok(body) if body.is_empty() => "empty response body".to_string(),
            Ok(body) => match write_gunzipped(&body, &local) {
                Ok(size) if size > 0 => {
                    debug!("Saved {} ({} bytes)", local.display(), size);
                    return Ok(FetchOutcome::Success(local));
                }
                Ok(_) => {
                    if let Err(e) = std::fs::remove_file(&local) {
                        warn!("Could not remove empty {}: {}", local.display(), e);
                    }
                    "empty file after decompression".to_string()
                }
                Err(e) => format!("could not decompress: {}", e),
            },
            Err(e) => e.to_string(),
        };

        warn!("{} is missing: {}", remote, failure);
        if let Err(e) = self.log_missing(&remote, &failure) {
            warn!("Could not append to {}: {}", self.errors_log.display(), e);
        }
        Ok(FetchOutcome::Missing)
    }

    /// Fetch every year of every target. A missing file never stops the batch.
    pub async fn fetch_all(
        &self,
        targets: &[StationTarget],
        source: DataSource,
        years: std::ops::RangeInclusive<i32>,
        progress: Option<&ProgressReporter>,
    ) -> Result<BatchResult> {
        let jobs: Vec<(&StationTarget, i32)> = targets
            .iter()
            .flat_map(|target| years.clone().map(move |year| (target, year)))
            .collect();

        let outcomes: Vec<Result<(StationTarget, i32, FetchOutcome)>> = stream::iter(jobs)
            .map(|(target, year)| async move {
                let outcome = self.fetch_station_year(target, source, year).await?;
                if let Some(progress) = progress {
                    progress.advance(&format!("{} {}", target.id, year));
                }
                Ok::<_, ProcessingError>((target.clone(), year, outcome))
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut result = BatchResult::default();
        for entry in outcomes {
            let (target, year, outcome) = entry?;
            result.summary.record(&outcome);
            result.outcomes.push((target, year, outcome));
        }

        info!("{}", result.summary.summary());
        Ok(result)
    }

    /// Download `isd-history.csv` when it is absent or older than `max_age`.
    /// A stale copy is kept if the download fails.
    pub async fn refresh_station_history(&self, path: &Path, max_age: Duration) -> Result<PathBuf> {
        if !StationDirectory::needs_refresh(path, max_age) {
            debug!("{} is fresh", path.display());
            return Ok(path.to_path_buf());
        }

        let url = self.url(ISD_HISTORY_REMOTE_PATH);
        info!("Downloading station history from {}", url);
        match self.fetcher.fetch(&url).await {
            Ok(body) if !body.is_empty() => {
                write_plain(&body, path)?;
                Ok(path.to_path_buf())
            }
            Ok(_) if path.exists() => {
                warn!("Empty station history response, keeping {}", path.display());
                Ok(path.to_path_buf())
            }
            Ok(_) => Err(ProcessingError::MissingData(format!("empty response from {}", url))),
            Err(e) if path.exists() => {
                warn!("Could not refresh station history ({}), keeping {}", e, path.display());
                Ok(path.to_path_buf())
            }
            Err(e) => Err(e),
        }
    }

    fn log_missing(&self, remote: &str, reason: &str) -> Result<()> {
        if let Some(parent) = self.errors_log.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.errors_log)?;
        writeln!(file, "{} doesn't exist: {}", remote, reason)?;
        Ok(())
    }
}
