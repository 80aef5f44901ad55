use crate::cli::args::{Cli, Commands, OutputArgs, PathArgs, SelectorArgs, SourceArg};
use crate::config::{AppConfig, PathsConfig};
use crate::error::{ProcessingError, Result};
use crate::fetch::{lookup_string, NoaaClient, TmyClient};
use crate::models::{
    DataSource, DegreeDayThresholds, FileType, OutputFormat, StationId, StationMetadata,
    StationRequest, StationSelector,
};
use crate::processors::{IntegrityChecker, IntegrityReport, Pipeline, ProcessedStationYear, StationYear};
use crate::readers::epw_reader::TMY_REFERENCE_YEAR;
use crate::readers::{read_epw, FormatProfile, StationDirectory, TMY_METRICS};
use crate::utils::filename::parse_raw_file_name;
use crate::utils::progress::ProgressReporter;
use crate::writers::{Emitter, ParquetWriter};
use chrono::{Datelike, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            source,
            start_year,
            end_year,
            selector,
            output,
            paths,
        } => {
            run_fetch(
                config,
                source,
                start_year,
                end_year.unwrap_or(start_year),
                &selector,
                &output,
                &paths,
            )
            .await
        }

        Commands::Tmy {
            country,
            state,
            name,
            output,
            paths,
        } => run_tmy(config, &country, state, &name, &output, &paths).await,

        Commands::Convert {
            source,
            inputs,
            output,
            paths,
        } => run_convert(config, source, &inputs, &output, &paths).await,

        Commands::Stations {
            query,
            country,
            latitude,
            longitude,
            year,
            limit,
            refresh,
            paths,
        } => {
            let mut config = config;
            apply_path_overrides(&mut config.paths, &paths);
            config.paths.ensure_dirs()?;

            let client = NoaaClient::from_config(&config.network, &config.paths)?;
            let max_age = if refresh {
                Duration::ZERO
            } else {
                config.network.history_max_age()
            };
            let history = client
                .refresh_station_history(&config.paths.isd_history_path(), max_age)
                .await?;
            let directory = StationDirectory::load(&history)?;
            println!("{} stations in {}", directory.len(), history.display());

            match (latitude, longitude, query) {
                (Some(latitude), Some(longitude), _) => {
                    for (station, distance) in directory.nearest(latitude, longitude, year, limit) {
                        println!("{:>8.1} km  {}", distance, describe_station(station));
                    }
                }
                (_, _, Some(query)) => {
                    let matches: Vec<_> = directory
                        .search(&query, country.as_deref())
                        .into_iter()
                        .filter(|s| year.map_or(true, |y| s.covers_year(y)))
                        .take(limit)
                        .collect();
                    if matches.is_empty() {
                        println!("No stations match '{}'", query);
                    }
                    for station in matches {
                        println!("{}", describe_station(station));
                    }
                }
                _ => {
                    return Err(ProcessingError::Config(
                        "give --query or --latitude/--longitude".to_string(),
                    ))
                }
            }

            Ok(())
        }
    }
}

/// Log to stderr, or to `log_file` instead when one is given.
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("noaa_weather_processor={}", level)));

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ProcessingError::Config(format!("could not initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", level);
    Ok(())
}

fn apply_path_overrides(paths: &mut PathsConfig, overrides: &PathArgs) {
    if let Some(dir) = &overrides.support_dir {
        paths.support_dir = dir.clone();
    }
    if let Some(dir) = &overrides.weather_dir {
        paths.weather_dir = dir.clone();
    }
    if let Some(dir) = &overrides.results_dir {
        paths.results_dir = dir.clone();
    }
}

fn thresholds(config: &AppConfig, output: &OutputArgs) -> DegreeDayThresholds {
    DegreeDayThresholds::new(
        output.heating_base.unwrap_or(config.degree_days.heating_f),
        output.cooling_base.unwrap_or(config.degree_days.cooling_f),
    )
}

fn build_emitter(config: &AppConfig, output: &OutputArgs) -> Result<Emitter> {
    let format: OutputFormat = output.format.into();
    Emitter::new(&config.paths.results_dir, format)
        .with_parquet_writer(ParquetWriter::new().with_compression(&output.compression)?)
        .with_epw_template(&config.paths.epw_template_path())
}

fn describe_station(station: &StationMetadata) -> String {
    format!(
        "{}  {:<40} {:<3} {:<3} {:>8.3} {:>9.3}  {} .. {}",
        station.id,
        station.name,
        station.country,
        station.state.as_deref().unwrap_or(""),
        station.latitude,
        station.longitude,
        station.begin,
        station.end
    )
}

async fn run_fetch(
    mut config: AppConfig,
    source: SourceArg,
    start_year: i32,
    end_year: i32,
    selector: &SelectorArgs,
    output: &OutputArgs,
    paths: &PathArgs,
) -> Result<()> {
    apply_path_overrides(&mut config.paths, paths);
    let source: DataSource = source.into();
    let thresholds = thresholds(&config, output);

    let request = StationRequest::new(
        FileType::Historical,
        source,
        selector.to_selector()?,
        start_year,
        end_year,
        output.format.into(),
    )
    .with_thresholds(thresholds);
    request.check()?;
    let emitter = build_emitter(&config, output)?;
    config.paths.ensure_dirs()?;

    println!("Fetching {} data for {}-{}", source, request.start_year, request.end_year);

    let client = NoaaClient::from_config(&config.network, &config.paths)?;
    let directory = match client
        .refresh_station_history(&config.paths.isd_history_path(), config.network.history_max_age())
        .await
        .and_then(|path| StationDirectory::load(&path))
    {
        Ok(directory) => directory,
        Err(e) if matches!(request.selector, StationSelector::Ids(_)) => {
            warn!("Station history unavailable ({}), coverage checks are skipped", e);
            StationDirectory::default()
        }
        Err(e) => return Err(e),
    };

    let targets = directory.resolve(&request.selector, request.start_year)?;
    for target in &targets {
        match &target.metadata {
            Some(meta) => info!("Station {} {} ({} .. {})", target.id, meta.name, meta.begin, meta.end),
            None => info!("Station {}", target.id),
        }
    }

    let total = (targets.len() * request.years().count()) as u64;
    let progress = ProgressReporter::new(total, "Downloading", false);
    let batch = client
        .fetch_all(&targets, source, request.years(), Some(&progress))
        .await?;
    progress.finish_with_message(&batch.summary.summary());

    let available = batch.available();
    if available.is_empty() {
        println!("No station-years available to process");
        return Ok(());
    }

    let append_id = matches!(request.selector, StationSelector::ByName { .. }) && targets.len() > 1;
    let results = process_station_years(
        available,
        FormatProfile::for_source(source),
        output.max_workers,
        thresholds,
    )
    .await?;

    emit_results(&emitter, &results, |station| {
        let stub = request.filename_stub(station);
        if append_id {
            format!("{}-{}", stub, station)
        } else {
            stub
        }
    })
}

async fn run_tmy(
    mut config: AppConfig,
    country: &str,
    state: Option<String>,
    name: &str,
    output: &OutputArgs,
    paths: &PathArgs,
) -> Result<()> {
    apply_path_overrides(&mut config.paths, paths);
    let thresholds = thresholds(&config, output);
    let lookup = lookup_string(country, state.as_deref(), name);

    let request = StationRequest::new(
        FileType::Tmy,
        DataSource::IsdFull,
        StationSelector::ByName {
            country: country.to_string(),
            name: name.to_string(),
            state,
        },
        TMY_REFERENCE_YEAR,
        TMY_REFERENCE_YEAR,
        output.format.into(),
    )
    .with_thresholds(thresholds);
    request.check()?;
    let emitter = build_emitter(&config, output)?;
    config.paths.ensure_dirs()?;

    println!("Looking up TMY file {}", lookup);
    let client = TmyClient::from_config(&config.network, &config.paths)?;
    let path = client.locate(&lookup).await?;

    let epw = read_epw(&path)?;
    if epw.skipped_rows > 0 {
        debug!("Skipped {} rows of {}", epw.skipped_rows, path.display());
    }
    let station_id = epw.location.station_id()?;
    println!(
        "{} {} ({:.3}, {:.3}): {} hourly rows",
        epw.location.city,
        epw.location.country,
        epw.location.latitude,
        epw.location.longitude,
        epw.hourly.len()
    );

    let processed = Pipeline::new(output.max_workers)
        .with_thresholds(thresholds)
        .process_hourly(&station_id, TMY_REFERENCE_YEAR, epw.hourly, &TMY_METRICS)?;

    let input = StationYear {
        station_id: station_id.clone(),
        year: TMY_REFERENCE_YEAR,
        path,
    };
    emit_results(&emitter, &[(input, Ok(processed))], |station| {
        request.filename_stub(station)
    })
}

async fn run_convert(
    mut config: AppConfig,
    source: SourceArg,
    inputs: &[PathBuf],
    output: &OutputArgs,
    paths: &PathArgs,
) -> Result<()> {
    apply_path_overrides(&mut config.paths, paths);
    let source: DataSource = source.into();
    let format: OutputFormat = output.format.into();
    if source.is_daily() && format == OutputFormat::Epw {
        return Err(ProcessingError::Config(
            "EPW output needs hourly data; GSOD is daily".to_string(),
        ));
    }
    let emitter = build_emitter(&config, output)?;
    std::fs::create_dir_all(&config.paths.results_dir)?;

    let station_years = collect_raw_files(inputs)?;
    if station_years.is_empty() {
        println!("No raw files found");
        return Ok(());
    }
    println!("Converting {} {} file(s)", station_years.len(), source);

    let results = process_station_years(
        station_years,
        FormatProfile::for_source(source),
        output.max_workers,
        thresholds(&config, output),
    )
    .await?;

    emit_results(&emitter, &results, |station| station.to_string())
}

/// Expand directories one level deep and keep files named like raw NOAA files.
fn collect_raw_files(inputs: &[PathBuf]) -> Result<Vec<StationYear>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file())
                .collect();
            entries.sort();
            files.extend(entries);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            warn!("{} does not exist, skipping", input.display());
        }
    }

    let mut station_years = Vec::with_capacity(files.len());
    for path in files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with('.') {
            continue;
        }
        match parse_raw_file_name(name) {
            Ok((station_id, year)) => station_years.push(StationYear {
                station_id,
                year,
                path,
            }),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(station_years)
}

async fn process_station_years(
    inputs: Vec<StationYear>,
    profile: &'static FormatProfile,
    max_workers: usize,
    thresholds: DegreeDayThresholds,
) -> Result<Vec<(StationYear, Result<ProcessedStationYear>)>> {
    let pipeline = Pipeline::new(max_workers)
        .with_thresholds(thresholds)
        .with_current_year(Utc::now().year());

    tokio::task::spawn_blocking(move || {
        let progress = ProgressReporter::new(inputs.len() as u64, "Processing", false);
        pipeline.process_all(&inputs, profile, Some(&progress))
    })
    .await?
}

/// Write every successful station-year and print the integrity summary.
fn emit_results<S>(
    emitter: &Emitter,
    results: &[(StationYear, Result<ProcessedStationYear>)],
    stub: S,
) -> Result<()>
where
    S: Fn(&StationId) -> String,
{
    let mut report = IntegrityReport::default();
    let mut written = Vec::new();
    let mut failed = 0usize;
    let spinner = ProgressReporter::new_spinner(
        &format!("Writing {} output...", emitter.format().extension()),
        false,
    );

    for (input, result) in results {
        match result {
            Ok(processed) => {
                spinner.set_message(&format!("Writing {} {}", input.station_id, input.year));
                match emitter.emit(processed, &stub(&input.station_id)) {
                    Ok(paths) => written.extend(paths),
                    Err(e) => {
                        warn!("Could not write {} {}: {}", input.station_id, input.year, e);
                        failed += 1;
                    }
                }
                report.push(processed.integrity.clone());
            }
            Err(e) => {
                spinner.println(&format!("{} {}: {}", input.station_id, input.year, e));
                failed += 1;
            }
        }
    }
    spinner.finish_with_message(&format!("Wrote {} file(s)", written.len()));

    let checker = IntegrityChecker::new();
    println!("\n{}", checker.generate_summary(&report));

    if emitter.format() == OutputFormat::Parquet {
        let writer = ParquetWriter::new();
        for path in &written {
            let info = writer.get_file_info(path)?;
            println!("{}\n{}", path.display(), info.summary());
        }
    }

    println!(
        "Wrote {} file(s), {} station-year(s) failed",
        written.len(),
        failed
    );

    if written.is_empty() && failed > 0 {
        return Err(ProcessingError::MissingData(
            "no station-year could be processed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_apply_path_overrides() {
        let mut paths = PathsConfig::default();
        let overrides = PathArgs {
            weather_dir: Some(PathBuf::from("/tmp/weather")),
            ..Default::default()
        };
        apply_path_overrides(&mut paths, &overrides);
        assert_eq!(paths.weather_dir, PathBuf::from("/tmp/weather"));
        assert_eq!(paths.support_dir, PathsConfig::default().support_dir);
    }

    #[test]
    fn test_collect_raw_files_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("744860-94789-2017"), "").unwrap();
        fs::write(dir.path().join("725030-14732-2018.op"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();

        let found = collect_raw_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|s| format!("{} {}", s.station_id, s.year))
            .collect();
        assert_eq!(names, vec!["725030-14732 2018", "744860-94789 2017"]);
    }
}
