use clap::Parser;
use noaa_weather_processor::cli::{run, Cli};
use noaa_weather_processor::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
