mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tenki_core::{AppError, Config, ConfigError};
use tenki_weather::{
    AreaHierarchyIndex, ForecastFetcher, ForecastStore, PersistenceStatus, SelectionResolver,
};

#[derive(Debug, Parser)]
#[command(name = "tenki", version, about = "Regional weather forecasts")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "TENKI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List regions
    Regions,
    /// List the offices of a region
    Offices { region: String },
    /// Fetch and show the forecast for an office
    Forecast {
        region: String,
        office: String,
        /// Do not append the result to the history database
        #[arg(long)]
        no_persist: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = tenki_core::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{}", e.user_message());
            eprintln!("  ({})", e);
            ExitCode::FAILURE
        }
    }
}

/// Keep typed config errors typed so their user message survives.
fn config_error(err: anyhow::Error) -> AppError {
    match err.downcast::<ConfigError>() {
        Ok(config_err) => AppError::Config(config_err),
        Err(other) => AppError::Other(other),
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let (config, _) = Config::load_validated(cli.config.as_deref()).map_err(config_error)?;
    let index = AreaHierarchyIndex::load(&config.hierarchy.areas_path)?;

    match cli.command {
        Command::Regions => {
            for region in index.regions() {
                println!("{}\t{}", region.code, region.name);
            }
        }
        Command::Offices { region } => {
            let region_code = index.resolve_region_code(&region)?;
            for office in index.offices_in_region(region_code) {
                println!("{}\t{}", office.code, office.name);
            }
        }
        Command::Forecast {
            region,
            office,
            no_persist,
        } => {
            let store = if config.storage.persist && !no_persist {
                Some(ForecastStore::open(&config.storage.database_path)?.into_shared())
            } else {
                None
            };
            let fetcher = ForecastFetcher::from_config(&config.forecast)?;
            let resolver = SelectionResolver::new(Arc::new(index), fetcher, store);

            let outcome = resolver.resolve(&region, &office).await?;
            let text = render::render_forecast(&outcome.areas).map_err(anyhow::Error::from)?;
            print!("{}", text);

            match outcome.persistence {
                PersistenceStatus::Saved(summary) => tracing::info!(
                    observations = summary.observations,
                    "Saved forecast history"
                ),
                PersistenceStatus::Failed(message) => {
                    eprintln!("Forecast shown but not saved: {}", message)
                }
                PersistenceStatus::Skipped => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_stays_typed() {
        let err = config_error(anyhow::Error::from(ConfigError::NotFound("tenki.toml".into())));
        assert!(matches!(err, AppError::Config(ConfigError::NotFound(_))));

        let err = config_error(anyhow::anyhow!("disk full"));
        assert!(matches!(err, AppError::Other(_)));
    }
}
