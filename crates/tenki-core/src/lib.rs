pub mod config;
pub mod error;

pub use config::{Config, ForecastConfig, HierarchyConfig, StorageConfig, ValidationResult};
pub use error::{
    AppError, ConfigError, DatabaseError, ForecastError, ForecastErrorKind, NetworkError,
};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Honors `RUST_LOG`; falls back to `info`.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("tenki core initialized");
    Ok(())
}
