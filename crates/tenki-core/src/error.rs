//! Centralized error types for tenki.
//!
//! This module provides a typed error hierarchy that:
//! - Keeps each pipeline failure distinguishable by kind
//! - Provides user-friendly messages suitable for display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Network and database failures arrive wrapped in [`ForecastError`].
/// Use `user_message()` to get a display-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Forecast(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The forecast server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { status: 404, .. } => {
                "No forecast is published for this office."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Database/storage errors (SQLite).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Schema creation failed: {0}")]
    SchemaFailed(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => {
                "Unable to open the forecast database. Check the storage path."
            }
            DatabaseError::QueryFailed(_) => "Saving the forecast failed. Please try again.",
            DatabaseError::Corruption(_) => {
                "The forecast database may be corrupted. Consider removing it."
            }
            DatabaseError::SchemaFailed(_) => {
                "Failed to prepare the forecast database. Check the storage path."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Failures of the forecast pipeline: hierarchy lookup, fetch, normalization
/// and persistence.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The area hierarchy document could not be read.
    #[error("Area hierarchy unavailable: {0}")]
    SourceUnavailable(String),

    /// The area hierarchy document is not in the centers/offices shape.
    #[error("Malformed area hierarchy: {0}")]
    MalformedDocument(String),

    /// A region or office name did not resolve to a code.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forecast request failed: {0}")]
    Network(#[from] NetworkError),

    /// The forecast response body is not valid JSON.
    #[error("Forecast response could not be decoded: {0}")]
    Decode(String),

    /// The forecast JSON does not have the expected structure.
    #[error("Malformed forecast: {0}")]
    MalformedForecast(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    /// A newer selection superseded this request.
    #[error("Forecast request cancelled")]
    Cancelled,
}

/// Payload-free discriminant of [`ForecastError`], cheap to store in UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastErrorKind {
    SourceUnavailable,
    MalformedDocument,
    NotFound,
    Network,
    Decode,
    MalformedForecast,
    Persistence,
    Cancelled,
}

impl ForecastError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn malformed_forecast(message: impl Into<String>) -> Self {
        Self::MalformedForecast(message.into())
    }

    pub fn kind(&self) -> ForecastErrorKind {
        match self {
            Self::SourceUnavailable(_) => ForecastErrorKind::SourceUnavailable,
            Self::MalformedDocument(_) => ForecastErrorKind::MalformedDocument,
            Self::NotFound(_) => ForecastErrorKind::NotFound,
            Self::Network(_) => ForecastErrorKind::Network,
            Self::Decode(_) => ForecastErrorKind::Decode,
            Self::MalformedForecast(_) => ForecastErrorKind::MalformedForecast,
            Self::Persistence(_) => ForecastErrorKind::Persistence,
            Self::Cancelled => ForecastErrorKind::Cancelled,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "Area list could not be loaded. Check the areas file.",
            Self::MalformedDocument(_) => "Area list is malformed. Check the areas file.",
            Self::NotFound(_) => "That region or office is not in the area list.",
            Self::Network(e) => e.user_message(),
            Self::Decode(_) | Self::MalformedForecast(_) => {
                "The forecast could not be read. Please try again later."
            }
            Self::Persistence(e) => e.user_message(),
            Self::Cancelled => "The request was replaced by a newer selection.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_body() || self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = [
            ForecastError::SourceUnavailable("x".into()),
            ForecastError::MalformedDocument("x".into()),
            ForecastError::NotFound("x".into()),
            ForecastError::Network(NetworkError::Timeout),
            ForecastError::Decode("x".into()),
            ForecastError::MalformedForecast("x".into()),
            ForecastError::Persistence(DatabaseError::QueryFailed("x".into())),
            ForecastError::Cancelled,
        ];

        for err in errors {
            assert!(!err.user_message().is_empty(), "{:?}", err);
        }
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            ForecastError::Network(NetworkError::Timeout).kind(),
            ForecastErrorKind::Network
        );
        assert_eq!(ForecastError::not_found("Tokyo").kind(), ForecastErrorKind::NotFound);
        assert_eq!(ForecastError::Cancelled.kind(), ForecastErrorKind::Cancelled);
    }

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = ForecastError::not_found("Kanto").into();
        assert!(matches!(err, AppError::Forecast(ForecastError::NotFound(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let err = AppError::Forecast(ForecastError::Network(NetworkError::Timeout));
        assert_eq!(err.user_message(), "The request timed out. Please try again.");
    }

    #[test]
    fn test_missing_office_page_message() {
        let err = NetworkError::ServerError {
            status: 404,
            message: "Not Found".into(),
        };
        assert_eq!(err.user_message(), "No forecast is published for this office.");
    }

    #[test]
    fn test_corrupt_sqlite_maps_to_corruption() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(11),
            Some("database disk image is malformed (corrupt)".into()),
        );
        assert!(matches!(err.into_database_error(), DatabaseError::Corruption(_)));
    }
}
