//! Selection → forecast orchestration.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use tenki_core::{DatabaseError, ForecastError};

use crate::fetcher::ForecastFetcher;
use crate::hierarchy::AreaHierarchyIndex;
use crate::normalize::normalize;
use crate::store::{PersistSummary, SharedStore};
use crate::types::AreaForecast;

/// What happened to the store after a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    /// No store configured.
    Skipped,
    Saved(PersistSummary),
    /// Display data is still valid; only the history write failed.
    Failed(String),
}

/// Normalized forecast for one office plus the persistence result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastOutcome {
    pub office_code: String,
    pub areas: Vec<AreaForecast>,
    pub persistence: PersistenceStatus,
}

/// Resolves region/office names and drives fetch → normalize → persist.
#[derive(Clone)]
pub struct SelectionResolver {
    index: Arc<AreaHierarchyIndex>,
    fetcher: ForecastFetcher,
    store: Option<SharedStore>,
}

impl SelectionResolver {
    pub fn new(
        index: Arc<AreaHierarchyIndex>,
        fetcher: ForecastFetcher,
        store: Option<SharedStore>,
    ) -> Self {
        Self {
            index,
            fetcher,
            store,
        }
    }

    pub fn index(&self) -> &AreaHierarchyIndex {
        &self.index
    }

    /// Resolve names to an office code and fetch its forecast.
    ///
    /// # Errors
    /// The first failing stage's error; nothing is returned or stored on
    /// failure. A failed store write is not an error (see
    /// [`PersistenceStatus::Failed`]).
    pub async fn resolve(
        &self,
        region_name: &str,
        office_name: &str,
    ) -> Result<ForecastOutcome, ForecastError> {
        self.resolve_cancellable(region_name, office_name, &CancellationToken::new())
            .await
    }

    /// [`SelectionResolver::resolve`] that gives up once `cancel` fires.
    ///
    /// # Errors
    /// As `resolve`, plus `Cancelled`.
    pub async fn resolve_cancellable(
        &self,
        region_name: &str,
        office_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ForecastOutcome, ForecastError> {
        let office_code = self.resolve_office(region_name, office_name)?;
        self.fetch_office(&office_code, cancel).await
    }

    /// Region name → office code, scoped to that region.
    ///
    /// # Errors
    /// `NotFound` for an unknown region, or an office outside it.
    pub fn resolve_office(
        &self,
        region_name: &str,
        office_name: &str,
    ) -> Result<String, ForecastError> {
        let region_code = self.index.resolve_region_code(region_name)?;
        let office_code = self.index.resolve_office_code(office_name, region_code)?;
        tracing::debug!(region_name, office_name, region_code, office_code, "Resolved selection");
        Ok(office_code.to_string())
    }

    /// Fetch, normalize and (if a store is configured) persist one office.
    ///
    /// # Errors
    /// `Network`, `Decode`, `MalformedForecast` or `Cancelled`.
    pub async fn fetch_office(
        &self,
        office_code: &str,
        cancel: &CancellationToken,
    ) -> Result<ForecastOutcome, ForecastError> {
        let doc = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ForecastError::Cancelled),
            doc = self.fetcher.fetch(office_code) => doc?,
        };

        let areas = normalize(&doc)?.into_area_forecasts();

        if cancel.is_cancelled() {
            tracing::debug!(office_code, "Request superseded; not persisting");
            return Err(ForecastError::Cancelled);
        }
        let persistence = self.persist(&areas).await;

        Ok(ForecastOutcome {
            office_code: office_code.to_string(),
            areas,
            persistence,
        })
    }

    async fn persist(&self, areas: &[AreaForecast]) -> PersistenceStatus {
        let Some(store) = self.store.clone() else {
            return PersistenceStatus::Skipped;
        };

        let areas = areas.to_vec();
        let result = tokio::task::spawn_blocking(move || store.lock().persist(&areas))
            .await
            .map_err(|e| ForecastError::Persistence(DatabaseError::QueryFailed(e.to_string())))
            .and_then(|r| r);

        match result {
            Ok(summary) => PersistenceStatus::Saved(summary),
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist forecast");
                PersistenceStatus::Failed(e.to_string())
            }
        }
    }
}
