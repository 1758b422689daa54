//! HTTP client for per-office forecast documents.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use tenki_core::config::ForecastConfig;
use tenki_core::error::ReqwestErrorExt;
use tenki_core::{ForecastError, NetworkError};

use crate::types::RawForecastDocument;

const USER_AGENT: &str = concat!("tenki/", env!("CARGO_PKG_VERSION"));

/// Fetches `<base_url>/<office_code>.json`, one attempt per call.
#[derive(Debug, Clone)]
pub struct ForecastFetcher {
    client: Arc<Client>,
    base_url: String,
}

impl ForecastFetcher {
    /// # Errors
    /// `Network` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ForecastError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ForecastError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// # Errors
    /// See [`ForecastFetcher::new`].
    pub fn from_config(config: &ForecastConfig) -> Result<Self, ForecastError> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, office_code: &str) -> String {
        format!("{}/{}.json", self.base_url, office_code)
    }

    /// Fetch the raw forecast document for an office.
    ///
    /// # Errors
    /// `Network` on connection failure, timeout or a non-2xx status;
    /// `Decode` if the body is not JSON.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, office_code: &str) -> Result<RawForecastDocument, ForecastError> {
        let url = self.url_for(office_code);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ForecastError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(%status, %url, "Forecast request returned error status");
            return Err(ForecastError::Network(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ForecastError::Network(e.into_network_error()))?;

        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| ForecastError::Decode(e.to_string()))?;

        tracing::debug!(body = %value, "Forecast response");
        Ok(RawForecastDocument(value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use tenki_core::ForecastErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> ForecastFetcher {
        ForecastFetcher::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_url_template() {
        let f = ForecastFetcher::new("https://example.com/forecast/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(f.url_for("130000"), "https://example.com/forecast/130000.json");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/130000.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"publishingOffice": "気象庁", "timeSeries": []}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let doc = fetcher(&mock_server).fetch("130000").await.unwrap();
        assert_eq!(doc.as_value()[0]["publishingOffice"], "気象庁");
    }

    #[tokio::test]
    async fn test_not_found_status_is_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/000000.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = fetcher(&mock_server).fetch("000000").await.unwrap_err();
        match err {
            ForecastError::Network(NetworkError::ServerError { status, .. }) => {
                assert_eq!(status, 404)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/130000.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let err = fetcher(&mock_server).fetch("130000").await.unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/130000.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let f = ForecastFetcher::new(&mock_server.uri(), Duration::from_millis(200)).unwrap();
        let err = f.fetch("130000").await.unwrap_err();
        assert!(matches!(err, ForecastError::Network(NetworkError::Timeout)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let f = ForecastFetcher::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = f.fetch("130000").await.unwrap_err();
        assert_eq!(err.kind(), ForecastErrorKind::Network);
    }
}
