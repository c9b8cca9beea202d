// # HTTP Advert Source
//
// Fetches the advert configuration from the configuration API with a single
// unauthenticated GET.
//
// ## Behaviour
//
// - One attempt per fetch, no retry and no caching
// - Any non-2xx status is a transport error
// - A body that is not JSON is an unexpected payload; whether the JSON has
//   the right shape is left to `AdvertFactory`
//
// Failures are returned, not swallowed: `AdvertLoader::fetch_adverts` is
// where the page decides to degrade to no adverts.

use advert_core::config::AdvertConfig;
use advert_core::traits::AdvertSource;
use advert_core::{Error, Result};

use std::time::Duration;

use serde_json::Value;

/// Request timeout used by [`HttpAdvertSource::new`]
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Advert configuration fetched over HTTP(S)
pub struct HttpAdvertSource {
    /// Configuration endpoint
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAdvertSource {
    /// Create a source for `url` with the default request timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a source for `url` with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a source from validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `config` does not validate.
    pub fn from_config(config: &AdvertConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_timeout(
            config.api_url.clone(),
            config.request_timeout(),
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl AdvertSource for HttpAdvertSource {
    async fn fetch_raw(&self) -> Result<Value> {
        tracing::debug!("Fetching advert configuration from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| Error::unexpected_payload(format!("Response is not JSON: {}", e)))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advert_core::AdvertLoader;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn entry(id: &str) -> Value {
        json!({
            "unit": "/19968336/header-bid-tag-0",
            "id": id,
            "sizes": [[300, 250], [300, 600]],
            "refresh": true,
            "positon": "right",
            "refreshSettings": { "btnClick": "enabled" },
            "closeBtn": true,
            "bids": [{ "bidder": "appnexus", "params": { "placementId": 13144370 } }]
        })
    }

    #[tokio::test]
    async fn fetches_json_body() {
        let server = MockServer::start_async().await;
        let ads = server
            .mock_async(|when, then| {
                when.method(GET).path("/eg/ads");
                then.status(200).json_body(json!([entry("a")]));
            })
            .await;

        let source = HttpAdvertSource::new(server.url("/eg/ads"));
        let body = source.fetch_raw().await.unwrap();

        assert_eq!(body, json!([entry("a")]));
        ads.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn error_status_is_a_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/eg/ads");
                then.status(404);
            })
            .await;

        let source = HttpAdvertSource::new(server.url("/eg/ads"));
        let err = source.fetch_raw().await.unwrap_err();

        assert!(err.is_transport());
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn non_json_body_is_an_unexpected_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/eg/ads");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let source = HttpAdvertSource::new(server.url("/eg/ads"));
        let err = source.fetch_raw().await.unwrap_err();

        assert!(matches!(err, Error::UnexpectedPayload(_)));
    }

    #[tokio::test]
    async fn loader_validates_fetched_adverts() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/eg/ads");
                then.status(200).json_body(json!([entry("a"), entry("b")]));
            })
            .await;

        let loader = AdvertLoader::new(Box::new(HttpAdvertSource::new(server.url("/eg/ads"))));
        let adverts = loader.fetch_adverts().await;

        let ids: Vec<_> = adverts.iter().map(|advert| advert.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(adverts[0].sizes.len(), 2);
        assert!(adverts[0].behaviors().refresh_button);
    }

    #[tokio::test]
    async fn loader_degrades_on_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/eg/ads");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/object");
                then.status(200).json_body(json!({ "ads": [] }));
            })
            .await;

        let failing = AdvertLoader::new(Box::new(HttpAdvertSource::new(server.url("/eg/ads"))));
        let object = AdvertLoader::new(Box::new(HttpAdvertSource::new(server.url("/object"))));

        assert!(failing.fetch_adverts().await.is_empty());
        assert!(object.fetch_adverts().await.is_empty());
    }

    #[test]
    fn from_config_rejects_invalid_url() {
        let config = AdvertConfig::new().with_api_url("ftp://example.com/ads");
        assert!(matches!(
            HttpAdvertSource::from_config(&config),
            Err(Error::Config(_))
        ));

        let source = HttpAdvertSource::from_config(&AdvertConfig::new()).unwrap();
        assert_eq!(source.url(), advert_core::config::DEFAULT_API_URL);
    }
}
