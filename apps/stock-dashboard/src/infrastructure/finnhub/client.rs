//! Finnhub HTTP client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::messages::FinnhubQuote;
use crate::application::ports::{FetchError, QuoteProviderPort};
use crate::domain::quote::{Quote, Symbol};

/// Production Finnhub REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Header carrying the API key.
const TOKEN_HEADER: &str = "X-Finnhub-Token";

/// Longest error body kept in a [`FetchError::Provider`].
const MAX_ERROR_BODY: usize = 256;

/// Finnhub client configuration.
#[derive(Clone)]
pub struct FinnhubConfig {
    /// API key.
    pub api_key: String,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for FinnhubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinnhubConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FinnhubConfig {
    /// Configuration against the production endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Quote provider backed by Finnhub's `/quote` endpoint.
///
/// One request per call. No retries, caching, or rate limiting.
pub struct FinnhubClient {
    http_client: reqwest::Client,
    api_key: String,
    quote_url: String,
    timeout: Duration,
}

impl fmt::Debug for FinnhubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinnhubClient")
            .field("quote_url", &self.quote_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FinnhubClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unauthorized`] for an empty API key and
    /// [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &FinnhubConfig) -> Result<Self, FetchError> {
        if config.api_key.trim().is_empty() {
            return Err(FetchError::Unauthorized);
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            quote_url: format!("{}/quote", config.base_url.trim_end_matches('/')),
            timeout: config.timeout,
        })
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if error.is_decode() {
            FetchError::Malformed(error.to_string())
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

fn map_status(status: StatusCode, body: String) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        _ => {
            let mut body = body;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            FetchError::Provider {
                status: status.as_u16(),
                body,
            }
        }
    }
}

#[async_trait]
impl QuoteProviderPort for FinnhubClient {
    async fn fetch(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        let response = self
            .http_client
            .get(&self.quote_url)
            .query(&[("symbol", symbol.as_str())])
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(&e))?;
        let raw: FinnhubQuote =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))?;

        tracing::trace!(symbol = %symbol, body = ?raw, "Finnhub quote received");
        raw.into_quote(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &str =
        r#"{"c":148.96,"d":-0.84,"dp":-0.5607,"h":149.7,"l":147.8,"o":148.985,"pc":149.8,"t":1700000000}"#;

    async fn client_for(server: &MockServer) -> FinnhubClient {
        let config = FinnhubConfig::new("test-key")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(500));
        FinnhubClient::new(&config).unwrap()
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    async fn respond_with(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fetch_sends_symbol_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "BINANCE:BTCUSDT"))
            .and(header("X-Finnhub-Token", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let quote = client_for(&server)
            .await
            .fetch(&symbol("BINANCE:BTCUSDT"))
            .await
            .unwrap();

        assert_eq!(quote.symbol.as_str(), "BINANCE:BTCUSDT");
        assert!((quote.high_price - 149.7).abs() < f64::EPSILON);
        assert!((quote.low_price - 147.8).abs() < f64::EPSILON);
        assert!((quote.open_price - 148.985).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unauthorized_maps() {
        let server = respond_with(ResponseTemplate::new(401)).await;
        let result = client_for(&server).await.fetch(&symbol("AAPL")).await;
        assert!(matches!(result, Err(FetchError::Unauthorized)));
    }

    #[tokio::test]
    async fn rate_limit_maps() {
        let server = respond_with(ResponseTemplate::new(429)).await;
        let result = client_for(&server).await.fetch(&symbol("AAPL")).await;
        assert!(matches!(result, Err(FetchError::RateLimited)));
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let server =
            respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable")).await;
        match client_for(&server).await.fetch(&symbol("AAPL")).await {
            Err(FetchError::Provider { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let server = respond_with(ResponseTemplate::new(200).set_body_string("<html>")).await;
        let result = client_for(&server).await.fetch(&symbol("AAPL")).await;
        assert!(matches!(result, Err(FetchError::Malformed(_))));
    }

    #[tokio::test]
    async fn missing_field_is_reported() {
        let server = respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"c":1.0,"h":1.0,"l":1.0,"o":1.0,"t":1700000000}"#, "application/json"),
        )
        .await;
        let result = client_for(&server).await.fetch(&symbol("AAPL")).await;
        assert!(matches!(result, Err(FetchError::MissingField("dp"))));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(BODY, "application/json")
                .set_delay(Duration::from_secs(2)),
        )
        .await;
        let result = client_for(&server).await.fetch(&symbol("AAPL")).await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let config = FinnhubConfig::new("test-key")
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(Duration::from_millis(500));
        let result = FinnhubClient::new(&config)
            .unwrap()
            .fetch(&symbol("AAPL"))
            .await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(
            FinnhubClient::new(&FinnhubConfig::new("  ")),
            Err(FetchError::Unauthorized)
        ));
    }

    #[test]
    fn long_error_body_truncated() {
        match map_status(StatusCode::BAD_GATEWAY, "x".repeat(1000)) {
            FetchError::Provider { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", FinnhubConfig::new("secret-key"));
        assert!(!debug.contains("secret-key"));
    }
}
