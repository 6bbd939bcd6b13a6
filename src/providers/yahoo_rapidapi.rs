use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::quote::{Quote, QuoteProvider};

const RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

/// Yahoo Finance quotes served through RapidAPI.
pub struct YahooRapidApiProvider {
    base_url: String,
    host: String,
    api_key: String,
}

impl YahooRapidApiProvider {
    pub fn new(base_url: &str, host: &str, api_key: &str) -> Self {
        YahooRapidApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            host: host.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct QuotesResponse {
    body: Vec<RawQuote>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    symbol: Option<String>,
    short_name: Option<String>,
    currency: Option<String>,
    regular_market_price: Option<f64>,
    eps_trailing_twelve_months: Option<f64>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<f64>,
    market_cap: Option<f64>,
    dividend_yield: Option<f64>,
    shares_outstanding: Option<f64>,
    regular_market_time: Option<i64>,
}

impl RawQuote {
    fn into_quote(self, requested: &str) -> Quote {
        Quote {
            symbol: self.symbol.unwrap_or_else(|| requested.to_string()),
            short_name: self.short_name,
            currency: self.currency,
            price: self.regular_market_price,
            eps: self.eps_trailing_twelve_months,
            trailing_pe: self.trailing_pe,
            forward_pe: self.forward_pe,
            market_cap: self.market_cap,
            dividend_yield: self.dividend_yield,
            shares_outstanding: self.shares_outstanding,
            as_of: self
                .regular_market_time
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        }
    }
}

#[async_trait]
impl QuoteProvider for YahooRapidApiProvider {
    #[instrument(
        name = "YahooQuoteFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let endpoint = format!("{}/api/v1/markets/stock/quotes", self.base_url);
        let url = Url::parse_with_params(&endpoint, &[("ticker", symbol)])
            .with_context(|| format!("Invalid quote endpoint: {endpoint}"))?;
        debug!("Requesting quote from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("intrinsic/0.1")
            .build()?;
        let response = with_retry(
            || {
                client
                    .get(url.clone())
                    .header("X-RapidAPI-Key", &self.api_key)
                    .header("X-RapidAPI-Host", &self.host)
                    .send()
            },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        let status = response.status();
        debug!(%status, "Received quote response");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                bail!("API credentials rejected ({status}) for symbol: {symbol}")
            }
            StatusCode::TOO_MANY_REQUESTS => {
                bail!("Rate limit exceeded for symbol: {symbol}")
            }
            _ if !status.is_success() => bail!("HTTP error: {status} for symbol: {symbol}"),
            _ => {}
        }

        let text = response.text().await?;
        let data: QuotesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let raw = data
            .body
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No quote data found for symbol: {}", symbol))?;

        if let Some(returned) = raw.symbol.as_deref() {
            if !returned.eq_ignore_ascii_case(symbol) {
                bail!("Quote returned for {returned} instead of requested symbol: {symbol}");
            }
        }

        Ok(raw.into_quote(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUOTES_PATH: &str = "/api/v1/markets/stock/quotes";

    async fn create_mock_server(symbol: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(QUOTES_PATH))
            .and(query_param("ticker", symbol))
            .and(header("X-RapidAPI-Key", "test-key"))
            .and(header("X-RapidAPI-Host", "yahoo-finance15.p.rapidapi.com"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> YahooRapidApiProvider {
        YahooRapidApiProvider::new(
            &mock_server.uri(),
            "yahoo-finance15.p.rapidapi.com",
            "test-key",
        )
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_response = r#"{
            "meta": {"version": "v1.0", "status": 200},
            "body": [{
                "symbol": "AAPL",
                "shortName": "Apple Inc.",
                "currency": "USD",
                "regularMarketPrice": 227.52,
                "epsTrailingTwelveMonths": 6.08,
                "trailingPE": 37.42,
                "forwardPE": 30.1,
                "marketCap": 3459000000000,
                "dividendYield": 0.44,
                "sharesOutstanding": 15204100096,
                "regularMarketTime": 1700000000
            }]
        }"#;
        let mock_server = create_mock_server(
            "AAPL",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let quote = provider(&mock_server).fetch_quote("AAPL").await.unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.short_name.as_deref(), Some("Apple Inc."));
        assert_eq!(quote.price, Some(227.52));
        assert_eq!(quote.eps, Some(6.08));
        assert_eq!(quote.trailing_pe, Some(37.42));
        assert_eq!(quote.forward_pe, Some(30.1));
        assert_eq!(quote.market_cap, Some(3_459_000_000_000.0));
        assert_eq!(quote.dividend_yield, Some(0.44));
        assert_eq!(quote.shares_outstanding, Some(15_204_100_096.0));
        assert_eq!(quote.as_of.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_null_fields_become_none() {
        let mock_response = r#"{
            "body": [{
                "regularMarketPrice": 12.5,
                "epsTrailingTwelveMonths": -1.2,
                "trailingPE": null
            }]
        }"#;
        let mock_server = create_mock_server(
            "LOSS",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let quote = provider(&mock_server).fetch_quote("LOSS").await.unwrap();
        assert_eq!(quote.symbol, "LOSS");
        assert_eq!(quote.eps, Some(-1.2));
        assert!(quote.trailing_pe.is_none());
        assert!(quote.shares_outstanding.is_none());
        assert!(quote.as_of.is_none());
    }

    #[tokio::test]
    async fn test_unknown_ticker() {
        let mock_server = create_mock_server(
            "INVALID",
            ResponseTemplate::new(200).set_body_string(r#"{"body": []}"#),
        )
        .await;

        let result = provider(&mock_server).fetch_quote("INVALID").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No quote data found for symbol: INVALID"
        );
    }

    #[tokio::test]
    async fn test_ticker_is_encoded_in_query() {
        let mock_response = r#"{
            "body": [{
                "symbol": "M&M.NS",
                "regularMarketPrice": 2900.0,
                "epsTrailingTwelveMonths": 95.0
            }]
        }"#;
        let mock_server = create_mock_server(
            "M&M.NS",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let quote = provider(&mock_server).fetch_quote("M&M.NS").await.unwrap();
        assert_eq!(quote.symbol, "M&M.NS");
        assert_eq!(quote.eps, Some(95.0));
    }

    #[tokio::test]
    async fn test_quote_for_other_symbol_is_rejected() {
        let mock_response = r#"{"body": [{"symbol": "M", "regularMarketPrice": 20.0}]}"#;
        let mock_server = create_mock_server(
            "M&M.NS",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let result = provider(&mock_server).fetch_quote("M&M.NS").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Quote returned for M instead of requested symbol: M&M.NS"
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let mock_server = create_mock_server("AAPL", ResponseTemplate::new(403)).await;

        let result = provider(&mock_server).fetch_quote("AAPL").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "API credentials rejected (403 Forbidden) for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = create_mock_server("AAPL", ResponseTemplate::new(429)).await;

        let result = provider(&mock_server).fetch_quote("AAPL").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Rate limit exceeded for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = create_mock_server("AAPL", ResponseTemplate::new(500)).await;

        let result = provider(&mock_server).fetch_quote("AAPL").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(
            "AAPL",
            ResponseTemplate::new(200).set_body_string(r#"{"results": []}"#),
        )
        .await;

        let result = provider(&mock_server).fetch_quote("AAPL").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for AAPL")
        );
    }
}
