use intrinsic::AppCommand;
use intrinsic::cli::value::ValueOptions;
use std::fs;
use tracing::{error, info};

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/markets/stock/quotes"))
            .and(query_param("ticker", symbol))
            .and(header("X-RapidAPI-Host", "yahoo-finance15.p.rapidapi.com"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(base_url: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
        tickers: ["AAPL", "MSFT"]
        default_ticker: "AAPL"
        providers:
          yahoo:
            base_url: {base_url}
            api_key: "test-key"
        valuation:
          parameters:
            growth_rate: 10
            discount_rate: 10
            terminal_growth_rate: 2
    "#
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

const AAPL_RESPONSE: &str = r#"
{
    "meta": {"version": "v1.0", "status": 200},
    "body": [{
        "symbol": "AAPL",
        "shortName": "Apple Inc.",
        "currency": "USD",
        "regularMarketPrice": 175.5,
        "epsTrailingTwelveMonths": 5.0,
        "trailingPE": 35.1,
        "forwardPE": 28.4,
        "marketCap": 2700000000000,
        "dividendYield": 0.55,
        "sharesOutstanding": 1000000000,
        "regularMarketTime": 1700000000
    }]
}"#;

fn value_options(tickers: &[&str], json: bool) -> ValueOptions {
    ValueOptions {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        json,
        ..Default::default()
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_server("AAPL", AAPL_RESPONSE).await;
    let config_file = test_utils::write_config(&mock_server.uri());

    let result = intrinsic::run_command(
        AppCommand::Value(value_options(&["aapl"], false)),
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_default_ticker_json_flow_with_mock() {
    let mock_server = test_utils::create_mock_server("AAPL", AAPL_RESPONSE).await;
    let config_file = test_utils::write_config(&mock_server.uri());

    let result = intrinsic::run_command(
        AppCommand::Value(value_options(&[], true)),
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_unknown_ticker_fails() {
    let mock_server = test_utils::create_mock_server("NOPE", r#"{"body": []}"#).await;
    let config_file = test_utils::write_config(&mock_server.uri());

    let result = intrinsic::run_command(
        AppCommand::Value(value_options(&["NOPE"], false)),
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_tickers_command() {
    let config_file = test_utils::write_config("http://127.0.0.1:9");

    let result = intrinsic::run_command(
        AppCommand::Tickers,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok());
}

#[test_log::test(tokio::test)]
async fn test_invalid_config_path_fails() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, "tickers: [unterminated").expect("Failed to write config file");

    let result = intrinsic::run_command(AppCommand::Tickers, Some(config_path.to_str().unwrap())).await;
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("Failed to parse config file"));
}

#[test_log::test(tokio::test)]
async fn test_real_yahoo_rapidapi() {
    use intrinsic::core::QuoteProvider;
    use intrinsic::core::config::{API_KEY_ENV, AppConfig};
    use intrinsic::providers::yahoo_rapidapi::YahooRapidApiProvider;

    let Ok(api_key) = std::env::var(API_KEY_ENV) else {
        info!("{API_KEY_ENV} not set, skipping live API test");
        return;
    };

    let yahoo = AppConfig::default().providers.yahoo;
    let provider = YahooRapidApiProvider::new(&yahoo.base_url, &yahoo.host, &api_key);

    let symbol = "AAPL";
    info!(?symbol, "Fetching quote from RapidAPI");

    match provider.fetch_quote(symbol).await {
        Ok(quote) => {
            info!(?quote, "Received successful quote response");
            assert_eq!(quote.symbol, symbol);
            assert!(quote.price.is_some_and(|p| p > 0.0), "Price should be positive");
            assert!(quote.has_market_data());
        }
        Err(e) => {
            error!("API request failed: {e}\n{e:?}");
            panic!("API request failed: {e}");
        }
    }
}
