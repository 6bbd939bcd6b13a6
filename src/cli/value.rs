use super::ui;
use crate::core::config::AppConfig;
use crate::core::valuation::{self, ValuationMethod};
use crate::core::{
    Estimate, Quote, QuoteProvider, ValuationAssumptions, ValuationParameters, ValuationResult,
};
use anyhow::{Result, bail};
use comfy_table::Cell;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

/// Options of the `value` command as typed by the user.
///
/// Rates stay raw text so that unparseable input can fall back to zero
/// instead of rejecting the whole command.
#[derive(Debug, Clone, Default)]
pub struct ValueOptions {
    pub tickers: Vec<String>,
    pub growth_rate: Option<String>,
    pub discount_rate: Option<String>,
    pub terminal_growth_rate: Option<String>,
    pub json: bool,
}

impl ValueOptions {
    /// Applies the rates given on the command line over `defaults`.
    pub fn parameters(&self, defaults: &ValuationParameters) -> ValuationParameters {
        let pick = |input: &Option<String>, name: &str, default: f64| {
            input
                .as_deref()
                .map_or(default, |text| parse_percent(text, name))
        };
        ValuationParameters {
            growth_rate: pick(&self.growth_rate, "growth rate", defaults.growth_rate),
            discount_rate: pick(&self.discount_rate, "discount rate", defaults.discount_rate),
            terminal_growth_rate: pick(
                &self.terminal_growth_rate,
                "terminal growth rate",
                defaults.terminal_growth_rate,
            ),
        }
    }

    /// Requested tickers, upper-cased and deduplicated in order. Falls back
    /// to the configured default ticker.
    pub fn tickers(&self, config: &AppConfig) -> Vec<String> {
        let mut tickers: Vec<String> = Vec::new();
        for ticker in &self.tickers {
            let ticker = ticker.trim().to_uppercase();
            if !ticker.is_empty() && !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
        if tickers.is_empty() {
            tickers.push(config.default_ticker.to_uppercase());
        }
        tickers
    }
}

/// Parses a percentage typed by the user, treating anything unparseable as 0.
pub fn parse_percent(text: &str, name: &str) -> f64 {
    match text.trim().trim_end_matches('%').trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!("Invalid {name} '{text}', using 0");
            0.0
        }
    }
}

/// A quote together with the estimates computed from it.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationReport {
    pub quote: Quote,
    pub parameters: ValuationParameters,
    pub estimates: ValuationResult,
}

impl ValuationReport {
    pub fn new(
        quote: Quote,
        parameters: &ValuationParameters,
        assumptions: &ValuationAssumptions,
    ) -> Self {
        let estimates = valuation::evaluate(&quote, parameters, assumptions);
        ValuationReport {
            quote,
            parameters: *parameters,
            estimates,
        }
    }

    /// Percentage by which `estimate` exceeds the current price.
    pub fn upside(&self, estimate: Estimate) -> Option<f64> {
        self.quote
            .price
            .filter(|price| *price > 0.0)
            .map(|price| (estimate.value() - price) / price * 100.0)
    }

    pub fn display_as_table(&self) -> String {
        let quote = &self.quote;
        let currency = quote.currency.as_deref().unwrap_or("");
        let money = |v: f64| format!("{v:.2} {currency}").trim_end().to_string();

        let mut quote_table = ui::new_styled_table();
        quote_table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
        let rows = [
            ("Current Price", ui::format_optional_cell(quote.price, money)),
            ("EPS (TTM)", ui::format_optional_cell(quote.eps, money)),
            (
                "Trailing P/E",
                ui::format_optional_cell(quote.trailing_pe, |v| format!("{v:.2}")),
            ),
            (
                "Forward P/E",
                ui::format_optional_cell(quote.forward_pe, |v| format!("{v:.2}")),
            ),
            (
                "Market Cap",
                ui::format_optional_cell(quote.market_cap, |v| {
                    format!("{} {currency}", ui::format_thousands(v))
                        .trim_end()
                        .to_string()
                }),
            ),
            (
                "Dividend Yield",
                ui::format_optional_cell(quote.dividend_yield, |v| format!("{v:.2}%")),
            ),
            (
                "Shares Outstanding",
                ui::format_optional_cell(quote.shares_outstanding, ui::format_thousands),
            ),
        ];
        for (label, cell) in rows {
            quote_table.add_row(vec![Cell::new(label), cell]);
        }

        let mut value_table = ui::new_styled_table();
        value_table.set_header(vec![
            ui::header_cell("Method"),
            ui::header_cell("Intrinsic Value"),
            ui::header_cell("Upside (%)"),
        ]);
        for method in ValuationMethod::ALL {
            let estimate = self.estimates.get(method);
            let value_cell = ui::format_optional_cell(estimate, |e| {
                format!("{e} {currency}").trim_end().to_string()
            });
            let upside_cell = estimate
                .and_then(|e| self.upside(e))
                .map_or(ui::na_cell(), ui::change_cell);
            value_table.add_row(vec![Cell::new(method.to_string()), value_cell, upside_cell]);
        }

        let title = match &quote.short_name {
            Some(name) => format!("{} ({name})", quote.symbol),
            None => quote.symbol.clone(),
        };
        let mut output = format!("Ticker: {}\n", ui::style_text(&title, ui::StyleType::Title));
        if let Some(as_of) = quote.as_of {
            output.push_str(&ui::style_text(
                &format!("As of {}", as_of.format("%Y-%m-%d %H:%M UTC")),
                ui::StyleType::Subtle,
            ));
            output.push('\n');
        }
        output.push('\n');
        output.push_str(&quote_table.to_string());
        output.push_str(&format!(
            "\n\n{}\n",
            ui::style_text("Intrinsic Value Calculations", ui::StyleType::Label)
        ));
        output.push_str(&value_table.to_string());

        let params = &self.parameters;
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Growth {:.2}%, discount {:.2}%, terminal growth {:.2}%",
                    params.growth_rate, params.discount_rate, params.terminal_growth_rate
                ),
                ui::StyleType::Subtle,
            )
        ));

        output
    }
}

/// Fetches every ticker concurrently and values each quote that arrives.
///
/// Results keep the order of `tickers`. A failed fetch is reported in place
/// and never reaches the valuation.
pub async fn build_reports(
    tickers: &[String],
    provider: &(dyn QuoteProvider + Send + Sync),
    parameters: &ValuationParameters,
    assumptions: &ValuationAssumptions,
) -> Vec<(String, Result<ValuationReport>)> {
    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Fetching quotes...");

    let futures = tickers.iter().map(|ticker| {
        let pb_clone = pb.clone();
        async move {
            let result = provider.fetch_quote(ticker).await;
            pb_clone.inc(1);
            (ticker.clone(), result)
        }
    });
    let fetched = join_all(futures).await;
    pb.finish_and_clear();

    fetched
        .into_iter()
        .map(|(ticker, result)| {
            let report = result.map(|quote| {
                debug!(symbol = %quote.symbol, "Valuing quote");
                ValuationReport::new(quote, parameters, assumptions)
            });
            (ticker, report)
        })
        .collect()
}

pub async fn run(
    config: &AppConfig,
    provider: &(dyn QuoteProvider + Send + Sync),
    options: &ValueOptions,
) -> Result<()> {
    let tickers = options.tickers(config);
    let parameters = options.parameters(&config.valuation.parameters);
    debug!(?tickers, ?parameters, "Valuing tickers");

    let reports = build_reports(
        &tickers,
        provider,
        &parameters,
        &config.valuation.assumptions,
    )
    .await;

    if options.json {
        let entries = reports
            .iter()
            .map(|(ticker, report)| match report {
                Ok(report) => serde_json::to_value(report),
                Err(e) => Ok(json!({ "symbol": ticker, "error": e.to_string() })),
            })
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let count = reports.len();
        for (i, (ticker, report)) in reports.iter().enumerate() {
            match report {
                Ok(report) => println!("{}", report.display_as_table()),
                Err(e) => println!(
                    "{}",
                    ui::style_text(
                        &format!("Error fetching stock data for {ticker}: {e}"),
                        ui::StyleType::Error,
                    )
                ),
            }
            if i < count - 1 {
                ui::print_separator();
            }
        }
    }

    if reports.iter().all(|(_, report)| report.is_err()) {
        bail!("Could not fetch stock data for any of: {}", tickers.join(", "));
    }
    Ok(())
}
