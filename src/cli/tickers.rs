use super::ui;
use crate::core::config::AppConfig;
use comfy_table::Cell;

/// Renders the configured ticker choices, marking the default one.
pub fn display_tickers(config: &AppConfig) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Ticker"), ui::header_cell("Default")]);

    for ticker in &config.tickers {
        let marker = if ticker.eq_ignore_ascii_case(&config.default_ticker) {
            "*"
        } else {
            ""
        };
        table.add_row(vec![Cell::new(ticker), Cell::new(marker)]);
    }

    table.to_string()
}

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    if config.tickers.is_empty() {
        println!("No tickers configured.");
        return Ok(());
    }
    println!("{}", display_tickers(config));
    Ok(())
}
