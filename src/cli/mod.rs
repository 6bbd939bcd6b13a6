pub mod setup;
pub mod tickers;
pub mod ui;
pub mod value;
