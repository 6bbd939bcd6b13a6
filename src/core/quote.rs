//! Quote snapshot and the provider abstraction that produces it

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market fundamentals for one ticker as returned by a single fetch.
///
/// Every market field is optional since providers omit or null them freely.
/// A newer fetch replaces the whole snapshot; nothing is merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub short_name: Option<String>,
    pub currency: Option<String>,
    pub price: Option<f64>,
    pub eps: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub market_cap: Option<f64>,
    /// Percent, e.g. 0.5 for a 0.5% yield.
    pub dividend_yield: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub as_of: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn new(symbol: &str) -> Self {
        Quote {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    pub fn has_market_data(&self) -> bool {
        [
            self.price,
            self.eps,
            self.trailing_pe,
            self.forward_pe,
            self.market_cap,
            self.dividend_yield,
            self.shares_outstanding,
        ]
        .iter()
        .any(Option::is_some)
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;
}
