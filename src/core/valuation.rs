//! Intrinsic value estimates derived from a quote snapshot.
//!
//! The four estimates are independent of each other. A missing or unusable
//! input only removes the estimates that depend on it, so callers always get
//! back whatever could be computed.
use crate::core::quote::Quote;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{self, Display};
use tracing::debug;

/// Price-to-earnings multiple assumed by the P/E method.
pub const PE_MULTIPLE: f64 = 15.0;

/// Graham's multiple for a company with no expected growth.
pub const GRAHAM_BASE_MULTIPLE: f64 = 8.5;

/// Number of explicitly projected periods in the DCF model.
pub const PROJECTION_PERIODS: usize = 5;

/// User-tunable assumptions, all expressed as percentages (10 means 10%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationParameters {
    pub growth_rate: f64,
    pub discount_rate: f64,
    pub terminal_growth_rate: f64,
}

impl Default for ValuationParameters {
    fn default() -> Self {
        ValuationParameters {
            growth_rate: 10.0,
            discount_rate: 10.0,
            terminal_growth_rate: 2.0,
        }
    }
}

/// Free cash flows projected for each period of the DCF horizon, in order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectedCashFlows([f64; PROJECTION_PERIODS]);

impl ProjectedCashFlows {
    pub fn new(flows: [f64; PROJECTION_PERIODS]) -> Self {
        ProjectedCashFlows(flows)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for ProjectedCashFlows {
    fn default() -> Self {
        ProjectedCashFlows([10.0, 12.0, 14.0, 16.0, 18.0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSheetAssumption {
    pub total_assets: f64,
    pub total_liabilities: f64,
}

impl BalanceSheetAssumption {
    pub fn net_assets(&self) -> f64 {
        self.total_assets - self.total_liabilities
    }
}

impl Default for BalanceSheetAssumption {
    fn default() -> Self {
        BalanceSheetAssumption {
            total_assets: 5_000_000_000.0,
            total_liabilities: 2_000_000_000.0,
        }
    }
}

/// Figures used by the valuation that do not come from the quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationAssumptions {
    pub cash_flows: ProjectedCashFlows,
    pub balance_sheet: BalanceSheetAssumption,
}

/// A per-share value rounded to cents.
///
/// Displays and serializes with exactly two fractional digits, e.g. `5.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Estimate(Decimal);

impl Estimate {
    /// Rounds the exact binary value of `value` to cents, half away from
    /// zero, so `1.005` (stored as 1.00499...) gives `1.00`. Returns `None`
    /// for values that are not finite or do not fit a decimal.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let mut rounded = Decimal::from_f64_retain(value)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        Some(Estimate(rounded))
    }

    pub fn value(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Estimate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValuationMethod {
    PeMultiple,
    DiscountedCashFlow,
    Graham,
    NetAssetValue,
}

impl ValuationMethod {
    pub const ALL: [ValuationMethod; 4] = [
        ValuationMethod::PeMultiple,
        ValuationMethod::DiscountedCashFlow,
        ValuationMethod::Graham,
        ValuationMethod::NetAssetValue,
    ];
}

impl Display for ValuationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ValuationMethod::PeMultiple => "P/E Method",
                ValuationMethod::DiscountedCashFlow => "Discounted Cash Flow (DCF)",
                ValuationMethod::Graham => "Benjamin Graham Formula",
                ValuationMethod::NetAssetValue => "Net Asset Value (NAV)",
            }
        )
    }
}

/// The four estimates for one quote. Absent fields could not be computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValuationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_method: Option<Estimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcf: Option<Estimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graham: Option<Estimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav: Option<Estimate>,
}

impl ValuationResult {
    pub fn get(&self, method: ValuationMethod) -> Option<Estimate> {
        match method {
            ValuationMethod::PeMultiple => self.pe_method,
            ValuationMethod::DiscountedCashFlow => self.dcf,
            ValuationMethod::Graham => self.graham,
            ValuationMethod::NetAssetValue => self.nav,
        }
    }

    pub fn is_empty(&self) -> bool {
        ValuationMethod::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Computes every estimate that the inputs allow.
///
/// This never fails: an absent or NaN EPS drops the P/E and Graham
/// estimates, a missing or non-positive share count drops NAV, and equal
/// discount and terminal growth rates drop DCF. A quote without any market
/// data yields an empty result.
pub fn evaluate(
    quote: &Quote,
    parameters: &ValuationParameters,
    assumptions: &ValuationAssumptions,
) -> ValuationResult {
    if !quote.has_market_data() {
        debug!(symbol = %quote.symbol, "Quote has no market data, skipping valuation");
        return ValuationResult::default();
    }

    let eps = quote.eps.filter(|eps| !eps.is_nan());
    if eps.is_none() {
        debug!(symbol = %quote.symbol, "EPS unavailable, skipping P/E and Graham estimates");
    }

    ValuationResult {
        pe_method: eps.and_then(pe_method),
        dcf: discounted_cash_flow(parameters, &assumptions.cash_flows),
        graham: eps.and_then(|eps| graham(eps, parameters.growth_rate)),
        nav: quote
            .shares_outstanding
            .and_then(|shares| net_asset_value(&assumptions.balance_sheet, shares)),
    }
}

pub fn pe_method(eps: f64) -> Option<Estimate> {
    Estimate::from_f64(eps * PE_MULTIPLE)
}

/// Present value of the projected cash flows plus a perpetuity-growth
/// terminal value, discounted from the end of the horizon.
pub fn discounted_cash_flow(
    parameters: &ValuationParameters,
    cash_flows: &ProjectedCashFlows,
) -> Option<Estimate> {
    if parameters.discount_rate == parameters.terminal_growth_rate {
        debug!(
            rate = parameters.discount_rate,
            "Discount rate equals terminal growth rate, terminal value undefined"
        );
        return None;
    }

    let r = parameters.discount_rate / 100.0;
    let g = parameters.terminal_growth_rate / 100.0;
    let flows = cash_flows.as_slice();

    let terminal_value = flows.last()? * (1.0 + g) / (r - g);
    let present_value_of_flows: f64 = flows
        .iter()
        .zip(1..)
        .map(|(flow, period)| flow / (1.0 + r).powi(period))
        .sum();
    let present_value_of_terminal = terminal_value / (1.0 + r).powi(flows.len() as i32);

    Estimate::from_f64(present_value_of_flows + present_value_of_terminal)
}

/// Graham's formula with `growth_rate` as a whole percentage (10, not 0.10).
pub fn graham(eps: f64, growth_rate: f64) -> Option<Estimate> {
    Estimate::from_f64(eps * (GRAHAM_BASE_MULTIPLE + 2.0 * growth_rate))
}

pub fn net_asset_value(
    balance_sheet: &BalanceSheetAssumption,
    shares_outstanding: f64,
) -> Option<Estimate> {
    if !(shares_outstanding > 0.0) {
        debug!(shares_outstanding, "Share count unusable, skipping NAV estimate");
        return None;
    }
    Estimate::from_f64(balance_sheet.net_assets() / shares_outstanding)
}
