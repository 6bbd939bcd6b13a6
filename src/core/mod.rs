//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod quote;
pub mod valuation;

// Re-export main types for cleaner imports
pub use quote::{Quote, QuoteProvider};
pub use valuation::{
    Estimate, ValuationAssumptions, ValuationMethod, ValuationParameters, ValuationResult,
};
