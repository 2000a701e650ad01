//! Core business logic abstractions

pub mod cleaning;
pub mod config;
pub mod dataset;
pub mod log;
pub mod model;
pub mod numerals;
pub mod rate;

// Re-export main types for cleaner imports
pub use cleaning::{CacheLayout, CleanOutcome, clean};
pub use dataset::{Dataset, HouseRecord};
pub use model::{HouseFeatures, ModelScore, PricePredictor};
pub use rate::{ExchangeRateProvider, RateQuote, RateSource};
