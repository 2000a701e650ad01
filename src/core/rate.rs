//! Exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Display;

/// Rials per USD that the raw dataset prices were recorded against.
pub const REFERENCE_RATE: f64 = 300_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Live,
    Fallback,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateSource::Live => write!(f, "live"),
            RateSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// A USD to IRR rate together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub rate: f64,
    pub source: RateSource,
    pub fetched_at: DateTime<Utc>,
}

impl RateQuote {
    pub fn live(rate: f64) -> Self {
        Self {
            rate,
            source: RateSource::Live,
            fetched_at: Utc::now(),
        }
    }

    pub fn fallback(rate: f64) -> Self {
        Self {
            rate,
            source: RateSource::Fallback,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }

    /// Ratio of this rate to the rate the raw prices were recorded against.
    pub fn coefficient(&self) -> f64 {
        self.rate / REFERENCE_RATE
    }
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Network failures resolve to a fallback quote rather than an error.
    async fn fetch_rate(&self) -> Result<RateQuote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient() {
        assert_eq!(RateQuote::live(600_000.0).coefficient(), 2.0);
        assert_eq!(RateQuote::fallback(REFERENCE_RATE).coefficient(), 1.0);
    }

    #[test]
    fn test_source_tagging() {
        assert!(RateQuote::fallback(REFERENCE_RATE).is_fallback());
        assert!(!RateQuote::live(1.0).is_fallback());
        assert_eq!(RateSource::Live.to_string(), "live");
        assert_eq!(RateSource::Fallback.to_string(), "fallback");
    }
}
