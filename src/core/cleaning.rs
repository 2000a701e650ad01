//! Turns the raw house price CSV into a cleaned, cached dataset.

use crate::core::dataset::{self, Dataset, HouseRecord, RawRecord};
use crate::core::numerals::to_latin_digits;
use crate::core::rate::{ExchangeRateProvider, RateQuote};
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static NON_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D").unwrap());

/// Multiplier of the interquartile range used for the outlier fences.
pub const IQR_THRESHOLD: f64 = 1.5;

/// How the cleaned cache file is located next to the raw dataset.
///
/// `Legacy` keeps the historical behaviour where the file looked up before
/// cleaning and the file written after cleaning have different names: the
/// write path joins the directory and file name without a separator, so a
/// cache written by one run is never found by the next. `Sibling` reads and
/// writes `cleaned_<name>` next to the raw dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLayout {
    #[default]
    Legacy,
    Sibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub read: PathBuf,
    pub write: PathBuf,
}

impl CachePaths {
    pub fn for_dataset(path: &Path, layout: CacheLayout) -> Result<Self> {
        let base_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Dataset path has no file name: {}", path.display()))?;
        let cache_name = format!("cleaned_{base_name}");

        match layout {
            CacheLayout::Legacy => {
                let full = path.to_string_lossy();
                let full: &str = &full;
                let dir = full.rsplit_once('/').map_or(full, |(dir, _)| dir);
                Ok(Self {
                    read: PathBuf::from(format!("{dir}/{cache_name}")),
                    write: PathBuf::from(format!("{dir}{cache_name}")),
                })
            }
            CacheLayout::Sibling => {
                let cache = path.with_file_name(cache_name);
                Ok(Self {
                    read: cache.clone(),
                    write: cache,
                })
            }
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.read == self.write
    }
}

/// Row counts after each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub raw_rows: usize,
    pub after_missing: usize,
    pub after_duplicates: usize,
    pub after_price_outliers: usize,
    pub after_area_outliers: usize,
}

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub dataset: Dataset,
    pub cache: CachePaths,
    pub from_cache: bool,
    /// `None` when the dataset was served from cache.
    pub rate: Option<RateQuote>,
    pub report: Option<CleaningReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Price,
    Area,
}

impl Column {
    fn value(&self, record: &HouseRecord) -> f64 {
        match self {
            Column::Price => record.price,
            Column::Area => record.area,
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Column::Price => write!(f, "Price"),
            Column::Area => write!(f, "Area"),
        }
    }
}

/// Extracts the numeric area from free text.
///
/// Persian digits are read as their Latin equivalents. Trailing unit tokens
/// (any whitespace-separated token containing a letter, like `m2` or `m²`) are
/// dropped, then every non-digit in what remains is removed. So `"1,000"` and
/// `"1 000"` are `1000` and `"123 m2"` is `123`.
pub fn parse_area(raw: &str) -> Option<f64> {
    let text = to_latin_digits(raw);
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    while tokens
        .last()
        .is_some_and(|t| t.chars().any(char::is_alphabetic))
    {
        tokens.pop();
    }
    let digits = NON_DIGITS.replace_all(&tokens.concat(), "").into_owned();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// Quantile of already sorted values, interpolating linearly between ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// First and third quartiles of `values`.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((quantile(&sorted, 0.25)?, quantile(&sorted, 0.75)?))
}

/// Inclusive `[Q1 - t*IQR, Q3 + t*IQR]` fences.
pub fn iqr_bounds(values: &[f64], threshold: f64) -> Option<(f64, f64)> {
    let (q1, q3) = quartiles(values)?;
    let iqr = q3 - q1;
    Some((q1 - threshold * iqr, q3 + threshold * iqr))
}

/// Drops every record whose `column` lies outside the IQR fences of the
/// records passed in.
pub fn remove_outliers(
    records: Vec<HouseRecord>,
    column: Column,
    threshold: f64,
) -> Vec<HouseRecord> {
    let values: Vec<f64> = records.iter().map(|r| column.value(r)).collect();
    let Some((lower, upper)) = iqr_bounds(&values, threshold) else {
        return records;
    };
    debug!(%column, lower, upper, "Outlier fences");
    records
        .into_iter()
        .filter(|r| {
            let value = column.value(r);
            value >= lower && value <= upper
        })
        .collect()
}

fn rescale_prices(records: &mut [RawRecord], quote: &RateQuote) {
    let coefficient = quote.coefficient();
    for record in records.iter_mut() {
        record.price = record.price.map(|p| p * coefficient * 10.0);
    }
}

/// Coerces `Area` and keeps the row only when no field is missing.
fn complete_record(raw: RawRecord) -> Option<HouseRecord> {
    Some(HouseRecord {
        area: raw.area.as_deref().and_then(parse_area)?,
        room: raw.room?,
        parking: raw.parking?,
        warehouse: raw.warehouse?,
        elevator: raw.elevator?,
        address: raw.address?,
        price: raw.price.filter(|p| !p.is_nan())?,
    })
}

/// Runs every cleaning step on raw records already loaded in memory.
pub fn clean_records(
    mut raw: Vec<RawRecord>,
    quote: &RateQuote,
) -> (Dataset, CleaningReport) {
    let mut report = CleaningReport {
        raw_rows: raw.len(),
        ..Default::default()
    };

    rescale_prices(&mut raw, quote);

    let records: Vec<HouseRecord> = raw.into_iter().filter_map(complete_record).collect();
    report.after_missing = records.len();

    let mut dataset = Dataset::new(records);
    dataset.dedup();
    report.after_duplicates = dataset.len();

    let records = remove_outliers(dataset.into_records(), Column::Price, IQR_THRESHOLD);
    report.after_price_outliers = records.len();
    let records = remove_outliers(records, Column::Area, IQR_THRESHOLD);
    report.after_area_outliers = records.len();

    debug!(?report, "Cleaning finished");
    (Dataset::new(records), report)
}

/// Loads the cleaned dataset for the raw CSV at `path`.
///
/// If the cache file exists it is returned as is, even when the raw file has
/// changed since. Otherwise the raw file is cleaned using the rate from
/// `provider` and the result is written to the cache write path.
pub async fn clean(
    path: &Path,
    provider: &(dyn ExchangeRateProvider + Send + Sync),
    layout: CacheLayout,
) -> Result<CleanOutcome> {
    let cache = CachePaths::for_dataset(path, layout)?;

    if cache.read.exists() {
        info!("Using cleaned dataset cache at {}", cache.read.display());
        let dataset = Dataset::load(&cache.read)?;
        return Ok(CleanOutcome {
            dataset,
            cache,
            from_cache: true,
            rate: None,
            report: None,
        });
    }
    debug!("No cleaned dataset at {}", cache.read.display());

    let raw = dataset::read_raw_records(path)?;
    let quote = provider.fetch_rate().await?;
    info!(rate = quote.rate, source = %quote.source, "Rescaling prices");

    let (dataset, report) = clean_records(raw, &quote);
    info!(
        "Cleaned {} rows down to {}",
        report.raw_rows, report.after_area_outliers
    );

    dataset
        .save(&cache.write)
        .with_context(|| format!("Failed to save cleaned dataset to {}", cache.write.display()))?;
    if !cache.is_consistent() {
        warn!(
            "Cleaned dataset written to {} but later runs look for {}",
            cache.write.display(),
            cache.read.display()
        );
    }

    Ok(CleanOutcome {
        dataset,
        cache,
        from_cache: false,
        rate: Some(quote),
        report: Some(report),
    })
}
