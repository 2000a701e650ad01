//! House records as read from the raw dataset and as written to the cleaned cache.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Columns the raw dataset must carry.
pub const RAW_COLUMNS: [&str; 8] = [
    "Area",
    "Room",
    "Parking",
    "Warehouse",
    "Elevator",
    "Address",
    "Price",
    "Price(USD)",
];

/// Columns of a cleaned dataset, in output order.
pub const CLEAN_COLUMNS: [&str; 7] = [
    "Area",
    "Room",
    "Parking",
    "Warehouse",
    "Elevator",
    "Address",
    "Price",
];

/// One row of the raw dataset. Every field may be missing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Area")]
    pub area: Option<String>,
    #[serde(rename = "Room")]
    pub room: Option<i64>,
    #[serde(rename = "Parking", deserialize_with = "optional_flag")]
    pub parking: Option<bool>,
    #[serde(rename = "Warehouse", deserialize_with = "optional_flag")]
    pub warehouse: Option<bool>,
    #[serde(rename = "Elevator", deserialize_with = "optional_flag")]
    pub elevator: Option<bool>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<f64>,
}

/// One fully populated row of a cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseRecord {
    #[serde(rename = "Area")]
    pub area: f64,
    #[serde(rename = "Room")]
    pub room: i64,
    #[serde(rename = "Parking", serialize_with = "write_flag", deserialize_with = "flag")]
    pub parking: bool,
    #[serde(rename = "Warehouse", serialize_with = "write_flag", deserialize_with = "flag")]
    pub warehouse: bool,
    #[serde(rename = "Elevator", serialize_with = "write_flag", deserialize_with = "flag")]
    pub elevator: bool,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Price")]
    pub price: f64,
}

type RecordKey = (u64, i64, bool, bool, bool, String, u64);

impl HouseRecord {
    fn key(&self) -> RecordKey {
        (
            self.area.to_bits(),
            self.room,
            self.parking,
            self.warehouse,
            self.elevator,
            self.address.clone(),
            self.price.to_bits(),
        )
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_flag(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid boolean: {value}"))),
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid boolean: {raw}")))
}

fn write_flag<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *value { "True" } else { "False" })
}

fn check_columns(headers: &csv::StringRecord, required: &[&str], path: &Path) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h.trim() == *column))
        .collect();
    if !missing.is_empty() {
        bail!(
            "Dataset {} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        );
    }
    Ok(())
}

/// Reads every row of a raw dataset CSV.
pub fn read_raw_records(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    check_columns(reader.headers()?, &RAW_COLUMNS, path)?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<RawRecord>().enumerate() {
        let record = row.with_context(|| {
            format!("Failed to parse row {} of {}", line + 1, path.display())
        })?;
        records.push(record);
    }
    debug!("Read {} raw rows from {}", records.len(), path.display());
    Ok(records)
}

/// An ordered table of cleaned house records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<HouseRecord>,
}

impl Dataset {
    pub fn new(records: Vec<HouseRecord>) -> Self {
        Self { records }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(path)
            .with_context(|| format!("Failed to open cleaned dataset: {}", path.display()))?;
        check_columns(reader.headers()?, &CLEAN_COLUMNS, path)?;

        let records = reader
            .deserialize::<HouseRecord>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse cleaned dataset: {}", path.display()))?;
        debug!("Loaded {} cleaned rows from {}", records.len(), path.display());
        Ok(Self { records })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        if self.records.is_empty() {
            writer.write_record(CLEAN_COLUMNS)?;
        }
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Saved {} rows to {}", self.records.len(), path.display());
        Ok(())
    }

    pub fn records(&self) -> &[HouseRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<HouseRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.price).collect()
    }

    /// Smallest and largest `Area`, `None` when the dataset is empty.
    pub fn area_range(&self) -> Option<(f64, f64)> {
        self.records.iter().map(|r| r.area).fold(None, |acc, area| {
            Some(match acc {
                None => (area, area),
                Some((lo, hi)) => (lo.min(area), hi.max(area)),
            })
        })
    }

    /// Distinct room counts in order of first appearance.
    pub fn distinct_rooms(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.room))
            .map(|r| r.room)
            .collect()
    }

    /// Distinct addresses in order of first appearance.
    pub fn distinct_addresses(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.address.as_str()))
            .map(|r| r.address.clone())
            .collect()
    }

    /// Keeps the first occurrence of every fully identical row.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.records.retain(|r| seen.insert(r.key()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(area: f64, room: i64, address: &str, price: f64) -> HouseRecord {
        HouseRecord {
            area,
            room,
            parking: true,
            warehouse: false,
            elevator: true,
            address: address.to_string(),
            price,
        }
    }

    #[test]
    fn test_read_raw_records() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("housePrice.csv");
        fs::write(
            &path,
            "Area,Room,Parking,Warehouse,Elevator,Address,Price,Price(USD)\n\
             63,1,True,True,True,Shahran,1850000000.0,61666.67\n\
             \"3,310,000,000\",2,False,True,False,,1.0,\n\
             N/A,,True,False,True,Pardis,,\n",
        )?;

        let records = read_raw_records(&path)?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].area.as_deref(), Some("63"));
        assert_eq!(records[0].room, Some(1));
        assert_eq!(records[0].parking, Some(true));
        assert_eq!(records[0].price, Some(1_850_000_000.0));
        assert_eq!(records[1].area.as_deref(), Some("3,310,000,000"));
        assert_eq!(records[1].elevator, Some(false));
        assert!(records[1].address.is_none());
        assert!(records[2].room.is_none());
        assert!(records[2].price.is_none());
        Ok(())
    }

    #[test]
    fn test_read_raw_records_missing_column() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("housePrice.csv");
        fs::write(&path, "Area,Room,Parking,Warehouse,Elevator,Address,Price\n")?;

        let err = read_raw_records(&path).unwrap_err();
        assert!(err.to_string().contains("missing required columns: Price(USD)"));
        Ok(())
    }

    #[test]
    fn test_read_raw_records_missing_file() {
        let result = read_raw_records(Path::new("/nonexistent/housePrice.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cleaned.csv");
        let dataset = Dataset::new(vec![
            record(63.0, 1, "Shahran", 18_500_000_000.0),
            record(120.0, 3, "Pardis", 3_000_000.5),
        ]);

        dataset.save(&path)?;
        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with("Area,Room,Parking,Warehouse,Elevator,Address,Price\n"));
        assert!(content.contains("True,False,True,Shahran"));

        let loaded = Dataset::load(&path)?;
        assert_eq!(loaded, dataset);
        Ok(())
    }

    #[test]
    fn test_save_empty_dataset_writes_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cleaned.csv");
        Dataset::default().save(&path)?;

        let loaded = Dataset::load(&path)?;
        assert!(loaded.is_empty());
        Ok(())
    }

    #[test]
    fn test_summaries() {
        let dataset = Dataset::new(vec![
            record(80.0, 2, "Shahran", 1.0),
            record(45.0, 1, "Pardis", 2.0),
            record(150.0, 2, "Shahran", 3.0),
        ]);
        assert_eq!(dataset.area_range(), Some((45.0, 150.0)));
        assert_eq!(dataset.distinct_rooms(), vec![2, 1]);
        assert_eq!(dataset.distinct_addresses(), vec!["Shahran", "Pardis"]);
        assert_eq!(dataset.prices(), vec![1.0, 2.0, 3.0]);
        assert_eq!(Dataset::default().area_range(), None);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut dataset = Dataset::new(vec![
            record(80.0, 2, "Shahran", 1.0),
            record(45.0, 1, "Pardis", 2.0),
            record(80.0, 2, "Shahran", 1.0),
            record(80.0, 2, "Shahran", 1.5),
        ]);
        dataset.dedup();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records()[0], record(80.0, 2, "Shahran", 1.0));
        assert_eq!(dataset.records()[2], record(80.0, 2, "Shahran", 1.5));
    }
}
