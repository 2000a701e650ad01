//! Price model abstractions and scoring

use crate::core::dataset::{Dataset, HouseRecord};
use anyhow::{Result, bail};
use tracing::debug;

/// Inputs a price model is evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseFeatures {
    pub area: f64,
    pub room: i64,
    pub parking: bool,
    pub warehouse: bool,
    pub elevator: bool,
    pub address: String,
}

impl From<&HouseRecord> for HouseFeatures {
    fn from(record: &HouseRecord) -> Self {
        HouseFeatures {
            area: record.area,
            room: record.room,
            parking: record.parking,
            warehouse: record.warehouse,
            elevator: record.elevator,
            address: record.address.clone(),
        }
    }
}

pub trait PricePredictor: Send + Sync {
    fn name(&self) -> &str;
    fn predict(&self, features: &HouseFeatures) -> Result<f64>;
}

/// Coefficient of determination of `predicted` against `actual`.
///
/// Constant targets yield `1.0` for a perfect fit and `0.0` otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() {
        bail!(
            "Cannot score {} predictions against {} targets",
            predicted.len(),
            actual.len()
        );
    }
    if actual.is_empty() {
        bail!("Cannot score a model on an empty dataset");
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, y_hat)| (y - y_hat).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelScore {
    pub model: String,
    pub r2: f64,
    pub predicted_price: f64,
}

/// Scores every model on the whole dataset and predicts `sample` with each.
/// Results are ordered by R² descending. The first failing model aborts the run.
pub fn compare_models(
    dataset: &Dataset,
    models: &[Box<dyn PricePredictor>],
    sample: &HouseFeatures,
    on_progress: &dyn Fn(),
) -> Result<Vec<ModelScore>> {
    let actual = dataset.prices();
    let features: Vec<HouseFeatures> = dataset.records().iter().map(HouseFeatures::from).collect();

    let mut scores = Vec::with_capacity(models.len());
    for model in models {
        let predicted = features
            .iter()
            .map(|f| model.predict(f))
            .collect::<Result<Vec<_>>>()?;
        let r2 = r2_score(&actual, &predicted)?;
        let predicted_price = model.predict(sample)?;
        debug!(model = model.name(), r2, predicted_price, "Scored model");

        scores.push(ModelScore {
            model: model.name().to_string(),
            r2,
            predicted_price,
        });
        on_progress();
    }

    scores.sort_by(|a, b| b.r2.total_cmp(&a.r2));
    Ok(scores)
}
