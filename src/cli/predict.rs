use super::describe::InputRanges;
use super::ui;
use crate::core::model::compare_models;
use crate::core::{Dataset, HouseFeatures, ModelScore, PricePredictor};
use crate::models::load_pipeline;
use anyhow::{Result, anyhow, bail};
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::{debug, error};

/// House description given on the command line. Unset fields fall back to
/// the first allowed value, amenities default to present.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub area: Option<f64>,
    pub room: Option<i64>,
    pub address: Option<String>,
    pub parking: bool,
    pub warehouse: bool,
    pub elevator: bool,
}

impl Default for PredictRequest {
    fn default() -> Self {
        PredictRequest {
            area: None,
            room: None,
            address: None,
            parking: true,
            warehouse: true,
            elevator: true,
        }
    }
}

impl PredictRequest {
    /// Checks the request against what the cleaned dataset contains.
    pub fn resolve(&self, ranges: &InputRanges) -> Result<HouseFeatures> {
        let area = self.area.unwrap_or(ranges.min_area);
        if !(ranges.min_area..=ranges.max_area).contains(&area) {
            bail!(
                "Area {} is outside the dataset range {} to {}",
                area,
                ranges.min_area,
                ranges.max_area
            );
        }

        let room = match self.room {
            Some(room) if ranges.rooms.contains(&room) => room,
            Some(room) => bail!("No houses with {} rooms in the dataset", room),
            None => *ranges
                .rooms
                .first()
                .ok_or_else(|| anyhow!("Dataset has no room values"))?,
        };

        let address = match &self.address {
            Some(address) => ranges
                .addresses
                .iter()
                .find(|a| a.eq_ignore_ascii_case(address))
                .cloned()
                .ok_or_else(|| anyhow!("Unknown address: {}", address))?,
            None => ranges
                .addresses
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("Dataset has no addresses"))?,
        };

        Ok(HouseFeatures {
            area,
            room,
            parking: self.parking,
            warehouse: self.warehouse,
            elevator: self.elevator,
            address,
        })
    }
}

fn load_models(paths: &[PathBuf]) -> Result<Vec<Box<dyn PricePredictor>>> {
    paths
        .iter()
        .map(|path| load_pipeline(path).map(|p| Box::new(p) as Box<dyn PricePredictor>))
        .collect()
}

fn evaluate(
    dataset: &Dataset,
    model_paths: &[PathBuf],
    sample: &HouseFeatures,
) -> Result<Vec<ModelScore>> {
    let models = load_models(model_paths)?;
    let pb = ui::new_progress_bar(models.len() as u64, true);
    pb.set_message("Scoring models...");
    let scores = compare_models(dataset, &models, sample, &|| pb.inc(1));
    pb.finish_and_clear();
    scores
}

pub fn display_scores(sample: &HouseFeatures, scores: &[ModelScore]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Model"),
        ui::header_cell("R2"),
        ui::header_cell("Predicted Price (IRR)"),
    ]);
    for score in scores {
        table.add_row(vec![
            Cell::new(&score.model),
            ui::score_cell(score.r2),
            ui::number_cell(ui::format_amount(score.predicted_price)),
        ]);
    }

    let amenities: Vec<&str> = [
        (sample.parking, "parking"),
        (sample.warehouse, "warehouse"),
        (sample.elevator, "elevator"),
    ]
    .into_iter()
    .filter_map(|(present, name)| present.then_some(name))
    .collect();
    let amenities = if amenities.is_empty() {
        "no amenities".to_string()
    } else {
        amenities.join(", ")
    };

    let mut output = format!(
        "{}\n{}\n\n",
        ui::style_text("Predicted House Price", ui::StyleType::Title),
        ui::style_text(
            &format!(
                "{} m², {} rooms, {}, {}",
                sample.area, sample.room, sample.address, amenities
            ),
            ui::StyleType::Subtle
        )
    );
    output.push_str(&table.to_string());
    output
}

pub fn run(dataset: &Dataset, model_paths: &[PathBuf], request: &PredictRequest) -> Result<()> {
    let ranges = InputRanges::from_dataset(dataset)
        .ok_or_else(|| anyhow!("The cleaned dataset is empty, nothing to predict from"))?;
    let sample = request.resolve(&ranges)?;
    debug!(?sample, "Prediction input");

    match evaluate(dataset, model_paths, &sample) {
        Ok(scores) => println!("{}", display_scores(&sample, &scores)),
        Err(e) => {
            // Model problems are reported to the user without failing the command.
            error!(error = %e, "Model evaluation failed");
            println!(
                "{}",
                ui::style_text(
                    &format!("An error occurred during model loading or prediction: {e}"),
                    ui::StyleType::Error
                )
            );
        }
    }
    Ok(())
}
