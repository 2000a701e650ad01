//! Regression pipelines stored as JSON files.
//!
//! A pipeline bundles the feature encoding and the fitted regressor, so it can
//! be evaluated directly on raw [`HouseFeatures`].

use crate::core::model::{HouseFeatures, PricePredictor};
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Area,
    Room,
    Parking,
    Warehouse,
    Elevator,
    Address,
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearCoefficients {
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub room: f64,
    #[serde(default)]
    pub parking: f64,
    #[serde(default)]
    pub warehouse: f64,
    #[serde(default)]
    pub elevator: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: Feature,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("Regression tree has no nodes");
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                // Children must come after their parent, which also rules out cycles.
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        bail!("Tree node {index} points to invalid child {child}");
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, row: &impl Fn(Feature) -> Result<f64>) -> Result<f64> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row(*feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    /// One-hot encoded address plus a weight per numeric feature.
    Linear {
        intercept: f64,
        coefficients: LinearCoefficients,
        address_weights: HashMap<String, f64>,
    },
    /// Gradient boosted trees over target-encoded addresses.
    TreeEnsemble {
        base_score: f64,
        learning_rate: f64,
        address_encoding: HashMap<String, f64>,
        trees: Vec<RegressionTree>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(skip)]
    name: String,
    /// The regressor was fitted on `ln(price)`.
    #[serde(default)]
    pub log_target: bool,
    #[serde(flatten)]
    pub regressor: Regressor,
}

impl Pipeline {
    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let mut pipeline: Pipeline = serde_json::from_str(json)
            .map_err(|e| anyhow!("Failed to parse pipeline {}: {}", name, e))?;
        pipeline.name = name.to_string();
        if let Regressor::TreeEnsemble { trees, .. } = &pipeline.regressor {
            for tree in trees {
                tree.validate()
                    .with_context(|| format!("Invalid pipeline {name}"))?;
            }
        }
        Ok(pipeline)
    }

    fn raw_prediction(&self, features: &HouseFeatures) -> Result<f64> {
        match &self.regressor {
            Regressor::Linear {
                intercept,
                coefficients,
                address_weights,
            } => {
                let address = address_weights.get(&features.address).ok_or_else(|| {
                    anyhow!("Unknown address '{}' for model {}", features.address, self.name)
                })?;
                Ok(intercept
                    + coefficients.area * features.area
                    + coefficients.room * features.room as f64
                    + coefficients.parking * flag(features.parking)
                    + coefficients.warehouse * flag(features.warehouse)
                    + coefficients.elevator * flag(features.elevator)
                    + address)
            }
            Regressor::TreeEnsemble {
                base_score,
                learning_rate,
                address_encoding,
                trees,
            } => {
                let row = |feature: Feature| -> Result<f64> {
                    Ok(match feature {
                        Feature::Area => features.area,
                        Feature::Room => features.room as f64,
                        Feature::Parking => flag(features.parking),
                        Feature::Warehouse => flag(features.warehouse),
                        Feature::Elevator => flag(features.elevator),
                        Feature::Address => {
                            *address_encoding.get(&features.address).ok_or_else(|| {
                                anyhow!(
                                    "Unknown address '{}' for model {}",
                                    features.address,
                                    self.name
                                )
                            })?
                        }
                    })
                };
                let mut total = *base_score;
                for tree in trees {
                    total += learning_rate * tree.evaluate(&row)?;
                }
                Ok(total)
            }
        }
    }
}

impl PricePredictor for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &HouseFeatures) -> Result<f64> {
        let value = self.raw_prediction(features)?;
        Ok(if self.log_target { value.exp() } else { value })
    }
}

/// Display name of a model file: its stem up to the first underscore, so
/// `models/CatBoostRegressor_pipeline.json` is `CatBoostRegressor`.
pub fn model_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split('_').next().unwrap_or_default().to_string()
}

pub fn load_pipeline<P: AsRef<Path>>(path: P) -> Result<Pipeline> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;
    let pipeline = Pipeline::from_json(&model_name(path), &json)?;
    debug!(model = pipeline.name(), "Loaded model from {}", path.display());
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const LINEAR: &str = r#"{
        "kind": "linear",
        "intercept": 100.0,
        "coefficients": {"area": 2.0, "room": 10.0, "parking": 5.0, "elevator": 1.0},
        "address_weights": {"Shahran": 50.0, "Pardis": -20.0}
    }"#;

    const ENSEMBLE: &str = r#"{
        "kind": "tree_ensemble",
        "log_target": true,
        "base_score": 1.0,
        "learning_rate": 0.5,
        "address_encoding": {"Shahran": 3.0, "Pardis": 1.0},
        "trees": [
            {"nodes": [
                {"feature": "area", "threshold": 80.0, "left": 1, "right": 2},
                {"value": 0.0},
                {"value": 2.0}
            ]},
            {"nodes": [
                {"feature": "address", "threshold": 2.0, "left": 1, "right": 2},
                {"value": -2.0},
                {"value": 2.0}
            ]}
        ]
    }"#;

    fn house(area: f64, address: &str) -> HouseFeatures {
        HouseFeatures {
            area,
            room: 2,
            parking: true,
            warehouse: true,
            elevator: false,
            address: address.to_string(),
        }
    }

    #[test]
    fn test_linear_prediction() {
        let pipeline = Pipeline::from_json("Linear", LINEAR).unwrap();
        // 100 + 2*60 + 10*2 + 5 + 0 + 0 + 50
        assert_eq!(pipeline.predict(&house(60.0, "Shahran")).unwrap(), 295.0);
        assert_eq!(pipeline.predict(&house(60.0, "Pardis")).unwrap(), 225.0);
    }

    #[test]
    fn test_tree_ensemble_prediction() {
        let pipeline = Pipeline::from_json("Boost", ENSEMBLE).unwrap();
        // ln-space: 1 + 0.5*2 + 0.5*2 = 3
        let big = pipeline.predict(&house(120.0, "Shahran")).unwrap();
        assert!((big - 3.0_f64.exp()).abs() < 1e-9);
        // ln-space: 1 + 0.5*0 + 0.5*-2 = 0
        let small = pipeline.predict(&house(60.0, "Pardis")).unwrap();
        assert!((small - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_address_is_an_error() {
        let pipeline = Pipeline::from_json("Linear", LINEAR).unwrap();
        let err = pipeline.predict(&house(60.0, "Tajrish")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown address 'Tajrish' for model Linear");

        let pipeline = Pipeline::from_json("Boost", ENSEMBLE).unwrap();
        assert!(pipeline.predict(&house(60.0, "Tajrish")).is_err());
    }

    #[test]
    fn test_invalid_tree_is_rejected() {
        let json = r#"{
            "kind": "tree_ensemble",
            "base_score": 0.0,
            "learning_rate": 1.0,
            "address_encoding": {},
            "trees": [{"nodes": [{"feature": "room", "threshold": 1.0, "left": 0, "right": 5}]}]
        }"#;
        let err = Pipeline::from_json("Cyclic", json).unwrap_err();
        assert!(format!("{err:#}").contains("Tree node 0 points to invalid child 0"));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = Pipeline::from_json("Broken", r#"{"kind": "svm"}"#).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse pipeline Broken"));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(
            model_name(Path::new("models/GradientBoostingRegressor_pipeline.json")),
            "GradientBoostingRegressor"
        );
        assert_eq!(model_name(Path::new("Ridge.json")), "Ridge");
    }

    #[test]
    fn test_load_pipeline() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("KernelRidge_pipeline.json");
        fs::write(&path, LINEAR)?;

        let pipeline = load_pipeline(&path)?;
        assert_eq!(pipeline.name(), "KernelRidge");
        assert!(load_pipeline(dir.path().join("missing.json")).is_err());
        Ok(())
    }
}
