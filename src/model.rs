use std::collections::HashMap;
use std::fs;

use anyhow::{anyhow, Context, Result};
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use serde::Deserialize;

use crate::encoder;
use crate::types::{Health, ModelInfo, Prediction, PredictRequest};

/// Half-width of the symmetric confidence band, as a fraction of the point
/// estimate. Fixed at training time (holdout MAPE was ~9%).
pub const PRICE_BAND_FRACTION: f32 = 0.10;

/// Preprocessing artifacts produced alongside the trained model. Loaded once
/// at startup, read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifacts {
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub log_inputs: Vec<String>,
    pub was_price_logged: bool,
    #[serde(default)]
    pub ohe_cols: Vec<String>,
    // Recorded by the training pipeline but never consulted when encoding:
    // the pipeline emitted full one-hot blocks regardless of this flag.
    #[serde(default)]
    pub ohe_drop_first: bool,
    pub te_mapping: HashMap<String, ValueType>,
    pub te_global_mean: ValueType,
}

impl Artifacts {
    pub fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read artifacts at {path}"))?;
        let artifacts: Artifacts = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse artifacts at {path}"))?;
        Ok(artifacts)
    }

    /// Known brands, derived from the schema's brand-prefixed columns.
    /// Sorted, deduplicated.
    pub fn brand_names(&self) -> Vec<String> {
        let mut brands: Vec<String> = self
            .feature_columns
            .iter()
            .filter_map(|col| col.strip_prefix(encoder::BRAND_COLUMN_PREFIX))
            .map(str::to_string)
            .collect();
        brands.sort();
        brands.dedup();
        brands
    }
}

/// Thin wrapper over the serialized boosted-tree model: vector in, scalar out.
pub struct PriceModel {
    booster: GBDT,
}

impl PriceModel {
    pub fn load(path: &str) -> Result<Self> {
        let booster =
            GBDT::load_model(path).map_err(|e| anyhow!("failed to load model {path}: {e}"))?;
        Ok(Self { booster })
    }

    pub fn from_booster(booster: GBDT) -> Self {
        Self { booster }
    }

    pub fn score(&self, features: Vec<ValueType>) -> Result<ValueType> {
        let batch: DataVec = vec![Data::new_test_data(features, None)];
        let preds = self.booster.predict(&batch);
        preds.first().copied().context("model returned no prediction")
    }
}

/// Everything a request handler needs: the loaded model plus the encoding
/// artifacts. Built once at startup and shared read-only across requests.
pub struct Predictor {
    model: PriceModel,
    artifacts: Artifacts,
}

impl Predictor {
    pub fn new(model: PriceModel, artifacts: Artifacts) -> Self {
        Self { model, artifacts }
    }

    pub fn load(model_path: &str, artifacts_path: &str) -> Result<Self> {
        let artifacts = Artifacts::load(artifacts_path)?;
        let model = PriceModel::load(model_path)?;
        let predictor = Self::new(model, artifacts);

        // Sanity forward over a zero vector: a bad model/schema pairing
        // should fail at startup, not on the first request.
        predictor
            .model
            .score(vec![0.0; predictor.artifacts.feature_columns.len()])?;

        tracing::info!(
            features = predictor.artifacts.feature_columns.len(),
            known_models = predictor.artifacts.te_mapping.len(),
            log_transformed = predictor.artifacts.was_price_logged,
            "predictor ready"
        );
        Ok(predictor)
    }

    pub fn predict(&self, req: &PredictRequest) -> Result<Prediction> {
        let vector = encoder::encode(req, &self.artifacts);
        let score = self.model.score(vector)?;

        let predicted_price = if self.artifacts.was_price_logged {
            score.exp()
        } else {
            score
        };

        let margin = predicted_price * PRICE_BAND_FRACTION;
        let confidence = if self.artifacts.te_mapping.contains_key(&req.model) {
            "high"
        } else {
            "medium"
        };

        Ok(Prediction {
            predicted_price,
            min_price: predicted_price - margin,
            max_price: predicted_price + margin,
            confidence,
            currency: "USD",
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            features_count: self.artifacts.feature_columns.len(),
            features: self.artifacts.feature_columns.clone(),
            supported_brands: self.artifacts.brand_names(),
            supported_models_count: self.artifacts.te_mapping.len(),
            log_transformed: self.artifacts.was_price_logged,
            te_global_mean: self.artifacts.te_global_mean,
        }
    }

    pub fn health(&self) -> Health {
        Health {
            status: "healthy",
            model_loaded: true,
            features_count: self.artifacts.feature_columns.len(),
        }
    }
}
