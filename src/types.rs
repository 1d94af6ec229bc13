use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Fields that must be present in a /predict body. `isNew` is the only
/// optional input.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "brand",
    "model",
    "age",
    "mileage",
    "fuelType",
    "transmission",
    "power",
    "torque",
];

/// Returns the required fields absent from the raw request body, in
/// declaration order.
pub fn missing_fields(body: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .filter(|f| body.get(**f).is_none())
        .copied()
        .collect()
}

// Defaults match the training-time preprocessing; they only matter for
// fields the validator treats as optional, but the encoder keeps them for
// all inputs so it can never fail.
fn default_brand() -> String {
    "Toyota".to_string()
}
fn default_mileage() -> f32 {
    1.0
}
fn default_fuel() -> String {
    "Gasoline".to_string()
}
fn default_transmission() -> String {
    "A".to_string()
}
fn default_power() -> f32 {
    150.0
}
fn default_torque() -> f32 {
    200.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    #[serde(default = "default_brand")]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub age: f32,
    #[serde(default = "default_mileage")]
    pub mileage: f32,
    #[serde(default = "default_fuel")]
    pub fuel_type: String,
    #[serde(default = "default_transmission")]
    pub transmission: String,
    #[serde(default = "default_power")]
    pub power: f32,
    #[serde(default = "default_torque")]
    pub torque: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub predicted_price: f32,
    pub min_price: f32,
    pub max_price: f32,
    pub confidence: &'static str,
    pub currency: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub features_count: usize,
    pub features: Vec<String>,
    pub supported_brands: Vec<String>,
    pub supported_models_count: usize,
    pub log_transformed: bool,
    pub te_global_mean: f32,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model_loaded: bool,
    pub features_count: usize,
}

/// Request-boundary errors. Everything below the boundary is anyhow.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0}")]
    Scoring(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Scoring(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingFields(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            ApiError::Scoring(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string(), "type": "ScoringError" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
