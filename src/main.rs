use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use car_price_api::model::Predictor;
use car_price_api::types::{missing_fields, ApiError, Health, ModelInfo, PredictRequest};

// ---------- Server state ----------

#[derive(Clone)]
struct AppState {
    predictor: Arc<Predictor>,
}

// ---------- Handlers ----------

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(state.predictor.health())
}

async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.predictor.model_info())
}

async fn predict(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    // Validate before any decoding so the caller gets the full list of
    // missing fields in one round trip.
    let missing = missing_fields(&body);
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let req: PredictRequest = serde_json::from_value(body.clone())
        .map_err(|e| ApiError::Scoring(anyhow::anyhow!("invalid field value: {e}")))?;

    tracing::debug!(brand = %req.brand, model = %req.model, "predict request");
    let prediction = state.predictor.predict(&req)?;

    let mut out = serde_json::to_value(&prediction)
        .map_err(|e| ApiError::Scoring(anyhow::anyhow!("failed to encode response: {e}")))?;
    // Echo the raw request back for reference.
    out["input"] = body;
    Ok(Json(out))
}

// ---------- CORS ----------

const ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _req: &axum::http::request::Parts| match origin.to_str() {
                Ok(o) => {
                    ALLOWED_ORIGINS.contains(&o)
                        || (o.starts_with("https://") && o.ends_with(".vercel.app"))
                }
                Err(_) => false,
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

// ---------- Startup ----------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let model_path = std::env::var("MODEL_PATH")
        .unwrap_or_else(|_| "data/car_price_model.json".to_string());
    let artifacts_path = std::env::var("ARTIFACTS_PATH")
        .unwrap_or_else(|_| "data/car_price_artifacts.json".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);

    // Load failure here is fatal: the service never serves without a model.
    let predictor = Predictor::load(&model_path, &artifacts_path)?;

    let state = AppState {
        predictor: Arc::new(predictor),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/model-info", get(model_info))
        .route("/predict", post(predict))
        .layer(cors_layer())
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
