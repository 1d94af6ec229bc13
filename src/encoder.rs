use std::collections::HashMap;

use gbdt::decision_tree::ValueType;

use crate::model::Artifacts;
use crate::types::PredictRequest;

pub const BRAND_COLUMN_PREFIX: &str = "make_name_";

/// Fixed one-hot category lists the model was trained against. The artifact
/// bundle carries `ohe_cols` as well, but the training pipeline baked these
/// exact lists into the feature columns, so they are constants here just as
/// they were at training time.
pub const FUEL_CATEGORIES: [&str; 5] = [
    "Compressed Natural Gas",
    "Diesel",
    "Flex Fuel Vehicle",
    "Gasoline",
    "Hybrid",
];
pub const TRANSMISSION_CATEGORIES: [&str; 3] = ["CVT", "Dual Clutch", "M"];

/// Turkish UI labels → the English values used at training time. Unknown
/// labels pass through unchanged.
fn canonical_fuel(raw: &str) -> &str {
    match raw {
        "Benzin" => "Gasoline",
        "Dizel" => "Diesel",
        "Hibrit" => "Hybrid",
        "Flex Fuel (Çoklu Yakıt)" => "Flex Fuel Vehicle",
        "CNG (Doğalgaz)" => "Compressed Natural Gas",
        "Biyodizel" => "Biodiesel",
        other => other,
    }
}

fn transmission_code(raw: &str) -> &str {
    match raw {
        "Otomatik" => "A",
        "Manuel" => "M",
        "CVT (Sürekli Değişken)" => "CVT",
        "Çift Kavramalı (DSG)" => "Dual Clutch",
        other => other,
    }
}

/// Second-stage remap to the categories the model was trained on. "A" really
/// does land on "Dual Clutch": the training data was labeled that way, and
/// the already-trained model's columns depend on it.
fn transmission_category(code: &str) -> &'static str {
    match code {
        "M" => "M",
        "CVT" => "CVT",
        _ => "Dual Clutch",
    }
}

/// Maps a request to the ordered vector the model expects. Never fails:
/// unknown categoricals produce all-zero indicator blocks, unknown model
/// names fall back to the global target mean, and any schema slot not
/// computed here is emitted as 0.
pub fn encode(req: &PredictRequest, artifacts: &Artifacts) -> Vec<ValueType> {
    let mut features: HashMap<String, ValueType> = HashMap::new();

    features.insert("is_new".to_string(), if req.is_new { 1.0 } else { 0.0 });
    features.insert("age".to_string(), req.age);
    features.insert("power".to_string(), req.power);
    features.insert("torque".to_string(), req.torque);

    // log(mileage); floor at 1 so a zero/negative odometer never blows up.
    let mileage = if req.mileage <= 0.0 { 1.0 } else { req.mileage };
    features.insert("mileage".to_string(), mileage.ln());

    let te = artifacts
        .te_mapping
        .get(&req.model)
        .copied()
        .unwrap_or(artifacts.te_global_mean);
    features.insert("model_name_te".to_string(), te);

    tracing::debug!(
        brand = %req.brand,
        model = %req.model,
        is_new = req.is_new,
        age = req.age,
        log_mileage = mileage.ln(),
        te,
        "numeric features"
    );

    let fuel = canonical_fuel(&req.fuel_type);
    tracing::debug!("fuel type: {} -> {}", req.fuel_type, fuel);
    // The training pipeline emitted the full category block whether or not
    // ohe_drop_first was set; mirror that exactly.
    for cat in FUEL_CATEGORIES {
        features.insert(format!("fuel_type_{cat}"), (fuel == cat) as u8 as ValueType);
    }

    let code = transmission_code(&req.transmission);
    let trans = transmission_category(code);
    tracing::debug!("transmission: {} -> {} -> {}", req.transmission, code, trans);
    for cat in TRANSMISSION_CATEGORIES {
        features.insert(
            format!("transmission_{cat}"),
            (trans == cat) as u8 as ValueType,
        );
    }

    // The set of known brands is whatever the schema says it is.
    for col in &artifacts.feature_columns {
        if let Some(brand) = col.strip_prefix(BRAND_COLUMN_PREFIX) {
            features.insert(col.clone(), (req.brand == brand) as u8 as ValueType);
        }
    }

    artifacts
        .feature_columns
        .iter()
        .map(|col| features.get(col).copied().unwrap_or(0.0))
        .collect()
}
