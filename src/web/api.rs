use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct StateParams {
    /// Temperature unit system; anything other than "imperial" means metric.
    pub units: Option<String>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Latest sensor values plus the derived summary (vpd, statuses, trends,
/// phrases). This is the query interface the conversational collaborator
/// calls before answering numeric questions.
pub async fn get_sensor_state(
    State(state): State<AppState>,
    Query(params): Query<StateParams>,
) -> Json<Value> {
    let units = params.units.as_deref().unwrap_or("metric");
    Json(state.store.to_result_dict(units).await)
}
