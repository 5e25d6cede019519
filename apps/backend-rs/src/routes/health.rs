use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    // Bounded so the probe answers even when the database hangs.
    let villas = match tokio::time::timeout(Duration::from_secs(3), state.store.list_villas()).await
    {
        Ok(Ok(villas)) => Some(villas.len()),
        Ok(Err(error)) => {
            tracing::error!(error = %error, "Health check store query failed");
            None
        }
        Err(_) => {
            tracing::error!("Health check store query timed out (3s)");
            None
        }
    };

    let status = if villas.is_some() { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "backend": state.store.backend_name(),
        "villas": villas,
        "now": Utc::now().to_rfc3339(),
    }))
}
