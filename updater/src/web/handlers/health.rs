// Liveness endpoint

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use super::common::{ApiResponse, ApiResult};
use crate::web::AppState;

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(ApiResponse::success(json!({
        "status": "ok",
        "running": state.scheduler.is_running(),
        "nextRun": state.scheduler.get_next_run_time().await,
    }))))
}
