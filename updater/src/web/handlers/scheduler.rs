// Scheduler control endpoints

use axum::{body::Bytes, extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::common::{api_error, ApiResponse, ApiResult, ApiStatusResult};
use crate::errors::ScheduleError;
use crate::scheduler::SchedulerStatus;
use crate::web::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub schedule: Option<String>,
}

/// Start an update run in the background
pub async fn trigger_run(State(state): State<AppState>) -> ApiStatusResult<Value> {
    info!("Manual update run requested");

    match state.scheduler.trigger_run().await {
        Ok(handle) => Ok((
            StatusCode::ACCEPTED,
            Json(
                ApiResponse::success(json!({
                    "runId": handle.run_id,
                    "startedAt": handle.started_at,
                    "status": "started"
                }))
                .with_message("Update run started"),
            ),
        )),
        Err(e) => {
            warn!("Manual run rejected: {}", e);
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
    }
}

pub async fn get_scheduler_status(State(state): State<AppState>) -> ApiResult<SchedulerStatus> {
    Ok(Json(ApiResponse::success(state.scheduler.status().await)))
}

/// Start or restart the timer, optionally with a new schedule
pub async fn start_scheduler(State(state): State<AppState>, body: Bytes) -> ApiResult<Value> {
    let request: StartRequest = if body.iter().all(|b| b.is_ascii_whitespace()) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
        })?
    };

    let expression = match request.schedule {
        Some(schedule) => schedule,
        None => state.scheduler.schedule_expression().await,
    };
    info!("Scheduler start requested with '{}'", expression);

    match state.scheduler.start(&expression).await {
        Ok(next_run) => Ok(Json(
            ApiResponse::success(json!({
                "schedule": expression,
                "timezone": state.config.scheduler.timezone,
                "nextRun": next_run
            }))
            .with_message("Scheduler started"),
        )),
        Err(e @ ScheduleError::Invalid { .. }) => {
            warn!("Rejected schedule: {}", e);
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            error!("Failed to start scheduler: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub async fn stop_scheduler(State(state): State<AppState>) -> ApiResult<Value> {
    let stopped = state.scheduler.stop().await;
    let message = if stopped {
        "Scheduler stopped"
    } else {
        "Scheduler was not running"
    };
    Ok(Json(
        ApiResponse::success(json!({ "stopped": stopped })).with_message(message),
    ))
}
