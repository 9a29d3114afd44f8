// Banner inventory endpoints

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::error;

use super::common::{api_error, ApiResponse, ApiResult};
use crate::tasks::banners::{inventory, BannerInventory};
use crate::web::AppState;

pub async fn get_banner_status(State(state): State<AppState>) -> ApiResult<BannerInventory> {
    match inventory(&state.config.banners.directory).await {
        Ok(inv) => Ok(Json(ApiResponse::success(inv))),
        Err(e) => {
            error!("Failed to list banner files: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub async fn get_banner_config(State(state): State<AppState>) -> ApiResult<Value> {
    let banners = &state.config.banners;
    let total_slots: u32 = banners.categories.iter().map(|c| c.count).sum();

    Ok(Json(ApiResponse::success(json!({
        "directory": banners.directory,
        "generationAttempts": banners.generation_attempts,
        "retryDelayMs": banners.retry_delay_ms,
        "totalSlots": total_slots,
        "categories": banners.categories,
    }))))
}
