//! Info handlers for system information and root endpoint

use crate::api::error::ApiError;
use crate::api::AppState;

use axum::{extract::State, Json};
use gpdfan_core::api::{ApiResponse, BoardResponse, InfoResponse};
use serde_json::{json, Value};
use tracing::debug;

/// Handle the root endpoint.
///
/// # Endpoint
///
/// `GET /`
pub(crate) async fn root() -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /");

    let data = json!({
        "service": "gpdfan daemon",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    });

    Ok(Json(ApiResponse::success(data)))
}

/// Report the selected board, mock flag and uptime.
///
/// # Endpoint
///
/// `GET /api/v0/info`
pub(crate) async fn get_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InfoResponse>>, ApiError> {
    debug!("Request: GET /api/v0/info");

    let info = InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        board: BoardResponse::from(state.board),
        mock: state.mock,
        debug_registers: state.debug_registers,
        uptime: state.start_time.elapsed().as_secs(),
    };

    Ok(Json(ApiResponse::success(info)))
}
