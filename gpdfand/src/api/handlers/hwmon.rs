//! Attribute handlers mirroring the hwmon sensor files
//!
//! `fan1_input`, `pwm1`, `pwm1_enable`, `pwm1_mode` and `update_interval`
//! are read and written in the same integer encodings hwmon uses.

use crate::api::error::ApiError;
use crate::api::handlers::ValueQuery;
use crate::api::AppState;
use crate::{api_fail, api_ok};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use gpdfan_core::api::{ApiResponse, AttributeResponse};
use gpdfan_core::SensorAttribute;
use tracing::debug;

/// Write `value` to `attr` and report the committed value.
///
/// The reply comes from the write itself; there is no follow-up read that
/// could fail after the EC already took the change.
pub(crate) async fn write_attribute(
    state: &AppState,
    attr: SensorAttribute,
    value: Option<i64>,
) -> Result<Json<ApiResponse<AttributeResponse>>, ApiError> {
    let Some(value) = value else {
        return api_fail!("Missing 'value' parameter");
    };

    debug!("Setting {} to {}", attr, value);

    let value = state.with_fan(move |fan| fan.write(attr, value)).await?;

    api_ok!(AttributeResponse {
        attribute: attr.name().to_string(),
        value,
    })
}

/// Read one attribute.
///
/// # Endpoint
///
/// `GET /api/v0/hwmon/:attr`
pub(crate) async fn get_attribute(
    State(state): State<AppState>,
    Path(attr): Path<String>,
) -> Result<Json<ApiResponse<AttributeResponse>>, ApiError> {
    debug!("Request: GET /api/v0/hwmon/{}", attr);

    let attr: SensorAttribute = attr.parse()?;
    let value = state.with_fan(move |fan| fan.read(attr)).await?;

    api_ok!(AttributeResponse {
        attribute: attr.name().to_string(),
        value,
    })
}

/// Write one attribute.
///
/// # Endpoint
///
/// `GET /api/v0/hwmon/:attr/set?value=N`
pub(crate) async fn set_attribute(
    State(state): State<AppState>,
    Path(attr): Path<String>,
    Query(params): Query<ValueQuery>,
) -> Result<Json<ApiResponse<AttributeResponse>>, ApiError> {
    debug!("Request: GET /api/v0/hwmon/{}/set", attr);

    let attr: SensorAttribute = attr.parse()?;
    write_attribute(&state, attr, params.value).await
}
