//! Raw EC register handlers
//!
//! Direct pass-through to the register channel for the manual-control and
//! PWM registers. No scaling and no mode checks; routed only when
//! `[debug].registers` is enabled.

use crate::api::error::ApiError;
use crate::api::handlers::ValueQuery;
use crate::api::AppState;
use crate::{api_fail, api_ok};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use gpdfan_core::api::{ApiResponse, RegisterResponse};
use gpdfan_core::DebugRegister;
use tracing::debug;

/// Read a raw register.
///
/// # Endpoint
///
/// `GET /api/v0/debug/:register` where register is `manual_control_reg` or `pwm_reg`
pub(crate) async fn get_register(
    State(state): State<AppState>,
    Path(register): Path<String>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    debug!("Request: GET /api/v0/debug/{}", register);

    let register: DebugRegister = register.parse()?;
    let (offset, value) = state
        .with_fan(move |fan| Ok((fan.register_offset(register), fan.read_register(register)?)))
        .await?;

    api_ok!(RegisterResponse {
        register: register.name().to_string(),
        offset,
        value,
    })
}

/// Write a raw register; the value is clamped into 0-255.
///
/// # Endpoint
///
/// `GET /api/v0/debug/:register/set?value=N`
pub(crate) async fn set_register(
    State(state): State<AppState>,
    Path(register): Path<String>,
    Query(params): Query<ValueQuery>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    debug!("Request: GET /api/v0/debug/{}/set", register);

    let register: DebugRegister = register.parse()?;
    let Some(value) = params.value else {
        return api_fail!("Missing 'value' parameter");
    };

    let (offset, value) = state
        .with_fan(move |fan| {
            Ok((
                fan.register_offset(register),
                fan.write_register(register, value)?,
            ))
        })
        .await?;

    api_ok!(RegisterResponse {
        register: register.name().to_string(),
        offset,
        value,
    })
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{body_json, test_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use gpdfan_core::board::WIN_MAX_2;
    use tower::ServiceExt;

    async fn get(app: &Router, uri: &str) -> StatusCode {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_not_routed_unless_enabled() {
        let (app, _sim) = test_app(&WIN_MAX_2, false);
        assert_eq!(get(&app, "/api/v0/debug/pwm_reg").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_raw_read() {
        let (app, sim) = test_app(&WIN_MAX_2, true);
        sim.set_register(0x1809, 0x42);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v0/debug/pwm_reg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["register"], "pwm_reg");
        assert_eq!(json["data"]["offset"], 0x1809);
        assert_eq!(json["data"]["value"], 0x42);
    }

    #[tokio::test]
    async fn test_raw_write_clamps() {
        let (app, sim) = test_app(&WIN_MAX_2, true);

        let status = get(&app, "/api/v0/debug/manual_control_reg/set?value=300").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sim.register(0x0275), 255);

        get(&app, "/api/v0/debug/manual_control_reg/set?value=-1").await;
        assert_eq!(sim.register(0x0275), 0);
    }

    #[tokio::test]
    async fn test_unknown_register() {
        let (app, _sim) = test_app(&WIN_MAX_2, true);
        assert_eq!(
            get(&app, "/api/v0/debug/rpm_reg").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
