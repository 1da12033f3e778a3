//! Fan handlers for status and control endpoints

use crate::api::error::ApiError;
use crate::api::handlers::hwmon::write_attribute;
use crate::api::handlers::ValueQuery;
use crate::api::AppState;
use crate::api_ok;
use axum::{
    extract::{Query, State},
    Json,
};
use gpdfan_core::api::{ApiResponse, AttributeResponse};
use gpdfan_core::{FanStatus, SensorAttribute};
use tracing::debug;

/// Current RPM, duty, mode and interval.
///
/// RPM and (on boards with readback) duty come from the sample caches, so
/// polling this faster than the update interval does not reach the EC.
///
/// # Endpoint
///
/// `GET /api/v0/fan/status`
pub(crate) async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FanStatus>>, ApiError> {
    debug!("Request: GET /api/v0/fan/status");

    let status = state.with_fan(|fan| fan.status()).await?;
    debug!("Fan status: {:?}", status);
    api_ok!(status)
}

/// Set the duty cycle.
///
/// # Endpoint
///
/// `GET /api/v0/fan/pwm/set?value=128`
///
/// # Query Parameters
///
/// - `value` - duty 0-255, clamped
pub(crate) async fn set_pwm(
    State(state): State<AppState>,
    Query(params): Query<ValueQuery>,
) -> Result<Json<ApiResponse<AttributeResponse>>, ApiError> {
    debug!("Request: GET /api/v0/fan/pwm/set");
    write_attribute(&state, SensorAttribute::Pwm, params.value).await
}

/// Set the PWM-enable mode.
///
/// # Endpoint
///
/// `GET /api/v0/fan/mode/set?value=1`
///
/// # Query Parameters
///
/// - `value` - 0 (full speed), 1 (manual) or 2 (automatic)
pub(crate) async fn set_mode(
    State(state): State<AppState>,
    Query(params): Query<ValueQuery>,
) -> Result<Json<ApiResponse<AttributeResponse>>, ApiError> {
    debug!("Request: GET /api/v0/fan/mode/set");
    write_attribute(&state, SensorAttribute::PwmEnable, params.value).await
}

/// Set the cache refresh interval.
///
/// # Endpoint
///
/// `GET /api/v0/fan/interval/set?value=2000`
///
/// # Query Parameters
///
/// - `value` - milliseconds; floored to whole seconds, minimum 1000
pub(crate) async fn set_interval(
    State(state): State<AppState>,
    Query(params): Query<ValueQuery>,
) -> Result<Json<ApiResponse<AttributeResponse>>, ApiError> {
    debug!("Request: GET /api/v0/fan/interval/set");
    write_attribute(&state, SensorAttribute::UpdateInterval, params.value).await
}


/// Integration tests that exercise actual HTTP handlers
#[cfg(test)]
mod integration_tests {
    use crate::api::test_support::{body_json, test_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use gpdfan_core::board::{DUO, WIN_MINI};
    use tower::ServiceExt;

    async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response.into_body()).await)
    }

    #[tokio::test]
    async fn test_status_initial() {
        let (app, _sim) = test_app(&WIN_MINI, false);

        let (status, json) = get(&app, "/api/v0/fan/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["rpm"], 3000);
        assert_eq!(json["data"]["pwm"], 255);
        assert_eq!(json["data"]["pwm_enable"], "automatic");
        assert_eq!(json["data"]["update_interval_ms"], 1000);
    }

    #[tokio::test]
    async fn test_status_is_cached() {
        let (app, sim) = test_app(&WIN_MINI, false);

        get(&app, "/api/v0/fan/status").await;
        let after_first = sim.transaction_count();
        get(&app, "/api/v0/fan/status").await;

        assert_eq!(sim.transaction_count(), after_first);
    }

    #[tokio::test]
    async fn test_invalid_mode_rejected() {
        let (app, sim) = test_app(&WIN_MINI, false);

        let (status, json) = get(&app, "/api/v0/fan/mode/set?value=7").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("pwm1_enable"));
        assert!(sim.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_mode_disable_goes_full_speed() {
        let (app, sim) = test_app(&WIN_MINI, false);

        let (status, json) = get(&app, "/api/v0/fan/mode/set?value=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["value"], 0);
        assert_eq!(sim.register(0x047A), 244);
    }

    #[tokio::test]
    async fn test_duo_pwm_double_write() {
        let (app, sim) = test_app(&DUO, false);

        get(&app, "/api/v0/fan/mode/set?value=1").await;
        sim.clear_log();
        let (status, json) = get(&app, "/api/v0/fan/pwm/set?value=100").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["value"], 100);
        let native = DUO.to_native(100);
        assert_eq!(sim.writes_to(0x047A), vec![native, native + 1]);
    }

    #[tokio::test]
    async fn test_interval_floor() {
        let (app, _sim) = test_app(&WIN_MINI, false);

        let (status, json) = get(&app, "/api/v0/fan/interval/set?value=1999").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["value"], 1000);

        let (_, json) = get(&app, "/api/v0/fan/interval/set?value=0").await;
        assert_eq!(json["data"]["value"], 1000);
    }

    #[tokio::test]
    async fn test_non_integer_value_rejected() {
        let (app, _sim) = test_app(&WIN_MINI, false);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v0/fan/pwm/set?value=fast")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
