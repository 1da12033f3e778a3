//! API module for the gpdfan daemon
//!
//! Contains the REST API implementation with Axum router and handlers.

pub(crate) mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use error::ApiError;
use gpdfan_core::{BoardDescriptor, GpdFanError};
use gpdfan_hardware::FanControl;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    /// Board selected at startup
    pub board: &'static BoardDescriptor,
    /// The fan channel
    pub fan: Arc<Mutex<FanControl>>,
    /// Whether the EC is simulated
    pub mock: bool,
    /// Whether the raw register endpoints are routed
    pub debug_registers: bool,
    /// Longest a request waits for the fan channel before answering busy
    pub lock_timeout: Duration,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(fan: FanControl, mock: bool, debug_registers: bool, lock_timeout: Duration) -> Self {
        Self {
            board: fan.board(),
            fan: Arc::new(Mutex::new(fan)),
            mock,
            debug_registers,
            lock_timeout,
            start_time: Instant::now(),
        }
    }

    /// Run one controller call on the blocking pool.
    ///
    /// Port I/O and the EC lock wait are synchronous, so they stay off the
    /// async workers. Waiting for the channel is bounded by `lock_timeout`
    /// and reported as [`GpdFanError::Busy`].
    pub async fn with_fan<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut FanControl) -> gpdfan_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut fan = tokio::time::timeout(self.lock_timeout, self.fan.clone().lock_owned())
            .await
            .map_err(|_| GpdFanError::Busy)?;

        let result = tokio::task::spawn_blocking(move || f(&mut *fan))
            .await
            .map_err(|e| ApiError::internal_error(format!("Fan task failed: {}", e)))?;

        Ok(result?)
    }
}

/// Create the main API router with all endpoints
pub(crate) fn create_router(state: AppState) -> Router {
    info!("Setting up API router...");

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(64 * 1024));

    let mut router = Router::new()
        // Fan channel endpoints
        .route("/api/v0/fan/status", get(handlers::fan::get_status))
        .route("/api/v0/fan/pwm/set", get(handlers::fan::set_pwm))
        .route("/api/v0/fan/mode/set", get(handlers::fan::set_mode))
        .route("/api/v0/fan/interval/set", get(handlers::fan::set_interval))
        // hwmon-style attribute endpoints
        .route("/api/v0/hwmon/:attr", get(handlers::hwmon::get_attribute))
        .route(
            "/api/v0/hwmon/:attr/set",
            get(handlers::hwmon::set_attribute),
        )
        // System info endpoint
        .route("/api/v0/info", get(handlers::info::get_info))
        // Root endpoint
        .route("/", get(handlers::info::root));

    if state.debug_registers {
        info!("Raw register endpoints enabled");
        router = router
            .route(
                "/api/v0/debug/:register",
                get(handlers::debug::get_register),
            )
            .route(
                "/api/v0/debug/:register/set",
                get(handlers::debug::set_register),
            );
    }

    router.layer(middleware_stack).with_state(state)
}

/// Error handling utilities
pub(crate) mod error {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use gpdfan_core::{api::ApiResponse, GpdFanError};

    use tracing::error;

    /// Custom error type for API responses
    #[derive(Debug)]
    pub struct ApiError {
        pub status_code: StatusCode,
        pub message: String,
    }

    impl ApiError {
        /// Create a new API error
        pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
            }
        }

        /// Create a bad request error
        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        /// Create an internal server error
        pub fn internal_error(message: impl Into<String>) -> Self {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }

        /// Create a service unavailable error (for hardware issues)
        pub fn service_unavailable(message: impl Into<String>) -> Self {
            Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            error!("API Error {}: {}", self.status_code, self.message);

            let response: ApiResponse<()> = ApiResponse::error(self.message);

            (self.status_code, Json(response)).into_response()
        }
    }

    /// Convert GpdFanError to ApiError
    impl From<GpdFanError> for ApiError {
        fn from(err: GpdFanError) -> Self {
            let message = err.to_string();
            match err {
                GpdFanError::Busy => Self::service_unavailable(message),
                GpdFanError::InvalidArgument(_) => Self::bad_request(message),
                GpdFanError::PermissionDenied(_) => Self::new(StatusCode::FORBIDDEN, message),
                GpdFanError::Unsupported(_) => Self::new(StatusCode::METHOD_NOT_ALLOWED, message),
                GpdFanError::UnsupportedDevice(_) | GpdFanError::Io(_) => {
                    Self::service_unavailable(message)
                }
                GpdFanError::Config(_) => Self::internal_error(message),
            }
        }
    }

}

/// Helper macros for common responses
#[macro_export]
macro_rules! api_ok {
    ($data:expr) => {
        Ok(axum::Json(gpdfan_core::api::ApiResponse::success($data)))
    };
}

#[macro_export]
macro_rules! api_fail {
    ($message:expr) => {
        Err($crate::api::error::ApiError::bad_request($message))
    };
}
