//! API request handlers for the gpdfan daemon REST API.
//!
//! # Handler Modules
//!
//! - [`info`] - System information and root endpoint
//! - [`fan`] - Fan status and the three writable controls
//! - [`hwmon`] - Generic read/write by hwmon attribute name
//! - [`debug`] - Raw EC register peek/poke (only routed when enabled)
//!
//! All handlers take `State<AppState>`, return
//! `Result<Json<ApiResponse<T>>, ApiError>` and reach the controller through
//! `AppState::with_fan`, holding the fan lock for one controller call.

pub mod debug;
pub mod fan;
pub mod hwmon;
pub mod info;

use serde::Deserialize;

/// Query parameters for write endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueQuery {
    /// Value to write, in the attribute's hwmon encoding
    pub value: Option<i64>,
}
