//! API models for the gpdfand REST API
//!
//! Request and response models shared by the daemon and its clients.

use crate::board::{BoardDescriptor, BoardKind};
use serde::{Deserialize, Serialize};

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ApiResponse<T> {
    #[serde(rename = "success")]
    Success { data: T },
    #[serde(rename = "error")]
    Error { error: String },
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Create an error response
    pub fn error(error: String) -> Self {
        Self::Error { error }
    }
}

/// Board layout as reported over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardResponse {
    pub board: BoardKind,
    pub addr_port: u16,
    pub data_port: u16,
    pub manual_control_enable: u16,
    pub rpm_read: u16,
    pub pwm_write: u16,
    pub pwm_max: u8,
}

impl From<&BoardDescriptor> for BoardResponse {
    fn from(board: &BoardDescriptor) -> Self {
        Self {
            board: board.kind,
            addr_port: board.addr_port,
            data_port: board.data_port,
            manual_control_enable: board.manual_control_enable,
            rpm_read: board.rpm_read,
            pwm_write: board.pwm_write,
            pwm_max: board.pwm_max,
        }
    }
}

/// Server information response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Server version
    pub version: String,
    /// Selected board
    pub board: BoardResponse,
    /// Whether the EC is simulated
    pub mock: bool,
    /// Whether the raw register surface is routed
    pub debug_registers: bool,
    /// Server uptime in seconds
    pub uptime: u64,
}

/// Single attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeResponse {
    /// hwmon-style attribute name
    pub attribute: String,
    pub value: i64,
}

/// Raw register value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Register name
    pub register: String,
    /// EC offset
    pub offset: u16,
    pub value: u8,
}
