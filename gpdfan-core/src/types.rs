//! Core types and data structures for gpdfan

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{GpdFanError, Result};

/// Fan PWM-enable mode
///
/// Numeric values follow the hwmon `pwm1_enable` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PwmEnable {
    /// Fan forced to full speed
    Disable = 0,
    /// Duty cycle follows the user's PWM value
    Manual = 1,
    /// EC runs its own closed loop
    Automatic = 2,
}

impl PwmEnable {
    /// hwmon integer encoding
    pub fn as_raw(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for PwmEnable {
    type Error = GpdFanError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(PwmEnable::Disable),
            1 => Ok(PwmEnable::Manual),
            2 => Ok(PwmEnable::Automatic),
            other => Err(GpdFanError::InvalidArgument(format!(
                "pwm1_enable must be 0-2, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PwmEnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PwmEnable::Disable => "disable",
            PwmEnable::Manual => "manual",
            PwmEnable::Automatic => "automatic",
        };
        f.write_str(name)
    }
}

/// Clamp an externally supplied duty value into 0-255.
pub fn clamp_pwm(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Polling interval shared by the RPM and PWM caches, in whole seconds.
///
/// Only constructed through [`UpdateInterval::from_millis`] and
/// [`UpdateInterval::from_secs`], which enforce the one-second floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateInterval {
    secs: u32,
}

impl UpdateInterval {
    /// Shortest allowed interval
    pub const MIN_SECS: u32 = 1;

    /// Build from milliseconds: floor to whole seconds, minimum one second.
    ///
    /// ```
    /// use gpdfan_core::UpdateInterval;
    ///
    /// assert_eq!(UpdateInterval::from_millis(2999).as_secs(), 2);
    /// assert_eq!(UpdateInterval::from_millis(400).as_secs(), 1);
    /// assert_eq!(UpdateInterval::from_millis(-5).as_secs(), 1);
    /// ```
    pub fn from_millis(ms: i64) -> Self {
        let secs = (ms / 1000).clamp(Self::MIN_SECS as i64, u32::MAX as i64) as u32;
        Self { secs }
    }

    pub fn from_secs(secs: u32) -> Self {
        Self {
            secs: secs.max(Self::MIN_SECS),
        }
    }

    pub fn as_secs(&self) -> u32 {
        self.secs
    }

    pub fn as_millis(&self) -> u64 {
        self.secs as u64 * 1000
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.secs as u64)
    }
}

impl Default for UpdateInterval {
    fn default() -> Self {
        Self::from_secs(Self::MIN_SECS)
    }
}

/// Attributes exposed per fan channel, named after their hwmon files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorAttribute {
    /// `fan1_input`, RPM (read-only)
    FanInput,
    /// `pwm1`, duty 0-255
    Pwm,
    /// `pwm1_enable`, see [`PwmEnable`]
    PwmEnable,
    /// `pwm1_mode`, always PWM output (read-only)
    PwmMode,
    /// `update_interval`, milliseconds
    UpdateInterval,
}

impl SensorAttribute {
    pub const ALL: [SensorAttribute; 5] = [
        SensorAttribute::FanInput,
        SensorAttribute::Pwm,
        SensorAttribute::PwmEnable,
        SensorAttribute::PwmMode,
        SensorAttribute::UpdateInterval,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorAttribute::FanInput => "fan1_input",
            SensorAttribute::Pwm => "pwm1",
            SensorAttribute::PwmEnable => "pwm1_enable",
            SensorAttribute::PwmMode => "pwm1_mode",
            SensorAttribute::UpdateInterval => "update_interval",
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            SensorAttribute::Pwm | SensorAttribute::PwmEnable | SensorAttribute::UpdateInterval
        )
    }
}

impl fmt::Display for SensorAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SensorAttribute {
    type Err = GpdFanError;

    fn from_str(s: &str) -> Result<Self> {
        SensorAttribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| GpdFanError::Unsupported(format!("Unknown attribute: {}", s)))
    }
}

/// Raw registers reachable through the diagnostic surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugRegister {
    /// The board's manual-control enable register
    ManualControl,
    /// The board's PWM duty register
    Pwm,
}

impl DebugRegister {
    pub fn name(&self) -> &'static str {
        match self {
            DebugRegister::ManualControl => "manual_control_reg",
            DebugRegister::Pwm => "pwm_reg",
        }
    }
}

impl std::str::FromStr for DebugRegister {
    type Err = GpdFanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manual_control_reg" => Ok(DebugRegister::ManualControl),
            "pwm_reg" => Ok(DebugRegister::Pwm),
            _ => Err(GpdFanError::Unsupported(format!("Unknown register: {}", s))),
        }
    }
}

/// Snapshot of the fan channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanStatus {
    /// Fan speed in RPM
    pub rpm: u16,
    /// Duty cycle, 0-255
    pub pwm: u8,
    /// Current PWM-enable mode
    pub pwm_enable: PwmEnable,
    /// Cache refresh interval in milliseconds
    pub update_interval_ms: u64,
}
