//! Board definitions and identification
//!
//! Every supported GPD handheld exposes the same fan functionality through a
//! different embedded controller layout. This module holds the immutable
//! per-board register tables and the DMI match table that picks one of them
//! at startup.
//!
//! Note: actual register I/O lives in the `gpdfan-hardware` crate. This module
//! only contains board specifications and the pure selection logic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{GpdFanError, Result};

/// Quirk set identity
///
/// The variant set is closed: each board gets its own arm wherever behavior
/// differs, so adding a board is a compile error everywhere it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    /// GPD Win Mini (7840U / 8840U)
    WinMini,
    /// GPD Duo, Win Mini register layout with a latching duty register
    Duo,
    /// GPD Win 4 with Ryzen 6800U
    #[serde(rename = "win4_6800u")]
    Win4,
    /// GPD Win Max 2 family, also used by the Win 4 7840U
    #[serde(rename = "win_max_2")]
    WinMax2,
}

impl BoardKind {
    /// All supported boards, in table order.
    pub const ALL: [BoardKind; 4] = [
        BoardKind::WinMini,
        BoardKind::Duo,
        BoardKind::Win4,
        BoardKind::WinMax2,
    ];

    /// Canonical identity tag
    pub fn name(&self) -> &'static str {
        match self {
            BoardKind::WinMini => "win_mini",
            BoardKind::Duo => "duo",
            BoardKind::Win4 => "win4_6800u",
            BoardKind::WinMax2 => "win_max_2",
        }
    }

    /// Register table for this board
    pub fn descriptor(&self) -> &'static BoardDescriptor {
        match self {
            BoardKind::WinMini => &WIN_MINI,
            BoardKind::Duo => &DUO,
            BoardKind::Win4 => &WIN4_6800U,
            BoardKind::WinMax2 => &WIN_MAX_2,
        }
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BoardKind {
    type Err = GpdFanError;

    /// Parse a board override (for the `--board` flag and `[fan].board`)
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use gpdfan_core::board::BoardKind;
    ///
    /// assert_eq!(BoardKind::from_str("wm2").unwrap(), BoardKind::WinMax2);
    /// assert_eq!(BoardKind::from_str("Win4").unwrap(), BoardKind::Win4);
    /// assert!(BoardKind::from_str("steamdeck").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "win_mini" | "mini" => Ok(BoardKind::WinMini),
            "duo" => Ok(BoardKind::Duo),
            "win4" | "win4_6800u" => Ok(BoardKind::Win4),
            "wm2" | "win_max_2" => Ok(BoardKind::WinMax2),
            _ => Err(GpdFanError::UnsupportedDevice(format!(
                "Unknown board '{}'. Valid options: win_mini, duo, win4, wm2",
                s
            ))),
        }
    }
}

/// Embedded controller layout of one board
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardDescriptor {
    /// Identity tag
    pub kind: BoardKind,
    /// Address-select I/O port
    pub addr_port: u16,
    /// Data I/O port
    pub data_port: u16,
    /// Manual/automatic toggle register
    pub manual_control_enable: u16,
    /// First of two big-endian RPM registers
    pub rpm_read: u16,
    /// PWM duty register
    pub pwm_write: u16,
    /// Largest raw duty value the EC accepts
    pub pwm_max: u8,
}

pub const WIN_MINI: BoardDescriptor = BoardDescriptor {
    kind: BoardKind::WinMini,
    addr_port: 0x4E,
    data_port: 0x4F,
    manual_control_enable: 0x047A,
    rpm_read: 0x0478,
    pwm_write: 0x047A,
    pwm_max: 244,
};

pub const DUO: BoardDescriptor = BoardDescriptor {
    kind: BoardKind::Duo,
    ..WIN_MINI
};

pub const WIN4_6800U: BoardDescriptor = BoardDescriptor {
    kind: BoardKind::Win4,
    addr_port: 0x2E,
    data_port: 0x2F,
    manual_control_enable: 0xC311,
    rpm_read: 0xC880,
    pwm_write: 0xC311,
    pwm_max: 127,
};

pub const WIN_MAX_2: BoardDescriptor = BoardDescriptor {
    kind: BoardKind::WinMax2,
    addr_port: 0x4E,
    data_port: 0x4F,
    manual_control_enable: 0x0275,
    rpm_read: 0x0218,
    pwm_write: 0x1809,
    pwm_max: 184,
};

impl BoardDescriptor {
    /// Whether manual/automatic is a register of its own.
    ///
    /// Boards without one fold the toggle into the duty register, where a
    /// duty of `0` hands control back to the EC.
    pub fn has_auto_enable_register(&self) -> bool {
        self.manual_control_enable != self.pwm_write
    }

    /// Whether the duty register reads back the value last written.
    pub fn has_native_pwm_readback(&self) -> bool {
        matches!(self.kind, BoardKind::WinMax2)
    }

    /// Rescale a 0-255 duty into this board's native range.
    ///
    /// The result is always in `[1, pwm_max]`; `0` is reserved because some
    /// boards treat it as "automatic".
    ///
    /// ```
    /// use gpdfan_core::board::WIN_MAX_2;
    ///
    /// assert_eq!(WIN_MAX_2.to_native(0), 1);
    /// assert_eq!(WIN_MAX_2.to_native(128), 92);
    /// assert_eq!(WIN_MAX_2.to_native(255), 184);
    /// ```
    pub fn to_native(&self, value: u8) -> u8 {
        let max = self.pwm_max.max(1) as u32;
        (value as u32 * (max - 1) / 255 + 1) as u8
    }

    /// Rescale a raw duty register value back to 0-255.
    pub fn from_native(&self, raw: u8) -> u8 {
        let max = self.pwm_max.max(1) as u32;
        (raw as u32 * 255 / max).min(255) as u8
    }

    /// I/O port range claimed by this board (inclusive).
    pub fn port_range(&self) -> (u16, u16) {
        (
            self.addr_port.min(self.data_port),
            self.addr_port.max(self.data_port),
        )
    }
}

/// Hardware identity strings as published in `/sys/class/dmi/id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmiIdentity {
    pub sys_vendor: String,
    pub product_name: String,
    pub product_version: String,
}

impl fmt::Display for DmiIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.sys_vendor, self.product_name, self.product_version
        )
    }
}

/// One row of the DMI match table. `None` fields match anything.
#[derive(Debug, Clone, Copy)]
pub struct DmiMatch {
    pub sys_vendor: &'static str,
    pub product_name: &'static str,
    pub product_version: Option<&'static str>,
    pub board: BoardKind,
}

impl DmiMatch {
    fn matches(&self, identity: &DmiIdentity) -> bool {
        identity.sys_vendor.contains(self.sys_vendor)
            && identity.product_name.contains(self.product_name)
            && self
                .product_version
                .map_or(true, |v| identity.product_version.contains(v))
    }
}

/// Known devices, first match wins.
pub static GPD_DEVICES: &[DmiMatch] = &[
    // GPD Win Mini, 7840U and 8840U
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1617-01",
        product_version: None,
        board: BoardKind::WinMini,
    },
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1618-04",
        product_version: Some("Default string"),
        board: BoardKind::Win4,
    },
    // GPD Win 4 with Ryzen 7840U shares the Win Max 2 layout
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1618-04",
        product_version: Some("Ver. 1.0"),
        board: BoardKind::WinMax2,
    },
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1618-04",
        product_version: Some("Ver.1.0"),
        board: BoardKind::WinMax2,
    },
    // GPD Win Max 2, 6800U / 2023 7840U / 2024 8840U
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1619-04",
        product_version: None,
        board: BoardKind::WinMax2,
    },
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1619-05",
        product_version: None,
        board: BoardKind::WinMax2,
    },
    DmiMatch {
        sys_vendor: "GPD",
        product_name: "G1622-01",
        product_version: None,
        board: BoardKind::Duo,
    },
];

/// Look the identity up in [`GPD_DEVICES`].
pub fn match_dmi(identity: &DmiIdentity) -> Option<BoardKind> {
    GPD_DEVICES
        .iter()
        .find(|entry| entry.matches(identity))
        .map(|entry| entry.board)
}

/// Pick the board for this process.
///
/// An explicit override wins; otherwise the DMI identity must match.
///
/// # Errors
///
/// Returns [`GpdFanError::UnsupportedDevice`] when neither resolves. This is
/// fatal: nothing should be attached to an unknown EC.
pub fn select_board(
    override_kind: Option<BoardKind>,
    identity: &DmiIdentity,
) -> Result<&'static BoardDescriptor> {
    if let Some(kind) = override_kind {
        return Ok(kind.descriptor());
    }

    match_dmi(identity)
        .map(|kind| kind.descriptor())
        .ok_or_else(|| GpdFanError::UnsupportedDevice(identity.to_string()))
}
