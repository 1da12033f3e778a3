//! gpdfan-hardware
//!
//! Embedded controller access for GPD handhelds: the two-port register
//! protocol, per-board fan quirks, sample caching and the fan controller the
//! daemon drives.
//
//! Public API:
//! - `fan_control::FanControl`: the fan channel (RPM, PWM, mode, interval)
//! - `ec_channel::EcChannel`: serialized EC register reads and writes
//! - `port_io::{PortIo, DevPort}`: byte-wide port I/O and its `/dev/port` backend
//! - `sim::SimulatedEc`: in-memory EC for tests and mock mode
//! - `dmi::detect_board`: board selection from override or DMI identity

pub mod dmi;
pub mod ec_channel;
pub mod fan_control;
pub mod port_io;
pub mod quirks;
pub mod sampler;
pub mod sim;

pub use dmi::{detect_board, read_dmi_identity};
pub use ec_channel::{EcChannel, DEFAULT_LOCK_TIMEOUT};
pub use fan_control::FanControl;
pub use port_io::{DevPort, PortIo};
pub use sampler::{Clock, ManualClock, MonotonicClock};
pub use sim::SimulatedEc;
