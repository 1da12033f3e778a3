//! Fan Control - the single entry point for one fan channel
//!
//! [`FanControl`] owns the register channel, the controller state (mode, the
//! user's requested duty, polling interval) and the two sample caches. Every
//! state change happens after the EC accepted the matching write, so a failed
//! transaction never leaves the recorded mode ahead of the hardware.

use gpdfan_core::{
    clamp_pwm, BoardDescriptor, DebugRegister, FanStatus, GpdFanError, PwmEnable, Result,
    SensorAttribute, UpdateInterval,
};
use tracing::{debug, info, warn};

use crate::ec_channel::EcChannel;
use crate::port_io::PortIo;
use crate::quirks;
use crate::sampler::{CachedSample, Clock, MonotonicClock};

/// hwmon `pwm1_mode` value for PWM (as opposed to DC) output
pub const PWM_MODE_PWM: i64 = 1;

/// Duty requested before anyone asks for something else: full speed.
const INITIAL_PWM: u8 = u8::MAX;

/// Fan controller for the board selected at startup
///
/// Generic over the port transport, so tests and mock mode can run it on a
/// [`SimulatedEc`](crate::sim::SimulatedEc).
pub struct FanControl<P: PortIo = Box<dyn PortIo>> {
    board: &'static BoardDescriptor,
    ec: EcChannel<P>,
    clock: Box<dyn Clock>,
    pwm_enable: PwmEnable,
    pwm_value: u8,
    interval: UpdateInterval,
    rpm_cache: CachedSample<u16>,
    pwm_cache: CachedSample<u8>,
    /// Set once AUTOMATIC has been restored and nothing changed since
    restored: bool,
}

impl<P: PortIo> FanControl<P> {
    /// Attach to `board` through `ec`
    ///
    /// Starts in AUTOMATIC with a requested duty of 255. Nothing is written
    /// to the duty or enable registers until the first mode change.
    pub fn attach(board: &'static BoardDescriptor, ec: EcChannel<P>) -> Self {
        Self::attach_with_clock(board, ec, Box::new(MonotonicClock))
    }

    /// Attach with a custom time source for the sample caches
    pub fn attach_with_clock(
        board: &'static BoardDescriptor,
        mut ec: EcChannel<P>,
        clock: Box<dyn Clock>,
    ) -> Self {
        quirks::on_attach(&mut ec, board);
        info!("Attached fan controller to {}", board.kind);

        Self {
            board,
            ec,
            clock,
            pwm_enable: PwmEnable::Automatic,
            pwm_value: INITIAL_PWM,
            interval: UpdateInterval::default(),
            rpm_cache: CachedSample::new(0),
            pwm_cache: CachedSample::new(0),
            restored: false,
        }
    }

    /// Use `interval` for cache freshness from the start
    pub fn with_update_interval(mut self, interval: UpdateInterval) -> Self {
        self.interval = interval;
        self
    }

    pub fn board(&self) -> &'static BoardDescriptor {
        self.board
    }

    /// Current PWM-enable mode
    pub fn pwm_enable(&self) -> PwmEnable {
        self.pwm_enable
    }

    /// Last duty the user asked for, 0-255
    pub fn pwm_value(&self) -> u8 {
        self.pwm_value
    }

    /// Always PWM output
    pub fn pwm_mode(&self) -> i64 {
        PWM_MODE_PWM
    }

    pub fn update_interval(&self) -> UpdateInterval {
        self.interval
    }

    pub fn update_interval_ms(&self) -> u64 {
        self.interval.as_millis()
    }

    /// Fan speed in RPM, refreshed at most once per interval
    pub fn fan_input(&mut self) -> Result<u16> {
        let now = self.clock.now();
        let interval = self.interval.as_duration();
        let board = self.board;
        let ec = &mut self.ec;

        self.rpm_cache
            .get_or_refresh(now, interval, || quirks::read_rpm(ec, board))
    }

    /// Duty cycle, 0-255
    ///
    /// Boards that can read the duty register back go through the cache;
    /// the others report the requested value.
    pub fn pwm(&mut self) -> Result<u8> {
        if !self.board.has_native_pwm_readback() {
            return Ok(self.pwm_value);
        }

        let now = self.clock.now();
        let interval = self.interval.as_duration();
        let board = self.board;
        let requested = self.pwm_value;
        let ec = &mut self.ec;

        self.pwm_cache
            .get_or_refresh(now, interval, || quirks::read_pwm(ec, board, requested))
    }

    /// Request a duty cycle. Out-of-range values are clamped into 0-255.
    ///
    /// Returns the duty [`FanControl::pwm`] reports from now on.
    ///
    /// # Errors
    ///
    /// [`GpdFanError::PermissionDenied`] if the current mode does not accept
    /// writes on this board. The requested value is not recorded then.
    pub fn set_pwm(&mut self, value: i64) -> Result<u8> {
        let value = clamp_pwm(value);
        let native = quirks::write_pwm(&mut self.ec, self.board, self.pwm_enable, value)?;

        let reported = if self.board.has_native_pwm_readback() {
            self.board.from_native(native)
        } else {
            value
        };
        self.pwm_value = value;
        self.pwm_cache.prime(reported, self.clock.now());
        self.restored = false;

        debug!("PWM set to {} (native {})", value, native);
        Ok(reported)
    }

    /// Switch mode from its hwmon integer encoding
    ///
    /// # Errors
    ///
    /// [`GpdFanError::InvalidArgument`] for anything but 0, 1 or 2, before
    /// the EC is touched.
    pub fn set_pwm_enable(&mut self, raw: i64) -> Result<()> {
        let mode = PwmEnable::try_from(raw)?;
        self.apply_pwm_enable(mode)
    }

    /// Switch mode, re-deriving the EC registers from the requested duty
    pub fn apply_pwm_enable(&mut self, mode: PwmEnable) -> Result<()> {
        quirks::set_pwm_enable(&mut self.ec, self.board, mode, self.pwm_value)?;

        let previous = std::mem::replace(&mut self.pwm_enable, mode);
        self.pwm_cache.invalidate();
        self.restored = false;

        info!("Fan mode {} -> {}", previous, mode);
        Ok(())
    }

    /// Set the cache interval from milliseconds; floored to whole seconds,
    /// minimum one second.
    pub fn set_update_interval_ms(&mut self, ms: i64) -> UpdateInterval {
        self.interval = UpdateInterval::from_millis(ms);
        debug!("Update interval set to {}s", self.interval.as_secs());
        self.interval
    }

    /// Snapshot of the channel; reads go through the caches
    pub fn status(&mut self) -> Result<FanStatus> {
        Ok(FanStatus {
            rpm: self.fan_input()?,
            pwm: self.pwm()?,
            pwm_enable: self.pwm_enable,
            update_interval_ms: self.update_interval_ms(),
        })
    }

    /// Read a sensor attribute in its hwmon encoding
    pub fn read(&mut self, attr: SensorAttribute) -> Result<i64> {
        let value = match attr {
            SensorAttribute::FanInput => self.fan_input()? as i64,
            SensorAttribute::Pwm => self.pwm()? as i64,
            SensorAttribute::PwmEnable => self.pwm_enable.as_raw(),
            SensorAttribute::PwmMode => self.pwm_mode(),
            SensorAttribute::UpdateInterval => self.update_interval_ms() as i64,
        };
        Ok(value)
    }

    /// Write a sensor attribute in its hwmon encoding
    ///
    /// Returns the committed value in the same encoding [`FanControl::read`]
    /// uses, without another trip to the EC.
    ///
    /// # Errors
    ///
    /// [`GpdFanError::Unsupported`] for read-only attributes.
    pub fn write(&mut self, attr: SensorAttribute, value: i64) -> Result<i64> {
        if !attr.is_writable() {
            return Err(GpdFanError::Unsupported(format!("{} is read-only", attr)));
        }

        let committed = match attr {
            SensorAttribute::Pwm => self.set_pwm(value)? as i64,
            SensorAttribute::PwmEnable => {
                self.set_pwm_enable(value)?;
                self.pwm_enable.as_raw()
            }
            _ => self.set_update_interval_ms(value).as_millis() as i64,
        };
        Ok(committed)
    }

    /// EC offset behind a diagnostic register name
    pub fn register_offset(&self, register: DebugRegister) -> u16 {
        match register {
            DebugRegister::ManualControl => self.board.manual_control_enable,
            DebugRegister::Pwm => self.board.pwm_write,
        }
    }

    /// Raw byte of a diagnostic register, no scaling
    pub fn read_register(&mut self, register: DebugRegister) -> Result<u8> {
        let offset = self.register_offset(register);
        self.ec.read(offset)
    }

    /// Poke a diagnostic register. No mode checks, no scaling; `value` is
    /// clamped into 0-255 and the written byte returned.
    pub fn write_register(&mut self, register: DebugRegister, value: i64) -> Result<u8> {
        let offset = self.register_offset(register);
        let value = clamp_pwm(value);
        self.ec.write(offset, value)?;

        warn!(
            "Raw write to {} (0x{:04X}) = 0x{:02X}; fan state may no longer match",
            register.name(),
            offset,
            value
        );
        Ok(value)
    }

    /// Hand the fan back to the EC's automatic control
    pub fn restore_automatic(&mut self) -> Result<()> {
        self.apply_pwm_enable(PwmEnable::Automatic)?;
        self.restored = true;
        Ok(())
    }

    /// Restore AUTOMATIC and release the controller
    pub fn detach(mut self) -> Result<()> {
        self.restore_automatic()
    }
}

impl<P: PortIo> Drop for FanControl<P> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.restore_automatic() {
            warn!("Failed to restore automatic fan control: {}", e);
        }
    }
}
