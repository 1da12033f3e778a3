//! Per-board fan quirks
//!
//! The four boards agree on what a fan is but not on how to drive it. Each
//! operation here takes the board, the register channel and whatever slice
//! of controller state it needs as plain parameters, and dispatches on
//! [`BoardKind`].
//!
//! | board        | RPM pre-read            | PWM readback | writes allowed in   | AUTOMATIC via        |
//! |--------------|-------------------------|--------------|---------------------|----------------------|
//! | `win_mini`   | -                       | intent       | MANUAL              | duty sentinel `0`    |
//! | `duo`        | -                       | intent       | MANUAL              | duty sentinel `0`    |
//! | `win4_6800u` | counter `0x1841`=`0x7F` | intent       | MANUAL              | duty sentinel `0`    |
//! | `win_max_2`  | `0x1841..=0x1843`=`0xB8`| native       | MANUAL, AUTOMATIC   | enable register `0`  |

use gpdfan_core::{BoardDescriptor, BoardKind, GpdFanError, PwmEnable, Result};
use tracing::debug;

use crate::ec_channel::EcChannel;
use crate::port_io::PortIo;

/// Win 4 PWM counter control register and its steady-state value
const WIN4_PWM_COUNTER: u16 = 0x1841;
const WIN4_PWM_COUNTER_STEADY: u8 = 0x7F;

/// Win 4 chip identity register and the marker of the re-armable chip
const WIN4_CHIP_ID: u16 = 0x2000;
const WIN4_CHIP_ID_MARKER: u8 = 0x55;
/// Win 4 chip version register; setting the high bit re-arms the EC
const WIN4_CHIP_VERSION: u16 = 0x1060;
const WIN4_REARM_BIT: u8 = 0x80;

/// Win Max 2 PWM counter control registers and their steady-state value
const WM2_PWM_COUNTERS: std::ops::RangeInclusive<u16> = 0x1841..=0x1843;
const WM2_PWM_COUNTER_STEADY: u8 = 0xB8;

/// Raw duty value that hands control back to the EC on boards without an
/// auto-enable register
const AUTOMATIC_SENTINEL: u8 = 0;

const MANUAL_ENABLE: u8 = 1;
const AUTOMATIC_ENABLE: u8 = 0;

/// Read the fan speed in RPM, uncached.
pub fn read_rpm<P: PortIo>(ec: &mut EcChannel<P>, board: &BoardDescriptor) -> Result<u16> {
    match board.kind {
        BoardKind::WinMini | BoardKind::Duo => ec.read_word(board.rpm_read),
        BoardKind::Win4 => {
            normalize_counter(ec, WIN4_PWM_COUNTER, WIN4_PWM_COUNTER_STEADY)?;

            let rpm = ec.read_word(board.rpm_read)?;
            if rpm == 0 {
                reinit_win4_best_effort(ec);
            }
            Ok(rpm)
        }
        BoardKind::WinMax2 => {
            for offset in WM2_PWM_COUNTERS {
                normalize_counter(ec, offset, WM2_PWM_COUNTER_STEADY)?;
            }
            ec.read_word(board.rpm_read)
        }
    }
}

/// Read the normalized 0-255 duty, uncached.
///
/// Boards whose duty register does not read back report `requested`, the
/// last value the user asked for, without touching the EC.
pub fn read_pwm<P: PortIo>(
    ec: &mut EcChannel<P>,
    board: &BoardDescriptor,
    requested: u8,
) -> Result<u8> {
    if board.has_native_pwm_readback() {
        let raw = ec.read(board.pwm_write)?;
        Ok(board.from_native(raw))
    } else {
        Ok(requested)
    }
}

/// Whether `mode` lets a PWM write reach the duty register on this board.
pub fn write_allowed(board: &BoardDescriptor, mode: PwmEnable) -> bool {
    match board.kind {
        BoardKind::WinMax2 => mode != PwmEnable::Disable,
        BoardKind::WinMini | BoardKind::Duo | BoardKind::Win4 => mode == PwmEnable::Manual,
    }
}

/// Scale `value` to the board's native range and write it.
///
/// Returns the native duty that was written.
///
/// # Errors
///
/// [`GpdFanError::PermissionDenied`] when `mode` forbids direct writes; the
/// EC is not touched in that case.
pub fn write_pwm<P: PortIo>(
    ec: &mut EcChannel<P>,
    board: &BoardDescriptor,
    mode: PwmEnable,
    value: u8,
) -> Result<u8> {
    if !write_allowed(board, mode) {
        return Err(GpdFanError::PermissionDenied(format!(
            "{} does not accept PWM writes in {} mode",
            board.kind, mode
        )));
    }

    let native = board.to_native(value);
    write_native(ec, board, native)?;
    Ok(native)
}

/// Write a native duty. The Duo latches only on the second of two writes,
/// so it always gets `native` then `native + 1`.
fn write_native<P: PortIo>(ec: &mut EcChannel<P>, board: &BoardDescriptor, native: u8) -> Result<()> {
    ec.write(board.pwm_write, native)?;
    if board.kind == BoardKind::Duo {
        ec.write(board.pwm_write, native.saturating_add(1))?;
    }
    Ok(())
}

/// Drive the EC into `mode`, re-deriving every register from `(mode, pwm_value)`.
pub fn set_pwm_enable<P: PortIo>(
    ec: &mut EcChannel<P>,
    board: &BoardDescriptor,
    mode: PwmEnable,
    pwm_value: u8,
) -> Result<()> {
    match mode {
        PwmEnable::Disable => {
            write_native(ec, board, board.to_native(u8::MAX))?;
            if board.has_auto_enable_register() {
                ec.write(board.manual_control_enable, MANUAL_ENABLE)?;
            }
        }
        PwmEnable::Manual => {
            write_native(ec, board, board.to_native(pwm_value))?;
            if board.has_auto_enable_register() {
                ec.write(board.manual_control_enable, MANUAL_ENABLE)?;
            }
        }
        PwmEnable::Automatic => {
            if board.has_auto_enable_register() {
                ec.write(board.manual_control_enable, AUTOMATIC_ENABLE)?;
            } else {
                ec.write(board.pwm_write, AUTOMATIC_SENTINEL)?;
            }
        }
    }
    Ok(())
}

/// One-time work when the controller attaches to a board.
pub fn on_attach<P: PortIo>(ec: &mut EcChannel<P>, board: &BoardDescriptor) {
    if board.kind == BoardKind::Win4 {
        reinit_win4_best_effort(ec);
    }
}

/// Rewrite a counter control register if it drifted from `steady`.
fn normalize_counter<P: PortIo>(ec: &mut EcChannel<P>, offset: u16, steady: u8) -> Result<()> {
    let current = ec.read(offset)?;
    if current != steady {
        debug!(
            "PWM counter 0x{:04X} at 0x{:02X}, resetting to 0x{:02X}",
            offset, current, steady
        );
        ec.write(offset, steady)?;
    }
    Ok(())
}

/// Re-arm the Win 4 EC after it stops reporting fan speed.
///
/// Returns whether the re-arm write was issued. Only the chip carrying the
/// `0x55` identity marker is touched.
pub fn reinit_win4_ec<P: PortIo>(ec: &mut EcChannel<P>) -> Result<bool> {
    let chip_id = ec.read(WIN4_CHIP_ID)?;
    if chip_id != WIN4_CHIP_ID_MARKER {
        return Ok(false);
    }

    let version = ec.read(WIN4_CHIP_VERSION)?;
    ec.write(WIN4_CHIP_VERSION, version | WIN4_REARM_BIT)?;
    Ok(true)
}

/// [`reinit_win4_ec`] with its outcome discarded.
///
/// Runs after the caller already has its answer, so nothing here may change
/// that answer; failures are logged and dropped.
fn reinit_win4_best_effort<P: PortIo>(ec: &mut EcChannel<P>) {
    match reinit_win4_ec(ec) {
        Ok(true) => debug!("Win 4 EC re-armed"),
        Ok(false) => debug!("Win 4 EC chip not re-armable, skipping"),
        Err(e) => debug!("Win 4 EC re-initialization failed (ignored): {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedEc;
    use gpdfan_core::board::{DUO, WIN4_6800U, WIN_MAX_2, WIN_MINI};

    fn channel(board: &BoardDescriptor) -> (SimulatedEc, EcChannel<SimulatedEc>) {
        let sim = SimulatedEc::for_board(board);
        let ec = EcChannel::new(sim.clone(), board);
        (sim, ec)
    }

    #[test]
    fn test_win_mini_rpm_is_plain_word() {
        let (sim, mut ec) = channel(&WIN_MINI);
        sim.set_word(0x0478, 0x1234);

        assert_eq!(read_rpm(&mut ec, &WIN_MINI).unwrap(), 0x1234);
        assert_eq!(sim.reads(), vec![0x0478, 0x0479]);
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_win4_counter_rewritten_only_when_drifted() {
        let (sim, mut ec) = channel(&WIN4_6800U);

        read_rpm(&mut ec, &WIN4_6800U).unwrap();
        assert!(sim.writes().is_empty());

        sim.set_register(0x1841, 0x10);
        read_rpm(&mut ec, &WIN4_6800U).unwrap();
        assert_eq!(sim.writes(), vec![(0x1841, 0x7F)]);
    }

    #[test]
    fn test_win4_nonzero_rpm_skips_reinit() {
        let (sim, mut ec) = channel(&WIN4_6800U);
        sim.set_register(0x2000, 0x55);

        assert_eq!(read_rpm(&mut ec, &WIN4_6800U).unwrap(), 3000);
        assert!(!sim.reads().contains(&0x2000));
    }

    #[test]
    fn test_win4_zero_rpm_other_chip_not_rearmed() {
        let (sim, mut ec) = channel(&WIN4_6800U);
        sim.set_word(0xC880, 0);
        sim.set_register(0x2000, 0x33);

        assert_eq!(read_rpm(&mut ec, &WIN4_6800U).unwrap(), 0);
        assert!(sim.reads().contains(&0x2000));
        assert!(!sim.reads().contains(&0x1060));
        assert!(sim.writes_to(0x1060).is_empty());
    }

    #[test]
    fn test_win4_reinit_failure_is_swallowed() {
        let (sim, mut ec) = channel(&WIN4_6800U);
        sim.set_word(0xC880, 0);
        sim.set_register(0x2000, 0x55);
        sim.fail_reads(0x1060, 1);

        assert_eq!(read_rpm(&mut ec, &WIN4_6800U).unwrap(), 0);
        assert!(sim.writes_to(0x1060).is_empty());
    }

    #[test]
    fn test_reinit_sets_high_bit_of_version() {
        let (sim, mut ec) = channel(&WIN4_6800U);
        sim.set_register(0x2000, 0x55);
        sim.set_register(0x1060, 0x21);

        assert!(reinit_win4_ec(&mut ec).unwrap());
        assert_eq!(sim.register(0x1060), 0xA1);
    }

    #[test]
    fn test_wm2_counters_normalized() {
        let (sim, mut ec) = channel(&WIN_MAX_2);
        sim.set_register(0x1842, 0x00);

        assert_eq!(read_rpm(&mut ec, &WIN_MAX_2).unwrap(), 3000);
        assert_eq!(sim.writes(), vec![(0x1842, 0xB8)]);
        for offset in 0x1841..=0x1843 {
            assert_eq!(sim.register(offset), 0xB8);
        }
    }

    #[test]
    fn test_counter_read_failure_propagates() {
        let (sim, mut ec) = channel(&WIN_MAX_2);
        sim.fail_reads(0x1843, 1);

        assert!(matches!(
            read_rpm(&mut ec, &WIN_MAX_2),
            Err(GpdFanError::Io(_))
        ));
    }

    #[test]
    fn test_read_pwm_native_vs_intent() {
        let (sim, mut ec) = channel(&WIN_MAX_2);
        sim.set_register(0x1809, 184);
        assert_eq!(read_pwm(&mut ec, &WIN_MAX_2, 10).unwrap(), 255);

        let (sim, mut ec) = channel(&WIN_MINI);
        assert_eq!(read_pwm(&mut ec, &WIN_MINI, 77).unwrap(), 77);
        assert!(sim.reads().is_empty());
    }

    #[test]
    fn test_write_policy() {
        for board in [&WIN_MINI, &DUO, &WIN4_6800U] {
            assert!(!write_allowed(board, PwmEnable::Disable));
            assert!(write_allowed(board, PwmEnable::Manual));
            assert!(!write_allowed(board, PwmEnable::Automatic));
        }
        assert!(!write_allowed(&WIN_MAX_2, PwmEnable::Disable));
        assert!(write_allowed(&WIN_MAX_2, PwmEnable::Manual));
        assert!(write_allowed(&WIN_MAX_2, PwmEnable::Automatic));
    }

    #[test]
    fn test_refused_write_touches_nothing() {
        let (sim, mut ec) = channel(&WIN_MINI);

        let result = write_pwm(&mut ec, &WIN_MINI, PwmEnable::Automatic, 100);
        assert!(matches!(result, Err(GpdFanError::PermissionDenied(_))));
        assert!(sim.transcript().is_empty());
    }

    #[test]
    fn test_write_pwm_scales() {
        let (sim, mut ec) = channel(&WIN_MAX_2);

        assert_eq!(write_pwm(&mut ec, &WIN_MAX_2, PwmEnable::Manual, 128).unwrap(), 92);
        assert_eq!(sim.writes(), vec![(0x1809, 92)]);
    }

    #[test]
    fn test_duo_double_write() {
        let (sim, mut ec) = channel(&DUO);

        let native = write_pwm(&mut ec, &DUO, PwmEnable::Manual, 200).unwrap();
        assert_eq!(sim.writes_to(0x047A), vec![native, native + 1]);
    }

    #[test]
    fn test_set_pwm_enable_register_boards() {
        let (sim, mut ec) = channel(&WIN_MAX_2);

        set_pwm_enable(&mut ec, &WIN_MAX_2, PwmEnable::Disable, 0).unwrap();
        assert_eq!(sim.writes(), vec![(0x1809, 184), (0x0275, 1)]);

        sim.clear_log();
        set_pwm_enable(&mut ec, &WIN_MAX_2, PwmEnable::Manual, 128).unwrap();
        assert_eq!(sim.writes(), vec![(0x1809, 92), (0x0275, 1)]);

        sim.clear_log();
        set_pwm_enable(&mut ec, &WIN_MAX_2, PwmEnable::Automatic, 128).unwrap();
        assert_eq!(sim.writes(), vec![(0x0275, 0)]);
    }

    #[test]
    fn test_set_pwm_enable_sentinel_boards() {
        let (sim, mut ec) = channel(&WIN4_6800U);

        set_pwm_enable(&mut ec, &WIN4_6800U, PwmEnable::Disable, 0).unwrap();
        assert_eq!(sim.writes(), vec![(0xC311, 127)]);

        sim.clear_log();
        set_pwm_enable(&mut ec, &WIN4_6800U, PwmEnable::Automatic, 0).unwrap();
        assert_eq!(sim.writes(), vec![(0xC311, 0)]);
    }

    #[test]
    fn test_duo_automatic_sentinel_written_once() {
        let (sim, mut ec) = channel(&DUO);

        set_pwm_enable(&mut ec, &DUO, PwmEnable::Automatic, 255).unwrap();
        assert_eq!(sim.writes(), vec![(0x047A, 0)]);
    }

    #[test]
    fn test_on_attach_rearms_win4_only() {
        let (sim, mut ec) = channel(&WIN4_6800U);
        sim.set_register(0x2000, 0x55);
        on_attach(&mut ec, &WIN4_6800U);
        assert_eq!(sim.writes_to(0x1060), vec![0x80]);

        let (sim, mut ec) = channel(&WIN_MINI);
        on_attach(&mut ec, &WIN_MINI);
        assert!(sim.transcript().is_empty());
    }
}
