//! Shutdown handling for graceful daemon termination
//!
//! Hands the fan back to the EC before the process exits, so it never stays
//! pinned at a manual duty with nobody left to change it.

use gpdfan_hardware::{FanControl, PortIo};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Restore AUTOMATIC fan control
///
/// Failures are logged; shutdown proceeds regardless. The controller also
/// retries on drop if this did not go through.
pub async fn restore_automatic<P: PortIo>(fan: &Mutex<FanControl<P>>) {
    let mut fan = fan.lock().await;

    info!(
        "Restoring automatic fan control on {} (was {})",
        fan.board().kind,
        fan.pwm_enable()
    );

    match fan.restore_automatic() {
        Ok(()) => info!("Automatic fan control restored"),
        Err(e) => warn!("Failed to restore automatic fan control: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpdfan_core::board::{WIN_MAX_2, WIN_MINI};
    use gpdfan_core::PwmEnable;
    use gpdfan_hardware::{EcChannel, SimulatedEc};

    #[tokio::test]
    async fn test_restore_from_manual() {
        let sim = SimulatedEc::for_board(&WIN_MAX_2);
        let fan = Mutex::new(FanControl::attach(
            &WIN_MAX_2,
            EcChannel::new(sim.clone(), &WIN_MAX_2),
        ));
        fan.lock().await.apply_pwm_enable(PwmEnable::Manual).unwrap();

        restore_automatic(&fan).await;

        assert_eq!(fan.lock().await.pwm_enable(), PwmEnable::Automatic);
        assert_eq!(sim.register(0x0275), 0);
    }

    #[tokio::test]
    async fn test_restore_failure_is_not_fatal() {
        let sim = SimulatedEc::for_board(&WIN_MINI);
        let fan = Mutex::new(FanControl::attach(
            &WIN_MINI,
            EcChannel::new(sim.clone(), &WIN_MINI),
        ));
        fan.lock().await.apply_pwm_enable(PwmEnable::Manual).unwrap();
        sim.fail_writes(0x047A, 1);

        restore_automatic(&fan).await;

        // mode is only recorded once the EC accepted it
        assert_eq!(fan.lock().await.pwm_enable(), PwmEnable::Manual);
    }
}
