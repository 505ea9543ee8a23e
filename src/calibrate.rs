// Turn-factor calibration
//
// Spins the robot in place while watching the primary tilt axis. When the
// heading returns to the reference (the axis crosses from negative to
// non-negative) the drive stops and the left wheel's rotation over one full
// heading turn gives the turn factor: wheel degrees / 360.

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::{CalibrationConfig, RobotConfig};
use crate::error::{ConfigError, Error, Result};
use crate::hub::{Hub, Port};
use crate::messages::CalibrationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Running,
    Done,
}

/// True when a signal goes from negative to non-negative
pub fn crossed_zero(previous: i32, current: i32) -> bool {
    previous < 0 && current >= 0
}

pub struct Calibrator<'a, H: Hub> {
    hub: &'a mut H,
    left_wheel: Port,
    config: CalibrationConfig,
    state: CalibrationState,
}

impl<'a, H: Hub> Calibrator<'a, H> {
    pub fn new(hub: &'a mut H, left_wheel: Port, config: CalibrationConfig) -> Self {
        Self {
            hub,
            left_wheel,
            config,
            state: CalibrationState::Running,
        }
    }

    pub fn from_config(hub: &'a mut H, config: &RobotConfig) -> Self {
        Self::new(hub, config.ports.left_wheel, config.calibration)
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Run one calibration spin and return the measured turn factor
    ///
    /// The drive is always stopped on return, including on timeout or a hub fault.
    pub async fn run(&mut self) -> Result<CalibrationResult> {
        if !self.hub.ready(self.left_wheel) {
            return Err(ConfigError::PortNotReady(self.left_wheel).into());
        }
        self.state = CalibrationState::Running;

        let result = self.spin_until_crossing().await;
        if result.is_err() {
            if let Err(e) = self.hub.stop() {
                warn!("Failed to stop drive after calibration error: {}", e);
            }
        }
        self.state = CalibrationState::Done;
        result
    }

    async fn spin_until_crossing(&mut self) -> Result<CalibrationResult> {
        sleep(self.config.settle).await;
        info!("Calibrating to get the turn factor...");

        let spin = self.config.spin_velocity;
        let mut current = self.hub.tilt_angles()?.primary;
        self.hub.reset_relative_position(self.left_wheel, 0)?;
        let start = Instant::now();

        loop {
            self.hub.move_tank(-spin, spin)?;
            let last = current;
            current = self.hub.tilt_angles()?.primary;

            if crossed_zero(last, current) {
                self.hub.stop()?;
                let wheel_degrees = self.hub.relative_position(self.left_wheel)?;
                let turn_factor = wheel_degrees.unsigned_abs() as f64 / 360.0;
                info!(
                    "Calibration done after {:?}: {} wheel degrees per turn, turn_factor {:.4}",
                    start.elapsed(),
                    wheel_degrees,
                    turn_factor
                );
                return Ok(CalibrationResult { turn_factor });
            }

            if let Some(timeout) = self.config.timeout {
                if start.elapsed() >= timeout {
                    warn!("No heading zero crossing after {:?}, giving up", timeout);
                    self.hub.stop()?;
                    return Err(Error::CalibrationTimeout(timeout));
                }
            }

            debug!("Calibration tilt: {} -> {}", last, current);
            sleep(self.config.tick).await;
        }
    }
}
