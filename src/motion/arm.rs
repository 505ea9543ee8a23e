// Attachment arm on a single motor
// The arm linkage is geared, so requested arm degrees are scaled by the gear
// factor. Down is negative motor velocity by convention.

use tracing::{debug, info};

use crate::error::{Result, ensure_moving, ensure_non_negative, ensure_positive};
use crate::hub::{MotorBank, Port};
use crate::messages::ArmDirection;

pub struct ArmController<'a, H: MotorBank> {
    hub: &'a mut H,
    port: Port,
    gear_factor: f64,
}

impl<'a, H: MotorBank> ArmController<'a, H> {
    pub fn new(hub: &'a mut H, port: Port, gear_factor: f64) -> Self {
        Self {
            hub,
            port,
            gear_factor,
        }
    }

    /// Move the arm `degrees` up or down at `speed` motor deg/s
    pub async fn move_arm(&mut self, direction: ArmDirection, degrees: f64, speed: f64) -> Result<()> {
        ensure_non_negative("degrees", degrees)?;
        ensure_positive("speed", speed)?;
        ensure_positive("arm_gear_factor", self.gear_factor)?;
        info!(
            "Move arm {} for {} degrees with speed {} degrees/s.",
            direction, degrees, speed
        );

        let motor_degrees = (self.gear_factor * degrees) as u32;
        let velocity = speed as i32;
        ensure_moving(motor_degrees, velocity)?;
        let velocity = match direction {
            ArmDirection::Up => velocity,
            ArmDirection::Down => -velocity,
        };

        debug!(
            "Arm motor {}: {} degrees at {} deg/s",
            self.port, motor_degrees, velocity
        );
        self.hub
            .run_for_degrees(self.port, motor_degrees, velocity)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};
    use crate::hub::mock::{Command, MockHub};

    #[tokio::test]
    async fn test_arm_down_is_negative() {
        let mut hub = MockHub::new();
        ArmController::new(&mut hub, Port::D, 5.0)
            .move_arm(ArmDirection::Down, 50.0, 360.0)
            .await
            .unwrap();

        assert_eq!(
            hub.commands,
            vec![Command::RunForDegrees {
                port: Port::D,
                degrees: 250,
                velocity: -360,
            }]
        );
    }

    #[tokio::test]
    async fn test_arm_up_is_positive() {
        let mut hub = MockHub::new();
        ArmController::new(&mut hub, Port::D, 5.0)
            .move_arm(ArmDirection::Up, 70.0, 720.0)
            .await
            .unwrap();

        assert_eq!(
            hub.commands,
            vec![Command::RunForDegrees {
                port: Port::D,
                degrees: 350,
                velocity: 720,
            }]
        );
    }

    #[tokio::test]
    async fn test_arm_truncates_speed() {
        let mut hub = MockHub::new();
        ArmController::new(&mut hub, Port::D, 5.0)
            .move_arm(ArmDirection::Up, 10.5, 359.9)
            .await
            .unwrap();

        assert_eq!(
            hub.commands,
            vec![Command::RunForDegrees {
                port: Port::D,
                degrees: 52,
                velocity: 359,
            }]
        );
    }

    #[tokio::test]
    async fn test_arm_speed_below_one_is_rejected() {
        let mut hub = MockHub::new();
        let err = ArmController::new(&mut hub, Port::D, 5.0)
            .move_arm(ArmDirection::Up, 10.0, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::NonPositive {
                name: "velocity",
                ..
            })
        ));
        assert!(hub.commands.is_empty());
    }

    #[tokio::test]
    async fn test_arm_on_missing_motor_fails() {
        let mut hub = MockHub::new();
        hub.detach(Port::D);
        let result = ArmController::new(&mut hub, Port::D, 5.0)
            .move_arm(ArmDirection::Up, 10.0, 360.0)
            .await;
        assert!(result.is_err());
        assert!(hub.commands.is_empty());
    }
}
