// Straight moves and tank turns for the paired drive wheels
//
// Converts physical requests through UnitConverter and issues a single
// degree-bounded command per primitive. Each call resolves only when the
// wheels have finished turning.

use tracing::{debug, info, warn};

use super::units::UnitConverter;
use crate::config::RobotConfig;
use crate::error::{Result, ensure_moving, ensure_non_negative, ensure_positive};
use crate::hub::DrivePair;
use crate::messages::{StraightDirection, TurnDirection};

/// Drive controller holding exclusive use of the wheel pair
pub struct DriveController<'a, H: DrivePair> {
    hub: &'a mut H,
    units: UnitConverter,
}

impl<'a, H: DrivePair> DriveController<'a, H> {
    pub fn new(hub: &'a mut H, config: &RobotConfig) -> Self {
        Self {
            hub,
            units: UnitConverter::from_config(config),
        }
    }

    /// Move straight forward or backward
    ///
    /// # Arguments
    /// * `distance_cm` - Distance to travel (cm)
    /// * `speed_cm_s` - Linear speed (cm/s), sign comes from `direction`
    pub async fn straight(
        &mut self,
        direction: StraightDirection,
        distance_cm: f64,
        speed_cm_s: f64,
    ) -> Result<()> {
        ensure_non_negative("distance", distance_cm)?;
        ensure_positive("speed", speed_cm_s)?;
        info!(
            "Move {} for {} cm with speed {} cm/s.",
            direction, distance_cm, speed_cm_s
        );

        let degrees = self.units.distance_to_degrees(distance_cm).unsigned_abs();
        let velocity = self.units.speed_to_velocity(speed_cm_s);
        ensure_moving(degrees, velocity)?;
        let velocity = match direction {
            StraightDirection::Forward => velocity,
            StraightDirection::Backward => -velocity,
        };

        debug!("Straight: {} wheel degrees at {} deg/s", degrees, velocity);
        self.hub.move_for_degrees(degrees, 0, velocity).await
    }

    /// Tank turn in place: both wheels turn the same amount in opposite directions
    ///
    /// # Arguments
    /// * `degrees` - Heading change
    /// * `speed` - Turn speed (heading deg/s)
    /// * `turn_factor` - Wheel degrees per degree of heading
    pub async fn turn(
        &mut self,
        direction: TurnDirection,
        degrees: f64,
        speed: f64,
        turn_factor: f64,
    ) -> Result<()> {
        ensure_non_negative("degrees", degrees)?;
        ensure_positive("speed", speed)?;
        ensure_positive("turn_factor", turn_factor)?;
        info!(
            "Turn {} for {} degrees with speed {} degrees/s and turn_factor {}.",
            direction, degrees, speed, turn_factor
        );

        let wheel_degrees = self.units.turn_to_degrees(degrees, turn_factor).unsigned_abs();
        let velocity = self.units.turn_speed_to_velocity(speed, turn_factor);
        ensure_moving(wheel_degrees, velocity)?;
        let (left, right) = match direction {
            TurnDirection::Left => (-velocity, velocity),
            TurnDirection::Right => (velocity, -velocity),
        };

        debug!(
            "Tank turn: {} wheel degrees, left={}, right={}",
            wheel_degrees, left, right
        );
        self.hub
            .move_tank_for_degrees(wheel_degrees, left, right)
            .await
    }

    /// Stop and hold both wheels
    pub fn stop(&mut self) -> Result<()> {
        self.hub.stop()
    }
}

impl<H: DrivePair> Drop for DriveController<'_, H> {
    fn drop(&mut self) {
        // Leave the wheels held when control is handed back
        if let Err(e) = self.hub.stop() {
            warn!("Failed to stop drive on release: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};
    use crate::hub::mock::{Command, MockHub};

    #[tokio::test]
    async fn test_turn_left_mirrors_velocities() {
        let mut hub = MockHub::new();
        let config = RobotConfig::default();
        DriveController::new(&mut hub, &config)
            .turn(TurnDirection::Left, 90.0, 10.0, 1.638)
            .await
            .unwrap();

        assert_eq!(
            hub.commands[0],
            Command::MoveTankForDegrees {
                degrees: 147,
                left_velocity: -163,
                right_velocity: 163,
            }
        );
    }

    #[tokio::test]
    async fn test_turn_right_mirrors_velocities() {
        let mut hub = MockHub::new();
        let config = RobotConfig::default();
        DriveController::new(&mut hub, &config)
            .turn(TurnDirection::Right, 90.0, 10.0, 1.638)
            .await
            .unwrap();

        assert_eq!(
            hub.commands[0],
            Command::MoveTankForDegrees {
                degrees: 147,
                left_velocity: 163,
                right_velocity: -163,
            }
        );
    }

    #[tokio::test]
    async fn test_straight_signs_velocity() {
        let mut hub = MockHub::new();
        let config = RobotConfig::default();
        {
            let mut drive = DriveController::new(&mut hub, &config);
            drive
                .straight(StraightDirection::Forward, 10.0, 40.0)
                .await
                .unwrap();
            drive
                .straight(StraightDirection::Backward, 10.0, 40.0)
                .await
                .unwrap();
        }

        assert_eq!(
            hub.commands,
            vec![
                Command::MoveForDegrees {
                    degrees: 130,
                    curvature: 0,
                    velocity: 521,
                },
                Command::MoveForDegrees {
                    degrees: 130,
                    curvature: 0,
                    velocity: -521,
                },
                // Released controller holds the wheels
                Command::Stop,
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_request_issues_no_motion() {
        let mut hub = MockHub::new();
        let config = RobotConfig::default();
        {
            let mut drive = DriveController::new(&mut hub, &config);
            let err = drive
                .straight(StraightDirection::Forward, 10.0, 0.0)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Config(ConfigError::NonPositive { name: "speed", .. })
            ));

            let err = drive
                .turn(TurnDirection::Left, 90.0, 10.0, -1.0)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Config(ConfigError::NonPositive {
                    name: "turn_factor",
                    ..
                })
            ));
        }
        assert_eq!(hub.commands, vec![Command::Stop]);
    }

    #[tokio::test]
    async fn test_speed_truncating_to_zero_is_rejected() {
        let mut hub = MockHub::new();
        let config = RobotConfig::default();
        {
            let mut drive = DriveController::new(&mut hub, &config);
            // 0.05 cm/s is 0.65 deg/s at the wheel
            let err = drive
                .straight(StraightDirection::Forward, 10.0, 0.05)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Config(ConfigError::NonPositive {
                    name: "velocity",
                    ..
                })
            ));

            // 0.005 deg/s of heading is 0.08 deg/s per wheel
            let err = drive
                .turn(TurnDirection::Right, 90.0, 0.005, 1.638)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Config(ConfigError::NonPositive {
                    name: "velocity",
                    ..
                })
            ));

            // Nothing to turn, nothing to reject
            drive
                .straight(StraightDirection::Forward, 0.0, 0.05)
                .await
                .unwrap();
        }
        assert_eq!(
            hub.commands,
            vec![
                Command::MoveForDegrees {
                    degrees: 0,
                    curvature: 0,
                    velocity: 0,
                },
                Command::Stop,
            ]
        );
    }
}
