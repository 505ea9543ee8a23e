// Mission runner
// Owns the hub and the robot config, and runs steps one at a time. Each step
// borrows the hub for its controller, so a step finishes before the next
// one can issue a command.

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info};

use crate::calibrate::Calibrator;
use crate::config::RobotConfig;
use crate::error::{ConfigError, Result};
use crate::hub::Hub;
use crate::line_follow::LineFollower;
use crate::messages::{
    CalibrationResult, LineFollowOutcome, Mission, MissionStep, MotionRequest,
};
use crate::motion::{ArmController, DriveController};

/// What a finished step reports back
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOutcome {
    Moved,
    Waited,
    Calibrated(CalibrationResult),
    FollowedLine(LineFollowOutcome),
}

pub struct Runtime<H: Hub> {
    hub: H,
    config: RobotConfig,
}

impl<H: Hub> Runtime<H> {
    /// Validate the config, check the drive and arm motors are attached and pair the wheels
    pub fn new(mut hub: H, config: RobotConfig) -> Result<Self> {
        config.validate()?;

        let ports = config.ports;
        for port in [ports.left_wheel, ports.right_wheel, ports.arm] {
            if !hub.ready(port) {
                return Err(ConfigError::PortNotReady(port).into());
            }
        }
        hub.pair(ports.left_wheel, ports.right_wheel)?;

        info!(
            "Runtime ready: wheels {}/{}, arm {}, turn_factor {}",
            ports.left_wheel, ports.right_wheel, ports.arm, config.turn_factor
        );
        Ok(Self { hub, config })
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn hub_mut(&mut self) -> &mut H {
        &mut self.hub
    }

    /// Run a single motion primitive, filling in default speeds
    pub async fn run_motion(&mut self, request: MotionRequest) -> Result<()> {
        request.validate()?;
        let config = &self.config;

        match request {
            MotionRequest::Straight {
                direction,
                distance,
                speed,
            } => {
                DriveController::new(&mut self.hub, config)
                    .straight(direction, distance, speed.unwrap_or(config.default_speed))
                    .await
            }
            MotionRequest::Turn {
                direction,
                degrees,
                speed,
                turn_factor,
            } => {
                DriveController::new(&mut self.hub, config)
                    .turn(
                        direction,
                        degrees,
                        speed.unwrap_or(config.default_turn_speed),
                        turn_factor.unwrap_or(config.turn_factor),
                    )
                    .await
            }
            MotionRequest::ArmMove {
                direction,
                degrees,
                speed,
            } => {
                ArmController::new(&mut self.hub, config.ports.arm, config.arm_gear_factor)
                    .move_arm(direction, degrees, speed.unwrap_or(config.default_arm_speed))
                    .await
            }
        }
    }

    /// Run one step to completion
    pub async fn execute(&mut self, step: &MissionStep) -> Result<StepOutcome> {
        match step {
            MissionStep::Motion(request) => {
                self.run_motion(*request).await?;
                Ok(StepOutcome::Moved)
            }
            MissionStep::Wait { ms } => {
                sleep(Duration::from_millis(*ms)).await;
                Ok(StepOutcome::Waited)
            }
            MissionStep::Calibrate => {
                let result = Calibrator::from_config(&mut self.hub, &self.config)
                    .run()
                    .await?;
                self.config.apply_calibration(result)?;
                Ok(StepOutcome::Calibrated(result))
            }
            MissionStep::FollowLine(stops) => {
                let outcome = LineFollower::from_config(&mut self.hub, &self.config)
                    .follow(stops)
                    .await?;
                Ok(StepOutcome::FollowedLine(outcome))
            }
        }
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run_mission(&mut self, mission: &Mission) -> Result<Vec<StepOutcome>> {
        info!(
            "Mission '{}' started: {} steps",
            mission.name,
            mission.steps.len()
        );

        let mut outcomes = Vec::with_capacity(mission.steps.len());
        for (index, step) in mission.steps.iter().enumerate() {
            match self.execute(step).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(
                        "Mission '{}' aborted at step {}: {}",
                        mission.name,
                        index + 1,
                        e
                    );
                    return Err(e);
                }
            }
        }

        info!("Mission '{}' complete", mission.name);
        Ok(outcomes)
    }
}
