// Proportional line follower
//
// Each tick reads the line sensor, steers by the distance from the edge
// reflectance (gain 1, no clamping), slows down as steering grows, then checks
// the stop conditions. A hard ceiling ends the loop even when no stop
// condition is set.

use tokio::time::{Instant, sleep};
use tracing::{info, trace, warn};

use crate::config::{LineFollowConfig, RobotConfig};
use crate::error::{ConfigError, Result};
use crate::hub::{Hub, Port};
use crate::messages::{LineFollowOutcome, StopConditionSet, StopReason, TelemetrySample};

/// Steering correction for a reflectance reading: zero on the edge,
/// positive (turn right) over the bright side
pub fn steering_proportion(reflectance: i32, medium_reflection: i32) -> i32 {
    reflectance - medium_reflection
}

impl StopConditionSet {
    /// First condition that holds for this tick, checked time, distance, secondary
    ///
    /// `secondary_reading` is `None` when no secondary sensor is configured or
    /// it is not ready; the condition is then false.
    pub fn evaluate(
        &self,
        sample: &TelemetrySample,
        secondary_reading: Option<u8>,
        medium_reflection: i32,
    ) -> Option<StopReason> {
        if self.time_limit.is_some_and(|limit| sample.elapsed >= limit) {
            return Some(StopReason::TimeLimit);
        }
        if self
            .distance_limit_degrees
            .is_some_and(|limit| sample.odometry_degrees >= limit)
        {
            return Some(StopReason::DistanceLimit);
        }
        if let (Some(secondary), Some(reading)) = (self.secondary, secondary_reading) {
            let threshold = secondary.threshold.unwrap_or(medium_reflection);
            if reading as i32 <= threshold {
                return Some(StopReason::SecondarySensor);
            }
        }
        None
    }

    /// Whether any of the conditions holds
    pub fn should_stop(
        &self,
        sample: &TelemetrySample,
        secondary_reading: Option<u8>,
        medium_reflection: i32,
    ) -> bool {
        self.evaluate(sample, secondary_reading, medium_reflection)
            .is_some()
    }
}

pub struct LineFollower<'a, H: Hub> {
    hub: &'a mut H,
    sensor: Port,
    left_wheel: Port,
    config: LineFollowConfig,
}

impl<'a, H: Hub> LineFollower<'a, H> {
    pub fn new(hub: &'a mut H, sensor: Port, left_wheel: Port, config: LineFollowConfig) -> Self {
        Self {
            hub,
            sensor,
            left_wheel,
            config,
        }
    }

    pub fn from_config(hub: &'a mut H, config: &RobotConfig) -> Self {
        Self::new(
            hub,
            config.ports.line_sensor,
            config.ports.left_wheel,
            config.line_follow,
        )
    }

    /// Follow the line until a stop condition or the hard ceiling fires
    pub async fn follow(&mut self, stops: &StopConditionSet) -> Result<LineFollowOutcome> {
        for port in [self.sensor, self.left_wheel] {
            if !self.hub.ready(port) {
                return Err(ConfigError::PortNotReady(port).into());
            }
        }
        info!("Following line on port {} until {:?}", self.sensor, stops);

        let result = self.run_loop(stops).await;
        // Hard stop on every exit path
        let stopped = self.hub.stop();
        let outcome = result?;
        stopped?;

        info!(
            "Line follow stopped ({:?}) after {:?}, {} wheel degrees",
            outcome.reason, outcome.elapsed, outcome.odometry_degrees
        );
        Ok(outcome)
    }

    async fn run_loop(&mut self, stops: &StopConditionSet) -> Result<LineFollowOutcome> {
        let medium = self.config.medium_reflection();
        let ceiling = self.config.max_duration;
        // Never sleep past the earliest time-based exit
        let deadline = stops.time_limit.map_or(ceiling, |limit| limit.min(ceiling));
        let mut secondary_warned = false;
        let mut ticks = 0u32;

        self.hub.reset_relative_position(self.left_wheel, 0)?;
        let start = Instant::now();

        loop {
            let elapsed = start.elapsed();
            let odometry_degrees = self.hub.relative_position(self.left_wheel)?.unsigned_abs();
            let reflectance = self.hub.reflection(self.sensor)?;
            let sample = TelemetrySample {
                elapsed,
                odometry_degrees,
                reflectance,
            };
            trace!(?sample, "line follow tick");

            let steering = steering_proportion(reflectance as i32, medium);
            self.hub
                .drive(steering, self.config.base_velocity - steering.abs())?;
            ticks += 1;

            let secondary_reading = match stops.secondary {
                Some(secondary) if self.hub.ready(secondary.port) => {
                    Some(self.hub.reflection(secondary.port)?)
                }
                Some(secondary) => {
                    if !secondary_warned {
                        warn!(
                            "Secondary sensor on port {} not ready, ignoring it",
                            secondary.port
                        );
                        secondary_warned = true;
                    }
                    None
                }
                None => None,
            };

            let reason = stops
                .evaluate(&sample, secondary_reading, medium)
                .or((elapsed >= ceiling).then_some(StopReason::HardCeiling));
            if let Some(reason) = reason {
                return Ok(LineFollowOutcome {
                    reason,
                    elapsed,
                    odometry_degrees,
                    ticks,
                });
            }

            let remaining = deadline.saturating_sub(start.elapsed());
            sleep(self.config.tick.min(remaining)).await;
        }
    }
}
