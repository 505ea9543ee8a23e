// Unit conversion for the differential drive
// Maps linear distance/speed to wheel rotation, heading change to per-wheel
// rotation, and a steering curvature to a left/right wheel velocity split.

use std::f64::consts::PI;

use crate::config::RobotConfig;

/// Steering curvature limits: 0 is straight, ±100 spins in place
pub const MAX_CURVATURE: i32 = 100;

/// Curvature at which the inner wheel stops
const PIVOT_CURVATURE: f64 = 50.0;

/// Wheel velocity commands (deg/s) for the two drive motors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelVelocities {
    pub left: i32,
    pub right: i32,
}

impl WheelVelocities {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Larger of the two wheel speeds
    pub fn max_abs(&self) -> i32 {
        self.left.abs().max(self.right.abs())
    }
}

/// Converts physical units into motor units for one robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    wheel_diameter_cm: f64,
    turn_speed_scale: f64,
}

impl UnitConverter {
    pub fn new(wheel_diameter_cm: f64, turn_speed_scale: f64) -> Self {
        Self {
            wheel_diameter_cm,
            turn_speed_scale,
        }
    }

    pub fn from_config(config: &RobotConfig) -> Self {
        Self::new(config.wheel_diameter_cm, config.turn_speed_scale)
    }

    /// Wheel degrees per cm of travel
    fn degrees_per_cm(&self) -> f64 {
        360.0 / (PI * self.wheel_diameter_cm)
    }

    /// Wheel rotation for a straight distance, truncated toward zero
    pub fn distance_to_degrees(&self, distance_cm: f64) -> i32 {
        (distance_cm * self.degrees_per_cm()) as i32
    }

    /// Distance travelled for a wheel rotation
    pub fn degrees_to_distance(&self, degrees: i32) -> f64 {
        degrees as f64 / self.degrees_per_cm()
    }

    /// Wheel velocity (deg/s) for a linear speed (cm/s)
    pub fn speed_to_velocity(&self, speed_cm_s: f64) -> i32 {
        (speed_cm_s * self.degrees_per_cm()) as i32
    }

    /// Per-wheel rotation for a heading change in a tank turn
    pub fn turn_to_degrees(&self, turn_degrees: f64, turn_factor: f64) -> i32 {
        (turn_degrees * turn_factor) as i32
    }

    /// Per-wheel velocity for a turn speed in heading deg/s
    pub fn turn_speed_to_velocity(&self, speed_deg_s: f64, turn_factor: f64) -> i32 {
        (speed_deg_s * turn_factor * self.turn_speed_scale) as i32
    }
}

/// Split a forward velocity into wheel velocities for a steering curvature
///
/// Positive curvature turns right: the left wheel keeps `velocity` while the
/// right wheel slows, stops at 50 and reverses up to a spin at 100. Negative
/// curvature mirrors this. Curvature is clamped to ±100.
pub fn curvature_to_wheels(curvature: i32, velocity: i32) -> WheelVelocities {
    let curvature = curvature.clamp(-MAX_CURVATURE, MAX_CURVATURE);
    let inner = |c: i32| (velocity as f64 * (1.0 - c.abs() as f64 / PIVOT_CURVATURE)).round() as i32;

    if curvature >= 0 {
        WheelVelocities::new(velocity, inner(curvature))
    } else {
        WheelVelocities::new(inner(curvature), velocity)
    }
}
