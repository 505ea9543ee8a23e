// Hardware capability set the controllers drive
//
// Provides:
// - Port naming for the six hub ports
// - DrivePair: the paired wheel motors
// - MotorBank: individual motors (arm, odometry reads)
// - SensorBank: reflectance, tilt and readiness
//
// Motions that take a degree count are async and resolve only once the
// rotation has finished. Controllers hold `&mut` access to the hub, so two
// commands can never overlap on the same drive.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[cfg(test)]
pub mod mock;
pub mod sim;

pub use sim::{Mat, SimHub, SimParams};

/// Hub port letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Two-axis orientation reading. The primary axis is the one calibration
/// watches for a zero crossing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiltAngles {
    pub primary: i32,
    pub secondary: i32,
}

impl TiltAngles {
    pub fn new(primary: i32, secondary: i32) -> Self {
        Self { primary, secondary }
    }
}

/// Paired wheel motors of a differential drive
pub trait DrivePair {
    /// Bind two motors as the left and right wheels
    fn pair(&mut self, left: Port, right: Port) -> Result<()>;

    /// Drive both wheels for `degrees` with a steering curvature in [-100, 100]
    fn move_for_degrees(
        &mut self,
        degrees: u32,
        curvature: i32,
        velocity: i32,
    ) -> impl Future<Output = Result<()>>;

    /// Drive each wheel at its own velocity until the faster one has turned `degrees`
    fn move_tank_for_degrees(
        &mut self,
        degrees: u32,
        left_velocity: i32,
        right_velocity: i32,
    ) -> impl Future<Output = Result<()>>;

    /// Start both wheels at the given velocities and return immediately
    fn move_tank(&mut self, left_velocity: i32, right_velocity: i32) -> Result<()>;

    /// Start driving with a steering curvature and return immediately
    fn drive(&mut self, curvature: i32, velocity: i32) -> Result<()>;

    /// Stop and hold both wheels
    fn stop(&mut self) -> Result<()>;
}

/// Individually addressed motors
pub trait MotorBank {
    fn run_for_degrees(
        &mut self,
        port: Port,
        degrees: u32,
        velocity: i32,
    ) -> impl Future<Output = Result<()>>;

    fn reset_relative_position(&mut self, port: Port, value: i32) -> Result<()>;

    /// Degrees turned since the last reset
    fn relative_position(&mut self, port: Port) -> Result<i32>;
}

pub trait SensorBank {
    /// Reflected light, 0 (dark) to 100 (bright)
    fn reflection(&mut self, port: Port) -> Result<u8>;

    fn tilt_angles(&mut self) -> Result<TiltAngles>;

    /// Whether a device is attached and initialised on `port`
    fn ready(&self, port: Port) -> bool;
}

/// Everything the controllers need from one hub
pub trait Hub: DrivePair + MotorBank + SensorBank {}

impl<T: DrivePair + MotorBank + SensorBank> Hub for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_display_and_json() {
        assert_eq!(Port::E.to_string(), "E");
        assert_eq!(serde_json::to_string(&Port::D).unwrap(), "\"D\"");
        assert_eq!(serde_json::from_str::<Port>("\"C\"").unwrap(), Port::C);
        assert!(serde_json::from_str::<Port>("\"G\"").is_err());
    }
}
