// Simulated hub: a differential-drive robot on a line-following mat
//
// Wheel motion is integrated exactly between commands using the tokio clock,
// so tests running on paused time are deterministic. Encoders report the
// commanded shaft rotation; `slip` scales how much of it reaches the ground.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use super::{DrivePair, MotorBank, Port, SensorBank, TiltAngles};
use crate::config::{BLACK_REFLECTION, PortMap, WHEEL_DIAMETER_CM, WHITE_REFLECTION};
use crate::error::{Error, Result};
use crate::motion::units::{WheelVelocities, curvature_to_wheels};

/// Track width that makes the default turn factor come out of the geometry
pub const TRACK_WIDTH_CM: f64 = 14.4;

/// Reflectance of the marker tape
const MARKER_REFLECTION: f64 = 10.0;

/// Physical parameters of the simulated robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub wheel_diameter_cm: f64,
    pub track_width_cm: f64,
    /// Ground travel per unit of shaft rotation (1.0 = no slip)
    pub slip: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            wheel_diameter_cm: WHEEL_DIAMETER_CM,
            track_width_cm: TRACK_WIDTH_CM,
            slip: 1.0,
        }
    }
}

/// The surface under the robot
///
/// Dark below the x axis, bright above it, with a linear ramp across the
/// edge. An optional marker stripe crosses the mat at `marker_x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat {
    pub white: u8,
    pub black: u8,
    /// Half-width of the ramp across the line edge
    pub edge_width_cm: f64,
    pub marker_x: Option<f64>,
    pub marker_width_cm: f64,
}

impl Default for Mat {
    fn default() -> Self {
        Self {
            white: WHITE_REFLECTION,
            black: BLACK_REFLECTION,
            edge_width_cm: 1.0,
            marker_x: None,
            marker_width_cm: 2.0,
        }
    }
}

impl Mat {
    pub fn with_marker(mut self, x: f64) -> Self {
        self.marker_x = Some(x);
        self
    }

    /// Reflectance at a point on the mat
    pub fn reflectance_at(&self, x: f64, y: f64) -> u8 {
        let white = self.white as f64;
        let black = self.black as f64;
        let medium = ((self.white as i32 + self.black as i32) / 2) as f64;

        let t = (y / self.edge_width_cm).clamp(-1.0, 1.0);
        let mut value = if t >= 0.0 {
            medium + t * (white - medium)
        } else {
            medium + t * (medium - black)
        };

        if let Some(marker_x) = self.marker_x {
            if (marker_x..=marker_x + self.marker_width_cm).contains(&x) {
                value = value.min(MARKER_REFLECTION);
            }
        }
        value.round().clamp(0.0, 100.0) as u8
    }
}

/// Where a light sensor sits relative to the axle centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorMount {
    pub forward_cm: f64,
    pub left_cm: f64,
}

/// Robot pose on the mat; heading in degrees, counter-clockwise positive
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimPose {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

pub struct SimHub {
    params: SimParams,
    mat: Mat,
    x: f64,
    y: f64,
    heading: f64, // radians
    pair: (Port, Port),
    wheels: WheelVelocities,
    motors: HashSet<Port>,
    motor_degrees: HashMap<Port, f64>,
    sensors: HashMap<Port, SensorMount>,
    last_update: Instant,
}

impl SimHub {
    /// Create a robot at the origin facing +x, with devices on the mapped ports
    pub fn new(params: SimParams, mat: Mat, ports: &PortMap) -> Self {
        let motors: HashSet<Port> = [ports.left_wheel, ports.right_wheel, ports.arm]
            .into_iter()
            .collect();
        let sensors = HashMap::from([
            (
                ports.line_sensor,
                SensorMount {
                    forward_cm: 6.0,
                    left_cm: 0.0,
                },
            ),
            (
                ports.marker_sensor,
                SensorMount {
                    forward_cm: 6.0,
                    left_cm: 4.0,
                },
            ),
        ]);

        Self {
            params,
            mat,
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            pair: (ports.left_wheel, ports.right_wheel),
            wheels: WheelVelocities::zero(),
            motor_degrees: motors.iter().map(|&p| (p, 0.0)).collect(),
            motors,
            sensors,
            last_update: Instant::now(),
        }
    }

    /// Put the robot down at a pose
    pub fn place(&mut self, x: f64, y: f64, heading_deg: f64) {
        self.advance();
        self.x = x;
        self.y = y;
        self.heading = heading_deg.to_radians();
    }

    pub fn pose(&mut self) -> SimPose {
        self.advance();
        SimPose {
            x: self.x,
            y: self.y,
            heading_deg: self.heading.to_degrees(),
        }
    }

    /// Unplug whatever is on `port`
    pub fn detach(&mut self, port: Port) {
        self.motors.remove(&port);
        self.sensors.remove(&port);
    }

    pub fn mount_sensor(&mut self, port: Port, mount: SensorMount) {
        self.sensors.insert(port, mount);
    }

    pub fn wheel_velocities(&self) -> WheelVelocities {
        self.wheels
    }

    // Integrate the pose and encoders up to now at the current wheel velocities
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        if dt == 0.0 {
            return;
        }

        let (left_port, right_port) = self.pair;
        *self.motor_degrees.entry(left_port).or_default() += self.wheels.left as f64 * dt;
        *self.motor_degrees.entry(right_port).or_default() += self.wheels.right as f64 * dt;

        let cm_per_degree = PI * self.params.wheel_diameter_cm / 360.0 * self.params.slip;
        let left = self.wheels.left as f64 * cm_per_degree;
        let right = self.wheels.right as f64 * cm_per_degree;
        let v = (left + right) / 2.0;
        let omega = (right - left) / self.params.track_width_cm;

        if omega.abs() < 1e-12 {
            self.x += v * self.heading.cos() * dt;
            self.y += v * self.heading.sin() * dt;
        } else {
            let radius = v / omega;
            let next = self.heading + omega * dt;
            self.x += radius * (next.sin() - self.heading.sin());
            self.y -= radius * (next.cos() - self.heading.cos());
            self.heading = next;
        }
    }

    fn set_wheels(&mut self, wheels: WheelVelocities) {
        self.advance();
        trace!("Sim wheels: left={}, right={}", wheels.left, wheels.right);
        self.wheels = wheels;
    }

    fn require_motor(&self, port: Port) -> Result<()> {
        if self.motors.contains(&port) {
            Ok(())
        } else {
            Err(Error::Hardware {
                port,
                reason: "no motor attached".to_string(),
            })
        }
    }

    fn require_drive(&self) -> Result<()> {
        self.require_motor(self.pair.0)?;
        self.require_motor(self.pair.1)
    }

    // Run both wheels until the faster one has turned `degrees`, then hold
    async fn run_wheels_for(&mut self, degrees: u32, wheels: WheelVelocities) -> Result<()> {
        self.require_drive()?;
        if degrees == 0 {
            return Ok(());
        }
        let fastest = wheels.max_abs();
        if fastest == 0 {
            return Err(Error::Hardware {
                port: self.pair.0,
                reason: format!("cannot turn {} degrees at zero velocity", degrees),
            });
        }

        self.set_wheels(wheels);
        sleep(Duration::from_secs_f64(degrees as f64 / fastest as f64)).await;
        self.set_wheels(WheelVelocities::zero());
        Ok(())
    }
}

impl DrivePair for SimHub {
    fn pair(&mut self, left: Port, right: Port) -> Result<()> {
        self.require_motor(left)?;
        self.require_motor(right)?;
        debug!("Sim drive paired: left={}, right={}", left, right);
        self.advance();
        self.pair = (left, right);
        Ok(())
    }

    async fn move_for_degrees(&mut self, degrees: u32, curvature: i32, velocity: i32) -> Result<()> {
        self.run_wheels_for(degrees, curvature_to_wheels(curvature, velocity))
            .await
    }

    async fn move_tank_for_degrees(
        &mut self,
        degrees: u32,
        left_velocity: i32,
        right_velocity: i32,
    ) -> Result<()> {
        self.run_wheels_for(degrees, WheelVelocities::new(left_velocity, right_velocity))
            .await
    }

    fn move_tank(&mut self, left_velocity: i32, right_velocity: i32) -> Result<()> {
        self.require_drive()?;
        self.set_wheels(WheelVelocities::new(left_velocity, right_velocity));
        Ok(())
    }

    fn drive(&mut self, curvature: i32, velocity: i32) -> Result<()> {
        self.require_drive()?;
        self.set_wheels(curvature_to_wheels(curvature, velocity));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.set_wheels(WheelVelocities::zero());
        Ok(())
    }
}

impl MotorBank for SimHub {
    async fn run_for_degrees(&mut self, port: Port, degrees: u32, velocity: i32) -> Result<()> {
        self.require_motor(port)?;
        if degrees == 0 {
            return Ok(());
        }
        if velocity == 0 {
            return Err(Error::Hardware {
                port,
                reason: format!("cannot turn {} degrees at zero velocity", degrees),
            });
        }

        sleep(Duration::from_secs_f64(
            degrees as f64 / velocity.unsigned_abs() as f64,
        ))
        .await;
        self.advance();
        *self.motor_degrees.entry(port).or_default() += degrees as f64 * velocity.signum() as f64;
        Ok(())
    }

    fn reset_relative_position(&mut self, port: Port, value: i32) -> Result<()> {
        self.require_motor(port)?;
        self.advance();
        self.motor_degrees.insert(port, value as f64);
        Ok(())
    }

    fn relative_position(&mut self, port: Port) -> Result<i32> {
        self.require_motor(port)?;
        self.advance();
        Ok(self.motor_degrees.get(&port).copied().unwrap_or(0.0).round() as i32)
    }
}

impl SensorBank for SimHub {
    fn reflection(&mut self, port: Port) -> Result<u8> {
        let mount = *self.sensors.get(&port).ok_or_else(|| Error::Hardware {
            port,
            reason: "no light sensor attached".to_string(),
        })?;
        self.advance();

        let (sin, cos) = self.heading.sin_cos();
        let x = self.x + mount.forward_cm * cos - mount.left_cm * sin;
        let y = self.y + mount.forward_cm * sin + mount.left_cm * cos;
        Ok(self.mat.reflectance_at(x, y))
    }

    fn tilt_angles(&mut self) -> Result<TiltAngles> {
        self.advance();
        // Yaw in whole degrees, wrapped to [-180, 180)
        let yaw = (self.heading.to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
        Ok(TiltAngles::new(yaw as i32, 0))
    }

    fn ready(&self, port: Port) -> bool {
        self.motors.contains(&port) || self.sensors.contains_key(&port)
    }
}
