// Robot constants, loop timing and port assignments
//
// Every tunable has a named default below. RobotConfig gathers them into one
// value that is handed to each controller; JSON files may override any field.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, Result, ensure_positive};
use crate::hub::Port;
use crate::messages::CalibrationResult;

// Physical constants
pub const WHEEL_DIAMETER_CM: f64 = 8.79; // edge to edge
pub const TURN_FACTOR: f64 = 1.638; // wheel degrees per degree of heading
pub const ARM_GEAR_FACTOR: f64 = 5.0;

// Default speeds
pub const DEFAULT_SPEED: f64 = 20.0; // cm/s
pub const DEFAULT_TURN_SPEED: f64 = 10.0; // deg/s of heading
pub const DEFAULT_ARM_SPEED: f64 = 360.0; // deg/s at the arm motor

// Empirical scale from turn speed to tank wheel velocity
pub const TURN_SPEED_SCALE: f64 = 10.0;

// Reflectance thresholds (0-100)
pub const WHITE_REFLECTION: u8 = 99;
pub const BLACK_REFLECTION: u8 = 35;

// Line following
pub const LINE_BASE_VELOCITY: i32 = 250; // deg/s
pub const LINE_MAX_DURATION: Duration = Duration::from_millis(30_000);

// Calibration
pub const CALIBRATION_SETTLE: Duration = Duration::from_millis(1000);
pub const CALIBRATION_SPIN_VELOCITY: i32 = 80;
pub const CALIBRATION_TIMEOUT: Duration = Duration::from_millis(30_000);

// Control loop tick (yield between polls)
pub const LOOP_TICK: Duration = Duration::from_millis(10);

/// Which hub port each device is plugged into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortMap {
    pub left_wheel: Port,
    pub right_wheel: Port,
    pub arm: Port,
    pub line_sensor: Port,
    pub marker_sensor: Port,
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            left_wheel: Port::A,
            right_wheel: Port::E,
            arm: Port::D,
            line_sensor: Port::C,
            marker_sensor: Port::F,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFollowConfig {
    pub white_reflection: u8,
    pub black_reflection: u8,
    /// Forward wheel velocity (deg/s) with zero steering
    pub base_velocity: i32,
    /// Hard ceiling on a single follow, whatever stop conditions are set
    #[serde(with = "millis")]
    pub max_duration: Duration,
    #[serde(with = "millis")]
    pub tick: Duration,
}

impl LineFollowConfig {
    /// Reflectance at the line edge: midway between white and black
    pub fn medium_reflection(&self) -> i32 {
        (self.white_reflection as i32 + self.black_reflection as i32) / 2
    }
}

impl Default for LineFollowConfig {
    fn default() -> Self {
        Self {
            white_reflection: WHITE_REFLECTION,
            black_reflection: BLACK_REFLECTION,
            base_velocity: LINE_BASE_VELOCITY,
            max_duration: LINE_MAX_DURATION,
            tick: LOOP_TICK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Pause before sampling so the hub settles after being placed; 0 samples at once
    #[serde(with = "millis")]
    pub settle: Duration,
    /// Wheel velocity of the calibration spin
    pub spin_velocity: i32,
    /// Give up after this long; `None` spins until a crossing is seen
    #[serde(with = "opt_millis")]
    pub timeout: Option<Duration>,
    #[serde(with = "millis")]
    pub tick: Duration,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            settle: CALIBRATION_SETTLE,
            spin_velocity: CALIBRATION_SPIN_VELOCITY,
            timeout: Some(CALIBRATION_TIMEOUT),
            tick: LOOP_TICK,
        }
    }
}

/// Robot configuration, passed explicitly to each controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub wheel_diameter_cm: f64,
    pub turn_factor: f64,
    pub arm_gear_factor: f64,
    pub default_speed: f64,
    pub default_turn_speed: f64,
    pub default_arm_speed: f64,
    pub turn_speed_scale: f64,
    pub ports: PortMap,
    pub line_follow: LineFollowConfig,
    pub calibration: CalibrationConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_diameter_cm: WHEEL_DIAMETER_CM,
            turn_factor: TURN_FACTOR,
            arm_gear_factor: ARM_GEAR_FACTOR,
            default_speed: DEFAULT_SPEED,
            default_turn_speed: DEFAULT_TURN_SPEED,
            default_arm_speed: DEFAULT_ARM_SPEED,
            turn_speed_scale: TURN_SPEED_SCALE,
            ports: PortMap::default(),
            line_follow: LineFollowConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl RobotConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded robot config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Enforce the physical invariants: all constants strictly positive
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        ensure_positive("wheel_diameter_cm", self.wheel_diameter_cm)?;
        ensure_positive("turn_factor", self.turn_factor)?;
        ensure_positive("arm_gear_factor", self.arm_gear_factor)?;
        ensure_positive("default_speed", self.default_speed)?;
        ensure_positive("default_turn_speed", self.default_turn_speed)?;
        ensure_positive("default_arm_speed", self.default_arm_speed)?;
        ensure_positive("turn_speed_scale", self.turn_speed_scale)?;

        let lf = &self.line_follow;
        if lf.white_reflection <= lf.black_reflection || lf.white_reflection > 100 {
            return Err(ConfigError::InvalidReflection {
                white: lf.white_reflection,
                black: lf.black_reflection,
            });
        }
        ensure_positive("line_follow.base_velocity", lf.base_velocity as f64)?;
        ensure_positive("line_follow.max_duration", lf.max_duration.as_secs_f64())?;
        ensure_positive("line_follow.tick", lf.tick.as_secs_f64())?;

        let cal = &self.calibration;
        ensure_positive("calibration.spin_velocity", cal.spin_velocity as f64)?;
        ensure_positive("calibration.tick", cal.tick.as_secs_f64())?;
        if let Some(timeout) = cal.timeout {
            ensure_positive("calibration.timeout", timeout.as_secs_f64())?;
        }
        Ok(())
    }

    /// Overwrite the turn factor with a calibrated one
    pub fn apply_calibration(
        &mut self,
        result: CalibrationResult,
    ) -> std::result::Result<(), ConfigError> {
        ensure_positive("turn_factor", result.turn_factor)?;
        info!(
            "Turn factor updated: {:.4} -> {:.4}",
            self.turn_factor, result.turn_factor
        );
        self.turn_factor = result.turn_factor;
        Ok(())
    }
}

// Durations are written as integer milliseconds in config files
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

pub(crate) mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
