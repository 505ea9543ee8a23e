// Message types passed between the runtime, controllers and mission files

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::opt_millis;
use crate::error::{ConfigError, Result, ensure_non_negative, ensure_positive};
use crate::hub::Port;

// Closed direction enums. Parsing from text is the only way an unknown
// direction can appear, and it is rejected there with a typed error.
macro_rules! direction_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(try_from = "String", rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConfigError::InvalidDirection {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ConfigError;

            fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

direction_enum!(
    /// Direction of a straight move
    StraightDirection, "straight", { Forward => "forward", Backward => "backward" }
);
direction_enum!(
    /// Direction of a tank turn, seen from above
    TurnDirection, "turn", { Left => "left", Right => "right" }
);
direction_enum!(
    /// Direction of the attachment arm
    ArmDirection, "arm", { Up => "up", Down => "down" }
);

/// One motion primitive. Speeds left out fall back to the config defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionRequest {
    Straight {
        direction: StraightDirection,
        /// cm
        distance: f64,
        /// cm/s
        #[serde(default)]
        speed: Option<f64>,
    },
    Turn {
        direction: TurnDirection,
        degrees: f64,
        /// deg/s of heading
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        turn_factor: Option<f64>,
    },
    ArmMove {
        direction: ArmDirection,
        degrees: f64,
        /// deg/s at the arm motor
        #[serde(default)]
        speed: Option<f64>,
    },
}

impl MotionRequest {
    /// Reject values that would issue a nonsensical or never-ending motion
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match *self {
            MotionRequest::Straight {
                distance, speed, ..
            } => {
                ensure_non_negative("distance", distance)?;
                if let Some(speed) = speed {
                    ensure_positive("speed", speed)?;
                }
            }
            MotionRequest::Turn {
                degrees,
                speed,
                turn_factor,
                ..
            } => {
                ensure_non_negative("degrees", degrees)?;
                if let Some(speed) = speed {
                    ensure_positive("speed", speed)?;
                }
                if let Some(turn_factor) = turn_factor {
                    ensure_positive("turn_factor", turn_factor)?;
                }
            }
            MotionRequest::ArmMove { degrees, speed, .. } => {
                ensure_non_negative("degrees", degrees)?;
                if let Some(speed) = speed {
                    ensure_positive("speed", speed)?;
                }
            }
        }
        Ok(())
    }
}

/// Secondary reflectance sensor that ends a line follow when it sees dark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryStop {
    pub port: Port,
    /// Readings at or below this stop the loop; medium reflection when unset
    #[serde(default)]
    pub threshold: Option<i32>,
}

/// Independent stop predicates for a line follow; any one ends the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConditionSet {
    #[serde(rename = "time_limit_ms", with = "opt_millis")]
    pub time_limit: Option<Duration>,
    pub distance_limit_degrees: Option<u32>,
    pub secondary: Option<SecondaryStop>,
}

impl StopConditionSet {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_distance_limit(mut self, degrees: u32) -> Self {
        self.distance_limit_degrees = Some(degrees);
        self
    }

    pub fn with_secondary(mut self, port: Port) -> Self {
        self.secondary = Some(SecondaryStop {
            port,
            threshold: None,
        });
        self
    }
}

/// Per-tick snapshot of the line follow loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub elapsed: Duration,
    /// Absolute left-wheel rotation since the loop started
    pub odometry_degrees: u32,
    pub reflectance: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TimeLimit,
    DistanceLimit,
    SecondarySensor,
    HardCeiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineFollowOutcome {
    pub reason: StopReason,
    #[serde(serialize_with = "crate::config::millis::serialize")]
    pub elapsed: Duration,
    pub odometry_degrees: u32,
    pub ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub turn_factor: f64,
}

/// One step of a mission file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStep {
    Motion(MotionRequest),
    Wait { ms: u64 },
    Calibrate,
    FollowLine(StopConditionSet),
}

/// A named, strictly ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub name: String,
    pub steps: Vec<MissionStep>,
}

impl Mission {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
