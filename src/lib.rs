// Drive runtime for a two-wheeled robot with an attachment arm
//
// Turns move/turn/arm requests into motor commands, follows lines with a
// proportional controller and calibrates the turn factor from the hub's
// orientation sensor.

pub mod calibrate;
pub mod config;
pub mod error;
pub mod hub;
pub mod line_follow;
pub mod messages;
pub mod motion;
pub mod runtime;

pub use config::RobotConfig;
pub use error::{ConfigError, Error, Result};
