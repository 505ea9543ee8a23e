// Motion primitives for the differential drive and the attachment arm
//
// Provides:
// - Unit conversion (cm, heading degrees -> wheel degrees, deg/s)
// - Straight moves and tank turns on the paired wheels
// - Geared arm moves on a single motor

pub mod arm;
pub mod drive;
pub mod units;

pub use arm::ArmController;
pub use drive::DriveController;
pub use units::{UnitConverter, WheelVelocities, curvature_to_wheels};
