use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fll_drive_runtime::error::ensure_non_negative;
use fll_drive_runtime::hub::{Mat, SimHub, SimParams};
use fll_drive_runtime::messages::{
    ArmDirection, Mission, MissionStep, MotionRequest, StopConditionSet, StraightDirection,
    TurnDirection,
};
use fll_drive_runtime::runtime::Runtime;
use fll_drive_runtime::{ConfigError, Result, RobotConfig};

/// Drive the robot on the simulated hub
#[derive(Debug, Parser)]
#[command(name = "fll-drive", version)]
struct Cli {
    /// Robot config file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset, e.g. "debug" or "fll_drive_runtime=trace"
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Fraction of wheel rotation that reaches the ground in the simulator
    #[arg(long, global = true, default_value_t = 1.0)]
    slip: f64,

    /// Put a marker stripe across the simulated mat at this x (cm)
    #[arg(long, global = true)]
    marker_at: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Move straight: forward|backward <cm>
    Straight {
        direction: StraightDirection,
        distance: f64,
        /// cm/s
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Tank turn: left|right <degrees>
    Turn {
        direction: TurnDirection,
        degrees: f64,
        /// Heading deg/s
        #[arg(long)]
        speed: Option<f64>,
        #[arg(long)]
        turn_factor: Option<f64>,
    },
    /// Move the arm: up|down <degrees>
    Arm {
        direction: ArmDirection,
        degrees: f64,
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Spin once and measure the turn factor
    Calibrate,
    /// Follow the line edge until a stop condition fires
    FollowLine {
        /// Stop after this many seconds
        #[arg(long)]
        time_stop: Option<f64>,
        /// Stop after this many left-wheel degrees
        #[arg(long)]
        distance_stop: Option<u32>,
        /// Stop when the marker sensor sees a dark stripe
        #[arg(long)]
        stop_on_marker: bool,
    },
    /// Run a mission file (JSON)
    Mission { file: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    let mission = to_mission(cli.command, &config)?;

    let params = SimParams {
        wheel_diameter_cm: config.wheel_diameter_cm,
        slip: cli.slip,
        ..SimParams::default()
    };
    let mat = Mat {
        white: config.line_follow.white_reflection,
        black: config.line_follow.black_reflection,
        marker_x: cli.marker_at,
        ..Mat::default()
    };
    let hub = SimHub::new(params, mat, &config.ports);

    let mut runtime = Runtime::new(hub, config)?;
    let outcomes = runtime.run_mission(&mission).await?;

    let pose = runtime.hub_mut().pose();
    info!(
        "Final pose: x={:.1} cm, y={:.1} cm, heading={:.1} deg",
        pose.x, pose.y, pose.heading_deg
    );
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

// Single CLI commands run as a one-step mission
fn to_mission(command: Command, config: &RobotConfig) -> Result<Mission> {
    let step = match command {
        Command::Straight {
            direction,
            distance,
            speed,
        } => MissionStep::Motion(MotionRequest::Straight {
            direction,
            distance,
            speed,
        }),
        Command::Turn {
            direction,
            degrees,
            speed,
            turn_factor,
        } => MissionStep::Motion(MotionRequest::Turn {
            direction,
            degrees,
            speed,
            turn_factor,
        }),
        Command::Arm {
            direction,
            degrees,
            speed,
        } => MissionStep::Motion(MotionRequest::ArmMove {
            direction,
            degrees,
            speed,
        }),
        Command::Calibrate => MissionStep::Calibrate,
        Command::FollowLine {
            time_stop,
            distance_stop,
            stop_on_marker,
        } => {
            let mut stops = StopConditionSet::default();
            if let Some(seconds) = time_stop {
                ensure_non_negative("time_stop", seconds)?;
                let limit = Duration::try_from_secs_f64(seconds).map_err(|_| {
                    ConfigError::OutOfRange {
                        name: "time_stop",
                        value: seconds,
                    }
                })?;
                stops = stops.with_time_limit(limit);
            }
            if let Some(degrees) = distance_stop {
                stops = stops.with_distance_limit(degrees);
            }
            if stop_on_marker {
                stops = stops.with_secondary(config.ports.marker_sensor);
            }
            MissionStep::FollowLine(stops)
        }
        Command::Mission { file } => return Mission::load(file),
    };
    Ok(Mission {
        name: "cli".to_string(),
        steps: vec![step],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fll_drive_runtime::Error;

    fn follow_line(time_stop: f64) -> Command {
        Command::FollowLine {
            time_stop: Some(time_stop),
            distance_stop: None,
            stop_on_marker: false,
        }
    }

    #[test]
    fn test_follow_line_time_stop() {
        let mission = to_mission(follow_line(2.5), &RobotConfig::default()).unwrap();
        assert_eq!(
            mission.steps,
            vec![MissionStep::FollowLine(
                StopConditionSet::default().with_time_limit(Duration::from_millis(2500))
            )]
        );
    }

    #[test]
    fn test_follow_line_time_stop_out_of_range() {
        let err = to_mission(follow_line(1e20), &RobotConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::OutOfRange {
                name: "time_stop",
                ..
            })
        ));

        let err = to_mission(follow_line(-1.0), &RobotConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Negative { .. })));
    }

    #[test]
    fn test_cli_rejects_unknown_direction() {
        assert!(Cli::try_parse_from(["fll-drive", "straight", "sideways", "10"]).is_err());
        let cli = Cli::try_parse_from(["fll-drive", "turn", "left", "90"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Turn {
                direction: TurnDirection::Left,
                ..
            }
        ));
    }
}
