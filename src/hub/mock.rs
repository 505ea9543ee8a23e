// Scripted hub for unit tests
//
// Records every command it receives and plays back queued sensor readings.
// The last queued reading of each sensor repeats once the queue drains.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{DrivePair, MotorBank, Port, SensorBank, TiltAngles};
use crate::error::{Error, Result};

/// A command as issued to the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pair {
        left: Port,
        right: Port,
    },
    MoveForDegrees {
        degrees: u32,
        curvature: i32,
        velocity: i32,
    },
    MoveTankForDegrees {
        degrees: u32,
        left_velocity: i32,
        right_velocity: i32,
    },
    MoveTank {
        left_velocity: i32,
        right_velocity: i32,
    },
    Drive {
        curvature: i32,
        velocity: i32,
    },
    Stop,
    RunForDegrees {
        port: Port,
        degrees: u32,
        velocity: i32,
    },
    ResetRelativePosition {
        port: Port,
        value: i32,
    },
}

pub struct MockHub {
    pub commands: Vec<Command>,
    not_ready: HashSet<Port>,
    reflections: HashMap<Port, VecDeque<u8>>,
    tilts: VecDeque<TiltAngles>,
    positions: HashMap<Port, VecDeque<i32>>,
    reset_values: HashMap<Port, i32>,
}

impl MockHub {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            not_ready: HashSet::new(),
            reflections: HashMap::new(),
            tilts: VecDeque::new(),
            positions: HashMap::new(),
            reset_values: HashMap::new(),
        }
    }

    /// Mark a port as having nothing attached
    pub fn detach(&mut self, port: Port) {
        self.not_ready.insert(port);
    }

    pub fn script_reflections(&mut self, port: Port, values: &[u8]) {
        self.reflections
            .entry(port)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Queue primary-axis tilt readings
    pub fn script_tilts(&mut self, primary: &[i32]) {
        self.tilts
            .extend(primary.iter().map(|&p| TiltAngles::new(p, 0)));
    }

    pub fn script_positions(&mut self, port: Port, values: &[i32]) {
        self.positions
            .entry(port)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Commands that set drive wheel velocities without a degree target
    pub fn streaming_commands(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Drive { .. } | Command::MoveTank { .. }))
    }

    fn check(&self, port: Port) -> Result<()> {
        if self.not_ready.contains(&port) {
            Err(Error::Hardware {
                port,
                reason: "nothing attached".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}

// Pop the next scripted value, repeating the last one forever
fn next_or_last<T: Copy>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().copied()
    }
}

impl DrivePair for MockHub {
    fn pair(&mut self, left: Port, right: Port) -> Result<()> {
        self.commands.push(Command::Pair { left, right });
        Ok(())
    }

    async fn move_for_degrees(&mut self, degrees: u32, curvature: i32, velocity: i32) -> Result<()> {
        self.commands.push(Command::MoveForDegrees {
            degrees,
            curvature,
            velocity,
        });
        Ok(())
    }

    async fn move_tank_for_degrees(
        &mut self,
        degrees: u32,
        left_velocity: i32,
        right_velocity: i32,
    ) -> Result<()> {
        self.commands.push(Command::MoveTankForDegrees {
            degrees,
            left_velocity,
            right_velocity,
        });
        Ok(())
    }

    fn move_tank(&mut self, left_velocity: i32, right_velocity: i32) -> Result<()> {
        self.commands.push(Command::MoveTank {
            left_velocity,
            right_velocity,
        });
        Ok(())
    }

    fn drive(&mut self, curvature: i32, velocity: i32) -> Result<()> {
        self.commands.push(Command::Drive {
            curvature,
            velocity,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.commands.push(Command::Stop);
        Ok(())
    }
}

impl MotorBank for MockHub {
    async fn run_for_degrees(&mut self, port: Port, degrees: u32, velocity: i32) -> Result<()> {
        self.check(port)?;
        self.commands.push(Command::RunForDegrees {
            port,
            degrees,
            velocity,
        });
        Ok(())
    }

    fn reset_relative_position(&mut self, port: Port, value: i32) -> Result<()> {
        self.check(port)?;
        self.commands
            .push(Command::ResetRelativePosition { port, value });
        self.reset_values.insert(port, value);
        Ok(())
    }

    fn relative_position(&mut self, port: Port) -> Result<i32> {
        self.check(port)?;
        let scripted = self.positions.get_mut(&port).and_then(next_or_last);
        Ok(scripted.unwrap_or_else(|| self.reset_values.get(&port).copied().unwrap_or(0)))
    }
}

impl SensorBank for MockHub {
    fn reflection(&mut self, port: Port) -> Result<u8> {
        self.check(port)?;
        self.reflections
            .get_mut(&port)
            .and_then(next_or_last)
            .ok_or_else(|| Error::Hardware {
                port,
                reason: "no reflection scripted".to_string(),
            })
    }

    fn tilt_angles(&mut self) -> Result<TiltAngles> {
        Ok(next_or_last(&mut self.tilts).unwrap_or_default())
    }

    fn ready(&self, port: Port) -> bool {
        !self.not_ready.contains(&port)
    }
}
