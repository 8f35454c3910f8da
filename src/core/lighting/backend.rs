//! Light backend trait and a backend that only records and logs.

use crate::error::DeviceError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// RGB color with channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Fully saturated, full brightness color for a hue in degrees
    pub fn from_hue(hue: u16) -> Self {
        let h = f32::from(hue % 360) / 60.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        Self { r, g, b }
    }
}

/// One instruction for the lights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightCommand {
    /// Lamp next to the trigger button
    Lamp(bool),
    /// Set the RGB light color
    Color(Rgb),
    RgbOn,
    RgbOff,
    /// Red blinking during the countdown
    Blink,
    /// Everything off
    Off,
}

/// Trait for light drivers
pub trait LightBackend: Send {
    fn apply(&mut self, command: LightCommand) -> Result<(), DeviceError>;
}

impl<L: LightBackend + ?Sized> LightBackend for Box<L> {
    fn apply(&mut self, command: LightCommand) -> Result<(), DeviceError> {
        (**self).apply(command)
    }
}

/// Backend that logs every command and keeps a shared record of the
/// most recent ones
#[derive(Clone)]
pub struct LogLight {
    capacity: usize,
    commands: Arc<Mutex<VecDeque<LightCommand>>>,
}

impl LogLight {
    /// Commands kept by [`LogLight::new`]
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Keep at most `capacity` commands, dropping the oldest
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            commands: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
        }
    }

    /// Most recent commands, oldest first
    pub fn commands(&self) -> Vec<LightCommand> {
        self.commands
            .lock()
            .map(|commands| commands.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for LogLight {
    fn default() -> Self {
        Self::new()
    }
}

impl LightBackend for LogLight {
    fn apply(&mut self, command: LightCommand) -> Result<(), DeviceError> {
        tracing::trace!(?command, "Light");
        let mut commands = self
            .commands
            .lock()
            .map_err(|_| DeviceError::Light("command log poisoned".to_string()))?;
        if self.capacity == 0 {
            return Ok(());
        }
        if commands.len() == self.capacity {
            commands.pop_front();
        }
        commands.push_back(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_wheel_primaries() {
        assert_eq!(Rgb::from_hue(0), Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(Rgb::from_hue(120), Rgb::new(0.0, 1.0, 0.0));
        assert_eq!(Rgb::from_hue(240), Rgb::new(0.0, 0.0, 1.0));
        assert_eq!(Rgb::from_hue(360), Rgb::from_hue(0));
    }

    #[test]
    fn hue_wheel_secondaries() {
        assert_eq!(Rgb::from_hue(60), Rgb::new(1.0, 1.0, 0.0));
        assert_eq!(Rgb::from_hue(180), Rgb::new(0.0, 1.0, 1.0));
        assert_eq!(Rgb::from_hue(300), Rgb::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn log_light_records_commands() {
        let light = LogLight::new();
        let mut backend = light.clone();
        backend.apply(LightCommand::RgbOn).unwrap();
        backend.apply(LightCommand::Lamp(true)).unwrap();

        assert_eq!(
            light.commands(),
            vec![LightCommand::RgbOn, LightCommand::Lamp(true)]
        );
    }

    #[test]
    fn log_light_keeps_only_recent_commands() {
        let light = LogLight::with_capacity(3);
        let mut backend = light.clone();
        for hue in (0..3600).step_by(10) {
            backend.apply(LightCommand::Color(Rgb::from_hue(hue))).unwrap();
        }
        backend.apply(LightCommand::Off).unwrap();

        let commands = light.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], LightCommand::Color(Rgb::from_hue(3580)));
        assert_eq!(commands.last(), Some(&LightCommand::Off));
    }
}
