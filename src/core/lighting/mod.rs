//! # Lighting Module
//!
//! Buttons and lights of the booth.
//!
//! The trigger button only fires while the booth waits for a guest
//! (idle or slideshow). Holding the exit button returns to the welcome
//! screen. Each session phase has its own light cue; while idle the RGB
//! light cycles through the hue wheel until the next state arrives.

mod backend;

pub use backend::{LightBackend, LightCommand, LogLight, Rgb};

use crate::config::LightingConfig;
use crate::core::machine::State;
use crate::core::subscriber::Subscriber;
use crate::error::Result;
use crate::events::{names, Communicator, Event, TeardownTarget, Workers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const CAPTURE_COLOR: Rgb = Rgb::new(1.0, 1.0, 0.9);
const REVIEW_COLOR: Rgb = Rgb::new(0.0, 0.15, 0.0);

/// Hardware button handlers, cheap to clone into input callbacks
#[derive(Clone)]
pub struct ButtonPanel {
    comm: Communicator,
    trigger_armed: Arc<AtomicBool>,
}

impl ButtonPanel {
    /// Trigger button pressed; fires at most once per arming
    pub fn press_trigger(&self) -> Result<bool> {
        if !self.trigger_armed.swap(false, Ordering::SeqCst) {
            debug!("Trigger pressed while disarmed");
            return Ok(false);
        }
        self.comm.send(Workers::Master, Event::gpio(names::TRIGGER)?)?;
        Ok(true)
    }

    /// Exit button held
    pub fn hold_exit(&self) -> Result<()> {
        self.trigger_armed.store(false, Ordering::SeqCst);
        self.comm
            .send(Workers::Master, Event::teardown(TeardownTarget::Welcome))?;
        Ok(())
    }

    pub fn is_trigger_armed(&self) -> bool {
        self.trigger_armed.load(Ordering::SeqCst)
    }
}

/// Lighting subscriber
pub struct Lighting<L: LightBackend> {
    backend: L,
    config: LightingConfig,
    trigger_armed: Arc<AtomicBool>,
}

impl<L: LightBackend> Lighting<L> {
    pub fn new(backend: L, config: LightingConfig) -> Self {
        info!(
            buttons = config.enable_button,
            light = config.enable_light,
            "Lighting configured"
        );
        Self {
            backend,
            config,
            trigger_armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Button handlers bound to `comm`
    pub fn buttons(&self, comm: &Communicator) -> ButtonPanel {
        ButtonPanel {
            comm: comm.clone(),
            trigger_armed: Arc::clone(&self.trigger_armed),
        }
    }

    fn light(&mut self, command: LightCommand) -> Result<()> {
        if self.config.enable_light {
            self.backend.apply(command)?;
        }
        Ok(())
    }

    fn enable_trigger(&mut self) -> Result<()> {
        if self.config.enable_button {
            self.trigger_armed.store(true, Ordering::SeqCst);
        }
        self.light(LightCommand::Lamp(true))
    }

    fn disable_trigger(&mut self) -> Result<()> {
        self.trigger_armed.store(false, Ordering::SeqCst);
        self.light(LightCommand::Lamp(false))
    }

    /// Cycle the hue until the next message arrives
    fn animate_idle(&mut self, comm: &Communicator) -> Result<()> {
        if !self.config.enable_light {
            return Ok(());
        }
        let step = Duration::from_millis(self.config.idle_step_ms);
        let mut hue: u16 = 0;
        while comm.empty(Workers::Gpio) {
            hue = (hue + 1) % 360;
            self.light(LightCommand::Color(Rgb::from_hue(hue)))?;
            thread::sleep(step);
        }
        Ok(())
    }
}

impl<L: LightBackend> Subscriber for Lighting<L> {
    fn role(&self) -> Workers {
        Workers::Gpio
    }

    fn origin(&self) -> &'static str {
        "Gpio"
    }

    fn handle_state(&mut self, state: &State, comm: &Communicator) -> Result<()> {
        match state {
            State::Idle => {
                self.enable_trigger()?;
                self.animate_idle(comm)
            }
            State::Slideshow => self.enable_trigger(),
            State::Gallery | State::GallerySelect { .. } => self.disable_trigger(),
            State::Greeter { .. } => {
                self.disable_trigger()?;
                self.light(LightCommand::RgbOff)
            }
            State::Countdown { .. } => self.light(LightCommand::Blink),
            State::Capture { .. } => {
                self.light(LightCommand::RgbOn)?;
                self.light(LightCommand::Color(CAPTURE_COLOR))
            }
            State::Assemble => self.light(LightCommand::RgbOff),
            State::Review { .. } => self.light(LightCommand::Color(REVIEW_COLOR)),
            State::Teardown { .. } => {
                self.trigger_armed.store(false, Ordering::SeqCst);
                self.light(LightCommand::Off)
            }
            _ => Ok(()),
        }
    }
}
