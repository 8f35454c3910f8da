//! # Camera Module
//!
//! Camera subscriber: opens the device at startup, streams previews,
//! takes the shots of a session and hands them to the template.
//!
//! ## Shot loop
//! After each capture the camera decides whether the template needs
//! another shot (`Camera/countdown`) or is complete (`Camera/assemble`).
//! The state machine only follows that decision.

mod fake;
mod traits;

pub use fake::{FakeCamera, StripTemplate};
pub use traits::{CameraBackend, Template};

use crate::config::CameraConfig;
use crate::core::machine::State;
use crate::core::picture::Shot;
use crate::core::subscriber::Subscriber;
use crate::error::{DeviceError, Result};
use crate::events::{names, Communicator, Event, Workers};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const STARTUP_BACKOFF: Duration = Duration::from_millis(50);

/// Camera subscriber
pub struct Camera<B: CameraBackend, T: Template> {
    backend: B,
    template: T,
    config: CameraConfig,
    keep_pictures: bool,
    is_open: bool,
    shots: Vec<Shot>,
}

impl<B: CameraBackend, T: Template> Camera<B, T> {
    pub fn new(backend: B, template: T, config: CameraConfig, keep_pictures: bool) -> Self {
        Self {
            backend,
            template,
            config,
            keep_pictures,
            is_open: false,
            shots: Vec::new(),
        }
    }

    fn open_with_retry(&mut self) -> std::result::Result<(), DeviceError> {
        let attempts = self.config.startup_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.backend.open() {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "Camera failed to start");
                    last_error = err.to_string();
                    if attempt < attempts {
                        thread::sleep(STARTUP_BACKOFF * attempt);
                    }
                }
            }
        }

        Err(DeviceError::CameraStartup {
            attempts,
            reason: last_error,
        })
    }

    fn startup(&mut self, comm: &Communicator) -> Result<()> {
        if self.is_open {
            self.backend.cleanup();
            self.is_open = false;
        }
        self.open_with_retry()?;
        self.is_open = true;

        let test_picture = self.backend.picture()?;
        self.template.startup(&test_picture)?;

        let preview = self.config.show_preview && self.backend.has_preview();
        info!(
            preview,
            shots = self.template.total_shots(),
            "Camera ready"
        );

        self.set_idle()?;
        comm.send(
            Workers::Master,
            Event::camera_ready(self.template.total_shots())?,
        )?;
        Ok(())
    }

    fn set_idle(&mut self) -> std::result::Result<(), DeviceError> {
        if self.backend.has_idle() {
            self.backend.set_idle()?;
        }
        Ok(())
    }

    fn prepare_capture(&mut self) -> Result<()> {
        self.backend.set_active()?;
        self.shots.clear();
        Ok(())
    }

    /// Stream preview frames until the next message arrives
    fn capture_preview(&mut self, comm: &Communicator) -> Result<()> {
        if !(self.config.show_preview && self.backend.has_preview()) {
            return Ok(());
        }
        while comm.empty(Workers::Camera) {
            let frame = self.backend.preview()?;
            comm.send(Workers::Gui, Event::camera_preview(Shot::new(0, frame))?)?;
            thread::sleep(self.config.preview_interval());
        }
        Ok(())
    }

    fn capture_picture(&mut self, picture_index: u32, comm: &Communicator) -> Result<()> {
        self.set_idle()?;
        let data = self.backend.picture()?;
        self.backend.set_active()?;

        // A retried capture replaces the shot taken for this index
        let shot = Shot::new(picture_index, data);
        self.shots.truncate(picture_index.saturating_sub(1) as usize);
        self.shots.push(shot.clone());
        info!(shot = picture_index, "Captured shot");

        if self.keep_pictures {
            comm.send(Workers::Worker, Event::camera_capture(shot)?)?;
        }

        let next = if picture_index < self.template.total_shots() {
            names::COUNTDOWN
        } else {
            names::ASSEMBLE
        };
        comm.send(Workers::Master, Event::camera(next)?)?;
        Ok(())
    }

    fn assemble_picture(&mut self, comm: &Communicator) -> Result<()> {
        self.set_idle()?;
        let picture = self.template.assemble(&self.shots)?;
        info!(bytes = picture.len(), "Assembled picture");

        comm.send(Workers::Master, Event::camera_review(picture)?)?;
        Ok(())
    }

    fn teardown(&mut self) {
        if self.is_open {
            self.backend.cleanup();
            self.is_open = false;
        }
    }
}

impl<B: CameraBackend, T: Template> Subscriber for Camera<B, T> {
    fn role(&self) -> Workers {
        Workers::Camera
    }

    fn origin(&self) -> &'static str {
        "Camera"
    }

    fn handle_state(&mut self, state: &State, comm: &Communicator) -> Result<()> {
        match state {
            State::Startup => self.startup(comm),
            State::Idle => {
                self.prepare_capture()?;
                self.capture_preview(comm)
            }
            State::Countdown { .. } => self.capture_preview(comm),
            State::Capture { picture_index, .. } => self.capture_picture(*picture_index, comm),
            State::Assemble => self.assemble_picture(comm),
            State::Teardown { .. } => {
                self.teardown();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
