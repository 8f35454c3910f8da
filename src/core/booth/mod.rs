//! # Booth Module
//!
//! Wires the collaborators to the state machine and runs a booth until
//! it is torn down.
//!
//! ## Threads
//! - **Master** - the calling thread; owns the [`Context`] and applies events
//! - **Camera**, **Gpio**, **Worker** - one generic subscriber loop each
//! - **Gui** - the display driver with its timers
//!
//! All threads stop on the sentinel broadcast at exit or restart.

use crate::config::BoothConfig;
use crate::core::camera::{Camera, CameraBackend, FakeCamera, StripTemplate, Template};
use crate::core::display::DisplayDriver;
use crate::core::lighting::{ButtonPanel, LightBackend, Lighting, LogLight};
use crate::core::machine::Context;
use crate::core::subscriber::{run_subscriber, Subscriber};
use crate::core::worker::{Counter, EventLog, PrintQueue, Worker};
use crate::error::{CommunicatorError, DeviceError, PhotoboothError, Result};
use crate::events::{Communicator, Event, Message, Workers};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Origin of error events raised by the master loop itself
const CONTEXT_ORIGIN: &str = "Context";

/// Builder for a booth
pub struct PhotoboothBuilder {
    config: BoothConfig,
    camera: Option<Box<dyn CameraBackend>>,
    template: Option<Box<dyn Template>>,
    light: Option<Box<dyn LightBackend>>,
    display: Option<DisplayDriver>,
}

impl PhotoboothBuilder {
    /// Create a new builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: BoothConfig::default(),
            camera: None,
            template: None,
            light: None,
            display: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: BoothConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the camera driver
    pub fn camera(mut self, camera: impl CameraBackend + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    /// Set the picture layout
    pub fn template(mut self, template: impl Template + 'static) -> Self {
        self.template = Some(Box::new(template));
        self
    }

    /// Set the light driver
    pub fn light(mut self, light: impl LightBackend + 'static) -> Self {
        self.light = Some(Box::new(light));
        self
    }

    /// Set the display driver
    pub fn display(mut self, display: DisplayDriver) -> Self {
        self.display = Some(display);
        self
    }

    /// Check the configuration and set up the collaborators
    pub fn build(self) -> Result<Photobooth> {
        self.config.validate()?;
        let config = self.config;

        // Nothing serves the web queue in this build
        let comm = Communicator::with_workers(
            Workers::ALL
                .into_iter()
                .filter(|worker| *worker != Workers::Web),
        );

        let template = self
            .template
            .unwrap_or_else(|| Box::new(StripTemplate::new(config.camera.num_shots)));
        let camera = Camera::new(
            self.camera.unwrap_or_else(|| Box::new(FakeCamera::default())),
            template,
            config.camera.clone(),
            config.storage.keep_pictures,
        );
        let lighting = Lighting::new(
            self.light.unwrap_or_else(|| Box::new(LogLight::new())),
            config.lighting.clone(),
        );
        let worker = Worker::new(&config.storage, &config.worker)?;
        let display = self
            .display
            .unwrap_or_else(|| DisplayDriver::new(config.timing.clone()));

        Ok(Photobooth {
            config,
            comm,
            camera,
            lighting,
            worker,
            display,
        })
    }
}

impl Default for PhotoboothBuilder {
    fn default() -> Self {
        Self::new()
    }
}

type BoxedCamera = Camera<Box<dyn CameraBackend>, Box<dyn Template>>;

/// A booth ready to run
pub struct Photobooth {
    config: BoothConfig,
    comm: Communicator,
    camera: BoxedCamera,
    lighting: Lighting<Box<dyn LightBackend>>,
    worker: Worker,
    display: DisplayDriver,
}

impl Photobooth {
    /// Create a new booth builder
    pub fn builder() -> PhotoboothBuilder {
        PhotoboothBuilder::new()
    }

    /// Handle for feeding events from outside, e.g. an input device
    pub fn communicator(&self) -> Communicator {
        self.comm.clone()
    }

    /// Hardware button handlers
    pub fn buttons(&self) -> ButtonPanel {
        self.lighting.buttons(&self.comm)
    }

    pub fn picture_counter(&self) -> Counter {
        self.worker.picture_counter()
    }

    pub fn print_queue(&self) -> PrintQueue {
        self.worker.print_queue()
    }

    pub fn event_log(&self) -> EventLog {
        self.worker.event_log()
    }

    /// Run until the booth is torn down and return the process exit code
    pub fn run(self) -> Result<i32> {
        let Photobooth {
            config,
            comm,
            camera,
            lighting,
            worker,
            mut display,
        } = self;

        info!(
            omit_welcome = config.omit_welcome,
            shots = config.camera.num_shots,
            "Starting photobooth"
        );

        let mut handles = Vec::new();
        let subscribers: Vec<Box<dyn Subscriber>> =
            vec![Box::new(camera), Box::new(lighting), Box::new(worker)];
        for subscriber in subscribers {
            handles.push(spawn_subscriber(subscriber, &comm)?);
        }
        {
            let comm = comm.clone();
            handles.push(spawn_named(Workers::Gui, move || display.run(&comm))?);
        }

        let outcome = master_loop(&comm, config.omit_welcome);
        if let Err(err) = &outcome {
            error!(error = %err, "Master loop failed, stopping subscribers");
            comm.bcast_sentinel();
        }

        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "Subscriber ended with an error"),
                Err(_) => error!("Subscriber thread panicked"),
            }
        }

        if let Ok(code) = outcome {
            info!(code, "Photobooth stopped");
        }
        outcome
    }
}

fn spawn_named<F>(role: Workers, body: F) -> Result<JoinHandle<Result<()>>>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    thread::Builder::new()
        .name(role.to_string())
        .spawn(body)
        .map_err(|err| {
            DeviceError::Task {
                task: format!("{} thread", role),
                reason: err.to_string(),
            }
            .into()
        })
}

fn spawn_subscriber(
    mut subscriber: Box<dyn Subscriber>,
    comm: &Communicator,
) -> Result<JoinHandle<Result<()>>> {
    let comm = comm.clone();
    let role = subscriber.role();
    spawn_named(role, move || run_subscriber(subscriber.as_mut(), &comm))
}

/// Apply events from the master queue until an exit code is produced.
///
/// Events the current state cannot take are turned into an error
/// event, so the retry/abort prompt is always reachable.
fn master_loop(comm: &Communicator, omit_welcome: bool) -> Result<i32> {
    let mut context = Context::new(comm.clone(), omit_welcome);

    for message in comm.iter(Workers::Master)? {
        let Message::Event(event) = message else {
            warn!("Ignoring state message on master queue");
            continue;
        };

        match context.handle_event(event) {
            Ok(Some(code)) => return Ok(code),
            Ok(None) => {}
            Err(err @ (PhotoboothError::UnhandledEvent(_) | PhotoboothError::Validation(_))) => {
                error!(error = %err, state = %context.state(), "Rejected event");
                let event = Event::error(CONTEXT_ORIGIN, err.to_string())?;
                if let Some(code) = context.handle_event(event)? {
                    return Ok(code);
                }
            }
            Err(err) => return Err(err),
        }
        debug!(state = %context.state(), "Master loop idle");
    }

    Err(CommunicatorError::Disconnected(Workers::Master).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::machine::State;
    use crate::events::{Recv, TeardownTarget};
    use std::time::{Duration, Instant};

    #[test]
    fn master_loop_returns_exit_code() {
        let comm = Communicator::with_workers([Workers::Master, Workers::Gui]);
        comm.send(Workers::Master, Event::gui("start").unwrap()).unwrap();
        comm.send(Workers::Master, Event::teardown(TeardownTarget::Restart))
            .unwrap();

        assert_eq!(master_loop(&comm, false).unwrap(), 123);
    }

    #[test]
    fn unhandled_event_becomes_error_state() {
        let comm = Communicator::with_workers([Workers::Master, Workers::Gui]);
        comm.send(Workers::Master, Event::gui("trigger").unwrap()).unwrap();
        comm.send(Workers::Master, Event::teardown(TeardownTarget::Exit))
            .unwrap();

        assert_eq!(master_loop(&comm, false).unwrap(), 0);

        let mut states = Vec::new();
        let deadline = Instant::now() + Duration::from_millis(100);
        while let Recv::Message(Message::State(state)) =
            comm.recv_deadline(Workers::Gui, deadline).unwrap()
        {
            states.push(state);
        }

        assert_eq!(states[0], State::Welcome);
        match &states[1] {
            State::Error {
                origin, message, ..
            } => {
                assert_eq!(origin, "Context");
                assert!(message.contains("Gui/trigger"));
            }
            other => panic!("Expected error state, got {}", other),
        }
        assert_eq!(states[2], State::teardown(TeardownTarget::Exit));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = BoothConfig::default();
        config.camera.num_shots = 0;

        assert!(matches!(
            Photobooth::builder().config(config).build(),
            Err(PhotoboothError::Config(_))
        ));
    }
}
