//! # Display Module
//!
//! Headless stand-in for the touch screen.
//!
//! Where a guest would tap a button or watch a countdown, the driver
//! waits the configured delay and sends the GUI event itself. Each new
//! state replaces the pending timer, so an event is never sent for a
//! state that is already gone.

use crate::config::TimingConfig;
use crate::core::machine::State;
use crate::core::subscriber::{report_failure, Subscriber};
use crate::error::{DeviceError, Result, ValidationError};
use crate::events::{names, Communicator, Event, Message, Recv, TeardownTarget, Workers};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// What the driver does when a timer expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Gui(&'static str),
    Teardown(TeardownTarget),
}

impl Action {
    fn event(self) -> std::result::Result<Event, ValidationError> {
        match self {
            Action::Gui(name) => Event::gui(name),
            Action::Teardown(target) => Ok(Event::teardown(target)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: Instant,
    action: Action,
}

/// Display driver subscriber
pub struct DisplayDriver {
    timing: TimingConfig,
    sessions: Option<u32>,
    retry_limit: u32,
    finish_with: TeardownTarget,
    sessions_done: u32,
    retries: u32,
    previews: u64,
    pending: Option<Pending>,
}

impl DisplayDriver {
    /// Driver running an unlimited number of sessions
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            sessions: None,
            retry_limit: 1,
            finish_with: TeardownTarget::Exit,
            sessions_done: 0,
            retries: 0,
            previews: 0,
            pending: None,
        }
    }

    /// Stop after `count` pictures
    pub fn sessions(mut self, count: u32) -> Self {
        self.sessions = Some(count);
        self
    }

    /// Retry a failure this many times before aborting
    pub fn retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Teardown requested once all sessions are done
    pub fn finish_with(mut self, target: TeardownTarget) -> Self {
        self.finish_with = target;
        self
    }

    pub fn sessions_done(&self) -> u32 {
        self.sessions_done
    }

    pub fn previews_shown(&self) -> u64 {
        self.previews
    }

    /// The timer currently armed, if any
    pub fn pending_action(&self) -> Option<Action> {
        self.pending.map(|pending| pending.action)
    }

    fn sessions_left(&self) -> bool {
        !matches!(self.sessions, Some(limit) if self.sessions_done >= limit)
    }

    fn schedule(&mut self, delay_ms: u64, action: Action) {
        debug!(?action, delay_ms, "Timer armed");
        self.pending = Some(Pending {
            due: Instant::now() + Duration::from_millis(delay_ms),
            action,
        });
    }

    fn on_error(&mut self, origin: &str, message: &str) {
        warn!(origin, message, "Showing error prompt");
        if self.retries < self.retry_limit {
            self.retries += 1;
            self.schedule(self.timing.idle_ms, Action::Gui(names::RETRY));
        } else {
            self.retries = 0;
            self.schedule(self.timing.idle_ms, Action::Gui(names::ABORT));
        }
    }

    fn fire(&mut self, comm: &Communicator) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let event = pending.action.event()?;
        info!(event = %event, "Display input");
        comm.send(Workers::Master, event)?;
        Ok(())
    }

    /// Serve the GUI queue until the sentinel arrives, firing timers
    /// as they expire. Failures are reported to the master.
    pub fn run(&mut self, comm: &Communicator) -> Result<()> {
        debug!("Display driver started");
        loop {
            let received = match self.pending {
                Some(pending) => comm.recv_deadline(Workers::Gui, pending.due)?,
                None => comm.recv(Workers::Gui)?,
            };
            let result = match received {
                Recv::Message(Message::State(state)) => self.handle_state(&state, comm),
                Recv::Message(Message::Event(event)) => self.handle_event(&event, comm),
                Recv::Timeout => self.fire(comm),
                Recv::Closed => break,
            };
            if let Err(err) = result {
                report_failure(comm, self.origin(), &err.to_string());
            }
        }
        info!(sessions = self.sessions_done, "Display driver finished");
        Ok(())
    }
}

impl Subscriber for DisplayDriver {
    fn role(&self) -> Workers {
        Workers::Gui
    }

    fn origin(&self) -> &'static str {
        "Gui"
    }

    fn handle_state(&mut self, state: &State, _comm: &Communicator) -> Result<()> {
        self.pending = None;
        let timing = self.timing.clone();

        match state {
            State::Welcome if self.sessions_left() => {
                self.schedule(timing.idle_ms, Action::Gui(names::START))
            }
            State::Welcome => {
                let action = match self.finish_with {
                    TeardownTarget::Exit => Action::Gui(names::EXIT),
                    target => Action::Teardown(target),
                };
                self.schedule(timing.idle_ms, action)
            }
            State::Idle if self.sessions_left() => {
                self.schedule(timing.idle_ms, Action::Gui(names::TRIGGER))
            }
            State::Idle => self.schedule(timing.idle_ms, Action::Teardown(self.finish_with)),
            State::Greeter { .. } => {
                self.schedule(timing.greeter_ms, Action::Gui(names::COUNTDOWN))
            }
            State::Countdown { .. } => {
                self.schedule(timing.countdown_ms, Action::Gui(names::CAPTURE))
            }
            State::Review { .. } => {
                self.sessions_done += 1;
                self.retries = 0;
                self.schedule(timing.review_ms, Action::Gui(names::POSTPROCESS))
            }
            State::Postprocess { .. } => {
                self.schedule(timing.postprocess_ms, Action::Gui(names::IDLE))
            }
            State::Error {
                origin, message, ..
            } => self.on_error(origin, message),
            State::Teardown {
                target: TeardownTarget::Welcome,
            } => self.schedule(timing.idle_ms, Action::Gui(names::WELCOME)),
            other => trace!(state = %other, "Nothing to show"),
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &Event, _comm: &Communicator) -> Result<()> {
        match event {
            Event::Camera(camera) if camera.name() == names::PREVIEW => {
                self.previews += 1;
                trace!(frames = self.previews, "Preview frame");
                Ok(())
            }
            other => Err(DeviceError::Task {
                task: "display".to_string(),
                reason: format!("unexpected event {}", other),
            }
            .into()),
        }
    }
}
