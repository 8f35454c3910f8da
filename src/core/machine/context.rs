//! The single owner of the session state.

use super::state::{Session, State, Transition};
use crate::error::{PhotoboothError, ValidationError};
use crate::events::{Communicator, Event};
use tracing::debug;

/// Owns the current state and applies events to it.
///
/// Only `handle_event` mutates the state, and every change is broadcast
/// to all subscribers before it returns.
pub struct Context {
    comm: Communicator,
    state: State,
    session: Session,
}

impl Context {
    /// Create the context and broadcast the initial state.
    ///
    /// Starts at the welcome screen, or directly in startup when
    /// `omit_welcome` is set.
    pub fn new(comm: Communicator, omit_welcome: bool) -> Self {
        let state = if omit_welcome {
            State::Startup
        } else {
            State::Welcome
        };
        let mut context = Self {
            comm,
            state: State::Welcome,
            session: Session::default(),
        };
        context.set_state(state);
        context
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running
    }

    pub fn num_shots(&self) -> u32 {
        self.session.num_shots
    }

    fn set_state(&mut self, state: State) {
        debug!(state = %state, "New state");
        self.state = state;
        self.comm.bcast(&self.state);
    }

    /// Apply one event.
    ///
    /// Returns the process exit code when the event ends the process
    /// (`Teardown(Exit)` gives 0, `Teardown(Restart)` gives 123). An
    /// illegal (state, event) pair fails without touching the state.
    pub fn handle_event(&mut self, event: Event) -> Result<Option<i32>, PhotoboothError> {
        debug!(event = %event, state = %self.state, "Handling event");

        match event {
            Event::Error(error) => {
                let saved = self.state.clone();
                let state = State::error(
                    error.origin(),
                    error.message(),
                    saved,
                    self.session.is_running,
                )?;
                self.set_state(state);
                Ok(None)
            }
            Event::Teardown(target) => {
                self.session.is_running = false;
                self.set_state(State::teardown(target));
                let code = target.exit_code();
                if code.is_some() {
                    self.comm.bcast_sentinel();
                }
                Ok(code)
            }
            other => {
                match self.state.next(&other, &self.session)? {
                    Transition::Stay => {
                        debug!(state = %self.state, event = %other, "Event leaves state unchanged");
                    }
                    Transition::Enter(state) => self.set_state(state),
                    Transition::Start { num_shots } => {
                        if num_shots == 0 {
                            return Err(ValidationError::InvalidValue {
                                field: "number of shots",
                                reason: "must be at least 1".to_string(),
                            }
                            .into());
                        }
                        self.session.num_shots = num_shots;
                        self.session.is_running = true;
                        self.set_state(State::Idle);
                    }
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::picture::{Picture, PictureRef};
    use crate::events::{Message, TeardownTarget, Workers};

    fn drain(comm: &Communicator, worker: Workers) -> Vec<Option<Message>> {
        let mut messages = Vec::new();
        let deadline = std::time::Instant::now();
        while !comm.empty(worker) {
            match comm.recv_deadline(worker, deadline).unwrap() {
                crate::events::Recv::Message(message) => messages.push(Some(message)),
                crate::events::Recv::Closed => messages.push(None),
                crate::events::Recv::Timeout => break,
            }
        }
        messages
    }

    fn gui(name: &str) -> Event {
        Event::gui(name).unwrap()
    }

    fn started(num_shots: u32) -> (Communicator, Context) {
        let comm = Communicator::new();
        let mut context = Context::new(comm.clone(), true);
        context
            .handle_event(Event::camera_ready(num_shots).unwrap())
            .unwrap();
        (comm, context)
    }

    fn every_state() -> Vec<State> {
        vec![
            State::Welcome,
            State::Startup,
            State::Idle,
            State::Slideshow,
            State::Gallery,
            State::GallerySelect {
                picture_ref: PictureRef::single("0001.jpg"),
                action: None,
            },
            State::greeter(3).unwrap(),
            State::countdown(1, 3).unwrap(),
            State::capture(1, 3).unwrap(),
            State::Assemble,
            State::Review {
                picture: Picture::uniform(vec![1u8]),
            },
            State::Postprocess {
                picture_ref: None,
                action: None,
            },
            State::error("gui", "earlier", State::Idle, true).unwrap(),
            State::teardown(TeardownTarget::Welcome),
            State::teardown(TeardownTarget::Exit),
            State::teardown(TeardownTarget::Restart),
        ]
    }

    #[test]
    fn initial_state_is_broadcast() {
        let comm = Communicator::new();
        let context = Context::new(comm.clone(), false);

        assert_eq!(context.state(), &State::Welcome);
        assert!(!context.is_running());
        assert_eq!(
            drain(&comm, Workers::Gui),
            vec![Some(Message::State(State::Welcome))]
        );
    }

    #[test]
    fn camera_ready_starts_session() {
        let (_comm, context) = started(3);
        assert_eq!(context.state(), &State::Idle);
        assert!(context.is_running());
        assert_eq!(context.num_shots(), 3);
    }

    #[test]
    fn error_event_is_accepted_in_every_state() {
        for state in every_state() {
            for was_running in [false, true] {
                let comm = Communicator::new();
                let mut context = Context::new(comm.clone(), false);
                context.state = state.clone();
                context.session.is_running = was_running;

                let code = context
                    .handle_event(Event::error("camera", "lens fogged").unwrap())
                    .unwrap();

                assert_eq!(code, None);
                assert_eq!(
                    context.state(),
                    &State::Error {
                        origin: "camera".to_string(),
                        message: "lens fogged".to_string(),
                        saved: Box::new(state.clone()),
                        was_running,
                    }
                );
            }
        }
    }

    #[test]
    fn teardown_exit_reports_zero_and_one_sentinel() {
        let (comm, mut context) = started(2);
        drain(&comm, Workers::Camera);

        let code = context
            .handle_event(Event::teardown(TeardownTarget::Exit))
            .unwrap();

        assert_eq!(code, Some(0));
        assert!(!context.is_running());
        assert_eq!(
            drain(&comm, Workers::Camera),
            vec![
                Some(Message::State(State::teardown(TeardownTarget::Exit))),
                None
            ]
        );
    }

    #[test]
    fn teardown_restart_reports_123() {
        let (comm, mut context) = started(2);
        drain(&comm, Workers::Worker);

        let code = context
            .handle_event(Event::teardown(TeardownTarget::Restart))
            .unwrap();

        assert_eq!(code, Some(123));
        let sentinels = drain(&comm, Workers::Worker)
            .into_iter()
            .filter(Option::is_none)
            .count();
        assert_eq!(sentinels, 1);
    }

    #[test]
    fn teardown_welcome_keeps_subscribers_alive() {
        let (comm, mut context) = started(2);
        drain(&comm, Workers::Gui);

        let code = context
            .handle_event(Event::teardown(TeardownTarget::Welcome))
            .unwrap();

        assert_eq!(code, None);
        assert!(!context.is_running());
        assert_eq!(
            drain(&comm, Workers::Gui),
            vec![Some(Message::State(State::teardown(TeardownTarget::Welcome)))]
        );

        context.handle_event(gui("welcome")).unwrap();
        assert_eq!(context.state(), &State::Welcome);
    }

    #[test]
    fn illegal_transitions_leave_state_untouched() {
        let cases = vec![
            (State::Idle, Event::camera_ready(3).unwrap()),
            (State::Welcome, gui("trigger")),
            (State::Startup, gui("start")),
            (State::greeter(3).unwrap(), gui("capture")),
            (State::capture(1, 3).unwrap(), gui("capture")),
            (State::Assemble, gui("postprocess")),
            (State::Slideshow, gui("gallery")),
            (State::teardown(TeardownTarget::Exit), gui("welcome")),
        ];

        for (state, event) in cases {
            let (comm, mut context) = started(3);
            context.state = state.clone();
            drain(&comm, Workers::Gui);

            let result = context.handle_event(event);

            assert!(
                matches!(result, Err(PhotoboothError::UnhandledEvent(_))),
                "expected unhandled event in {}",
                state
            );
            assert_eq!(context.state(), &state);
            assert!(comm.empty(Workers::Gui));
        }
    }

    #[test]
    fn no_op_events_do_not_broadcast() {
        let (comm, mut context) = started(3);
        context.handle_event(gui("slideshow")).unwrap();
        drain(&comm, Workers::Gui);

        context.handle_event(gui("updateslideshow")).unwrap();

        assert_eq!(context.state(), &State::Slideshow);
        assert!(comm.empty(Workers::Gui));
    }

    #[test]
    fn retry_restores_and_rebroadcasts_saved_state() {
        let (comm, mut context) = started(3);
        context.handle_event(gui("trigger")).unwrap();
        context.handle_event(gui("countdown")).unwrap();
        context.handle_event(gui("capture")).unwrap();
        context.handle_event(Event::camera("countdown").unwrap()).unwrap();
        assert_eq!(context.state(), &State::countdown(2, 3).unwrap());

        context
            .handle_event(Event::error("camera", "flash not charged").unwrap())
            .unwrap();
        drain(&comm, Workers::Camera);

        context.handle_event(gui("retry")).unwrap();

        assert_eq!(context.state(), &State::countdown(2, 3).unwrap());
        assert_eq!(
            drain(&comm, Workers::Camera),
            vec![Some(Message::State(State::countdown(2, 3).unwrap()))]
        );
    }

    #[test]
    fn abort_returns_to_idle_while_running() {
        let (_comm, mut context) = started(3);
        context.handle_event(gui("trigger")).unwrap();
        context
            .handle_event(Event::error("camera", "jammed").unwrap())
            .unwrap();

        context.handle_event(gui("abort")).unwrap();
        assert_eq!(context.state(), &State::Idle);
    }

    #[test]
    fn abort_before_startup_tears_down_to_welcome() {
        let comm = Communicator::new();
        let mut context = Context::new(comm, true);
        context
            .handle_event(Event::error("camera", "not found").unwrap())
            .unwrap();

        context.handle_event(gui("abort")).unwrap();
        assert_eq!(context.state(), &State::teardown(TeardownTarget::Welcome));
    }

    #[test]
    fn capture_loop_scenario() {
        let (_comm, mut context) = started(3);
        assert_eq!(context.state(), &State::Idle);

        context.handle_event(gui("trigger")).unwrap();
        assert_eq!(context.state(), &State::Greeter { num_shots: 3 });

        context.handle_event(gui("countdown")).unwrap();
        assert_eq!(context.state(), &State::countdown(1, 3).unwrap());

        for shot in 1..=3 {
            context.handle_event(gui("capture")).unwrap();
            assert_eq!(context.state(), &State::capture(shot, 3).unwrap());
            if shot < 3 {
                context.handle_event(Event::camera("countdown").unwrap()).unwrap();
                assert_eq!(context.state(), &State::countdown(shot + 1, 3).unwrap());
            }
        }

        context.handle_event(Event::camera("assemble").unwrap()).unwrap();
        assert_eq!(context.state(), &State::Assemble);

        let picture = Picture::uniform(b"0001.jpg".to_vec());
        context
            .handle_event(Event::camera_review(picture.clone()).unwrap())
            .unwrap();
        assert_eq!(context.state(), &State::Review { picture });

        context.handle_event(gui("postprocess")).unwrap();
        context.handle_event(Event::gpio("idle").unwrap()).unwrap();
        assert_eq!(context.state(), &State::Idle);
    }
}
