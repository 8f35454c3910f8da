//! # Subscriber Module
//!
//! The loop every collaborator runs: pull messages from its own queue,
//! react to states and events, report failures back as error events.

use crate::core::machine::State;
use crate::error::Result;
use crate::events::{Communicator, Event, Message, Workers};
use tracing::{debug, error};

/// A component that reacts to broadcast states
pub trait Subscriber: Send {
    /// Queue this subscriber reads from
    fn role(&self) -> Workers;

    /// Name used as the origin of error events
    fn origin(&self) -> &'static str;

    /// React to a new state
    fn handle_state(&mut self, state: &State, comm: &Communicator) -> Result<()>;

    /// React to an event sent directly to this subscriber
    fn handle_event(&mut self, event: &Event, _comm: &Communicator) -> Result<()> {
        debug!(origin = self.origin(), event = %event, "Ignoring event");
        Ok(())
    }
}

/// Run `subscriber` until the sentinel arrives.
///
/// A failing handler does not stop the loop; the failure is sent to the
/// master as an error event so the session can retry or abort.
pub fn run_subscriber<S: Subscriber + ?Sized>(
    subscriber: &mut S,
    comm: &Communicator,
) -> Result<()> {
    let role = subscriber.role();
    debug!(%role, "Subscriber loop started");

    for message in comm.iter(role)? {
        let result = match &message {
            Message::State(state) => subscriber.handle_state(state, comm),
            Message::Event(event) => subscriber.handle_event(event, comm),
        };

        if let Err(err) = result {
            report_failure(comm, subscriber.origin(), &err.to_string());
        }
    }

    debug!(%role, "Subscriber loop finished");
    Ok(())
}

/// Send an error event for `message` to the master queue
pub fn report_failure(comm: &Communicator, origin: &str, message: &str) {
    error!(origin, message, "Component failure");
    match Event::error(origin, message) {
        Ok(event) => {
            if let Err(err) = comm.send(Workers::Master, event) {
                error!(origin, error = %err, "Could not report failure");
            }
        }
        Err(err) => error!(origin, error = %err, "Could not build error event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use crate::events::Recv;
    use std::time::{Duration, Instant};

    struct Recorder {
        seen: Vec<String>,
        fail_on: &'static str,
    }

    impl Subscriber for Recorder {
        fn role(&self) -> Workers {
            Workers::Web
        }

        fn origin(&self) -> &'static str {
            "recorder"
        }

        fn handle_state(&mut self, state: &State, _comm: &Communicator) -> Result<()> {
            self.seen.push(state.name().to_string());
            if state.name() == self.fail_on {
                return Err(DeviceError::Camera("flash failed".to_string()).into());
            }
            Ok(())
        }
    }

    #[test]
    fn loop_ends_at_sentinel() {
        let comm = Communicator::new();
        comm.bcast(&State::Welcome);
        comm.bcast(&State::Startup);
        comm.bcast_sentinel();

        let mut recorder = Recorder {
            seen: Vec::new(),
            fail_on: "",
        };
        run_subscriber(&mut recorder, &comm).unwrap();

        assert_eq!(recorder.seen, vec!["Welcome", "Startup"]);
    }

    #[test]
    fn handler_failure_becomes_error_event() {
        let comm = Communicator::new();
        comm.bcast(&State::Idle);
        comm.bcast(&State::Assemble);
        comm.bcast_sentinel();

        let mut recorder = Recorder {
            seen: Vec::new(),
            fail_on: "Idle",
        };
        run_subscriber(&mut recorder, &comm).unwrap();

        // The loop keeps going after the failure
        assert_eq!(recorder.seen, vec!["Idle", "Assemble"]);

        let deadline = Instant::now() + Duration::from_millis(100);
        match comm.recv_deadline(Workers::Master, deadline).unwrap() {
            Recv::Message(Message::Event(Event::Error(error))) => {
                assert_eq!(error.origin(), "recorder");
                assert!(error.message().contains("flash failed"));
            }
            other => panic!("Expected an error event, got {:?}", other),
        }
    }
}
