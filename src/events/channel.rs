//! Message fabric between the state machine and its subscribers.
//!
//! Every worker role owns one unbounded crossbeam queue. States are
//! broadcast to all subscriber queues; events are sent to one queue.
//! `None` on a queue is the sentinel that ends the subscriber's loop.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::Event;
use crate::core::machine::State;
use crate::error::CommunicatorError;

/// Roles that own a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Workers {
    /// Owner of the state machine, receives events
    Master,
    /// Display
    Gui,
    Camera,
    /// Buttons and lights
    Gpio,
    /// Background tasks (storage, printing)
    Worker,
    Web,
}

impl Workers {
    /// All roles in a fixed order
    pub const ALL: [Workers; 6] = [
        Workers::Master,
        Workers::Gui,
        Workers::Camera,
        Workers::Gpio,
        Workers::Worker,
        Workers::Web,
    ];

    /// Roles that receive broadcast states
    pub fn subscribers() -> impl Iterator<Item = Workers> {
        Self::ALL.into_iter().filter(|w| *w != Workers::Master)
    }
}

impl std::fmt::Display for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Workers::Master => write!(f, "Master"),
            Workers::Gui => write!(f, "Gui"),
            Workers::Camera => write!(f, "Camera"),
            Workers::Gpio => write!(f, "Gpio"),
            Workers::Worker => write!(f, "Worker"),
            Workers::Web => write!(f, "Web"),
        }
    }
}

/// Item delivered on a queue
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A new state broadcast by the context
    State(State),
    /// An event sent to this queue
    Event(Event),
}

/// Outcome of a receive with a deadline
#[derive(Debug, Clone, PartialEq)]
pub enum Recv {
    Message(Message),
    /// Nothing arrived before the deadline
    Timeout,
    /// The sentinel was received or the queue is gone
    Closed,
}

struct Queue {
    sender: Sender<Option<Message>>,
    receiver: Receiver<Option<Message>>,
}

/// Per-worker queues with broadcast.
///
/// Cheap to clone; all clones share the same queues, so a handle can be
/// moved into each subscriber thread.
#[derive(Clone)]
pub struct Communicator {
    queues: Arc<HashMap<Workers, Queue>>,
}

impl Communicator {
    /// Create queues for every role
    pub fn new() -> Self {
        Self::with_workers(Workers::ALL)
    }

    /// Create queues for the given roles only
    pub fn with_workers(workers: impl IntoIterator<Item = Workers>) -> Self {
        let queues = workers
            .into_iter()
            .map(|worker| {
                let (sender, receiver) = unbounded();
                (worker, Queue { sender, receiver })
            })
            .collect();
        Self {
            queues: Arc::new(queues),
        }
    }

    fn queue(&self, worker: Workers) -> Result<&Queue, CommunicatorError> {
        self.queues
            .get(&worker)
            .ok_or(CommunicatorError::UnknownWorker(worker))
    }

    fn subscriber_queues(&self) -> impl Iterator<Item = (&Workers, &Queue)> {
        let mut queues: Vec<_> = self
            .queues
            .iter()
            .filter(|(worker, _)| **worker != Workers::Master)
            .collect();
        queues.sort_by_key(|(worker, _)| **worker);
        queues.into_iter()
    }

    /// Enqueue `state` on every subscriber queue.
    ///
    /// Queues are unbounded, so a slow subscriber never delays delivery
    /// to the others.
    pub fn bcast(&self, state: &State) {
        for (worker, queue) in self.subscriber_queues() {
            if queue.sender.send(Some(Message::State(state.clone()))).is_err() {
                tracing::warn!(%worker, "Dropping state for disconnected queue");
            }
        }
    }

    /// Enqueue the end-of-stream sentinel on every subscriber queue
    pub fn bcast_sentinel(&self) {
        for (worker, queue) in self.subscriber_queues() {
            if queue.sender.send(None).is_err() {
                tracing::warn!(%worker, "Dropping sentinel for disconnected queue");
            }
        }
    }

    /// Deliver `event` to the queue of `worker`
    pub fn send(&self, worker: Workers, event: Event) -> Result<(), CommunicatorError> {
        self.queue(worker)?
            .sender
            .send(Some(Message::Event(event)))
            .map_err(|_| CommunicatorError::Disconnected(worker))
    }

    /// Messages for `worker` until the sentinel arrives
    pub fn iter(&self, worker: Workers) -> Result<MessageIter, CommunicatorError> {
        Ok(MessageIter {
            receiver: self.queue(worker)?.receiver.clone(),
            done: false,
        })
    }

    /// Whether the queue of `worker` has nothing pending
    pub fn empty(&self, worker: Workers) -> bool {
        self.queue(worker)
            .map(|queue| queue.receiver.is_empty())
            .unwrap_or(true)
    }

    /// Block until a message arrives or `deadline` passes
    pub fn recv_deadline(
        &self,
        worker: Workers,
        deadline: Instant,
    ) -> Result<Recv, CommunicatorError> {
        let queue = self.queue(worker)?;
        let timeout = deadline.saturating_duration_since(Instant::now());
        Ok(match queue.receiver.recv_timeout(timeout) {
            Ok(Some(message)) => Recv::Message(message),
            Ok(None) | Err(RecvTimeoutError::Disconnected) => Recv::Closed,
            Err(RecvTimeoutError::Timeout) => Recv::Timeout,
        })
    }

    /// Block until a message arrives
    pub fn recv(&self, worker: Workers) -> Result<Recv, CommunicatorError> {
        let queue = self.queue(worker)?;
        Ok(match queue.receiver.recv() {
            Ok(Some(message)) => Recv::Message(message),
            Ok(None) | Err(_) => Recv::Closed,
        })
    }
}

impl Default for Communicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over one worker's queue, ending at the sentinel
pub struct MessageIter {
    receiver: Receiver<Option<Message>>,
    done: bool,
}

impl Iterator for MessageIter {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        if self.done {
            return None;
        }
        match self.receiver.recv() {
            Ok(Some(message)) => Some(message),
            Ok(None) | Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn states(comm: &Communicator, worker: Workers) -> Vec<State> {
        comm.iter(worker)
            .unwrap()
            .filter_map(|message| match message {
                Message::State(state) => Some(state),
                Message::Event(_) => None,
            })
            .collect()
    }

    #[test]
    fn broadcast_reaches_every_subscriber_but_not_master() {
        let comm = Communicator::new();
        comm.bcast(&State::Idle);

        for worker in Workers::subscribers() {
            assert!(!comm.empty(worker), "{} got nothing", worker);
        }
        assert!(comm.empty(Workers::Master));
    }

    #[test]
    fn sentinel_ends_iteration() {
        let comm = Communicator::new();
        comm.bcast(&State::Welcome);
        comm.bcast(&State::Startup);
        comm.bcast_sentinel();
        comm.bcast(&State::Idle);

        assert_eq!(states(&comm, Workers::Camera), vec![State::Welcome, State::Startup]);
    }

    #[test]
    fn subscribers_observe_identical_order() {
        let comm = Communicator::new();
        let sequence = vec![
            State::Welcome,
            State::Startup,
            State::Idle,
            State::Slideshow,
            State::Idle,
        ];

        let producer = {
            let comm = comm.clone();
            let sequence = sequence.clone();
            thread::spawn(move || {
                for state in &sequence {
                    comm.bcast(state);
                }
                comm.bcast_sentinel();
            })
        };

        let gui = {
            let comm = comm.clone();
            thread::spawn(move || states(&comm, Workers::Gui))
        };
        let camera = states(&comm, Workers::Camera);

        producer.join().unwrap();
        let gui = gui.join().unwrap();

        assert_eq!(camera, sequence);
        assert_eq!(gui, camera);
    }

    #[test]
    fn send_targets_one_queue_in_fifo_order() {
        let comm = Communicator::new();
        comm.send(Workers::Master, Event::gui("start").unwrap()).unwrap();
        comm.send(Workers::Master, Event::gui("exit").unwrap()).unwrap();

        assert!(comm.empty(Workers::Gui));

        let deadline = Instant::now() + Duration::from_millis(100);
        let first = comm.recv_deadline(Workers::Master, deadline).unwrap();
        let second = comm.recv_deadline(Workers::Master, deadline).unwrap();
        assert_eq!(first, Recv::Message(Message::Event(Event::gui("start").unwrap())));
        assert_eq!(second, Recv::Message(Message::Event(Event::gui("exit").unwrap())));
    }

    #[test]
    fn unknown_worker_is_reported() {
        let comm = Communicator::with_workers([Workers::Master, Workers::Gui]);
        let error = comm
            .send(Workers::Camera, Event::gui("start").unwrap())
            .unwrap_err();
        assert_eq!(error, CommunicatorError::UnknownWorker(Workers::Camera));
        assert!(comm.iter(Workers::Web).is_err());
    }

    #[test]
    fn recv_deadline_times_out_on_empty_queue() {
        let comm = Communicator::new();
        let deadline = Instant::now() + Duration::from_millis(10);
        assert_eq!(comm.recv_deadline(Workers::Gui, deadline).unwrap(), Recv::Timeout);

        comm.bcast_sentinel();
        assert_eq!(comm.recv_deadline(Workers::Gui, deadline).unwrap(), Recv::Closed);
    }
}
