//! # Events Module
//!
//! Typed events and the channels that carry them.
//!
//! ## Design
//! Subscriber loops (camera, display, lights, worker) send events to the
//! master queue. The master hands each event to the state machine, which
//! broadcasts the resulting state back to every subscriber queue.
//!
//! ## Example
//! ```rust,ignore
//! let comm = Communicator::new();
//!
//! // A subscriber thread reacts to states until the sentinel arrives
//! let camera = comm.clone();
//! std::thread::spawn(move || {
//!     for message in camera.iter(Workers::Camera)? {
//!         if let Message::State(State::Startup) = message {
//!             camera.send(Workers::Master, Event::camera_ready(4)?)?;
//!         }
//!     }
//! });
//! ```

mod channel;
mod types;

pub use channel::{Communicator, Message, MessageIter, Recv, Workers};
pub use types::*;
