//! # Machine Module
//!
//! The session state machine.
//!
//! ## Flow
//! `Welcome → Startup → Idle → Greeter → Countdown ⇄ Capture → Assemble →
//! Review → Postprocess → Idle`, with side trips to the slideshow and the
//! gallery. Any error event leads to `Error`, which resumes the saved
//! state on retry. Teardown leaves the session.
//!
//! [`State::next`] is a pure function of (state, event, session).
//! [`Context`] owns the current state, applies cross-cutting events
//! (error, teardown) itself, and broadcasts every new state.

mod context;
mod state;

pub use context::Context;
pub use state::{Session, State, Transition};
