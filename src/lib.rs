//! # Photobooth
//!
//! Session controller for a photo booth kiosk.
//!
//! ## Core Philosophy
//! - **One writer** - a single context owns the session state; everyone else reacts
//! - **Closed state set** - every (state, event) pair is either mapped or an error
//! - **Collaborators are opaque** - camera, lights, display and storage sit behind traits
//!
//! ## Architecture
//! - `core` - state machine, subscriber loop, collaborators and the booth runner
//! - `events` - event types and the queues connecting the threads
//! - `config` - booth settings loaded from JSON
//! - `error` - error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::core::booth::{Photobooth, PhotoboothBuilder};
pub use crate::core::machine::{Context, State};
pub use error::{PhotoboothError, Result};
pub use events::{Communicator, Event, TeardownTarget, Workers};

/// Initialize tracing for the application
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this twice
/// keeps the first subscriber.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
