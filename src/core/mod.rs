//! # Core Module
//!
//! The session engine and the collaborators around it.
//!
//! ## Modules
//! - `machine` - states, transitions and the context owning the current state
//! - `subscriber` - the loop every collaborator runs on its queue
//! - `picture` - picture references, payloads and storage naming
//! - `camera` - camera subscriber with backend and template traits
//! - `lighting` - buttons and light cues
//! - `worker` - storage, counters, event log and print queue
//! - `display` - headless display driver emitting GUI input on timers
//! - `booth` - builder and runner tying everything together

pub mod booth;
pub mod camera;
pub mod display;
pub mod lighting;
pub mod machine;
pub mod picture;
pub mod subscriber;
pub mod worker;

// Re-export commonly used types
pub use booth::{Photobooth, PhotoboothBuilder};
pub use machine::{Context, Session, State, Transition};
pub use picture::{Picture, PictureList, PictureRef, Shot};
pub use subscriber::Subscriber;
