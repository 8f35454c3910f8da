//! # Error Module
//!
//! Error types for the photobooth session controller.
//!
//! ## Design Principles
//! - **Validate at construction** - malformed events and states never reach the machine
//! - **Surface protocol defects** - an unmapped (state, event) pair is an error, not a no-op
//! - **Include context** - which state, which event, which device failed

use crate::events::Workers;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoboothError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    UnhandledEvent(#[from] UnhandledEventError),

    #[error("Communication error: {0}")]
    Communicator(#[from] CommunicatorError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Malformed event or state construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{kind} event '{name}' requires {field}")]
    MissingPayload {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// A (state, event) pair without a defined transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unhandled event '{event}' in state '{state}'")]
pub struct UnhandledEventError {
    pub state: String,
    pub event: String,
}

/// Errors from the state broadcast and event channels
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommunicatorError {
    #[error("No queue registered for worker {0}")]
    UnknownWorker(Workers),

    #[error("Queue for worker {0} is disconnected")]
    Disconnected(Workers),
}

/// Failures reported by the collaborators behind the state machine
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Camera failure: {0}")]
    Camera(String),

    #[error("Camera did not start after {attempts} attempts: {reason}")]
    CameraStartup { attempts: u32, reason: String },

    #[error("Template failure: {0}")]
    Template(String),

    #[error("Light failure: {0}")]
    Light(String),

    #[error("Worker task '{task}' failed: {reason}")]
    Task { task: String, reason: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while loading or checking the booth configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoboothError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unhandled_event_names_state_and_event() {
        let error = UnhandledEventError {
            state: "Idle".to_string(),
            event: "Camera/ready".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("Idle"));
        assert!(message.contains("Camera/ready"));
    }

    #[test]
    fn missing_payload_includes_event_name() {
        let error = ValidationError::MissingPayload {
            kind: "Camera",
            name: "review".to_string(),
            field: "picture",
        };
        assert_eq!(error.to_string(), "Camera event 'review' requires picture");
    }

    #[test]
    fn validation_error_converts_to_top_level() {
        let error: PhotoboothError = ValidationError::EmptyField { field: "origin" }.into();
        assert!(matches!(error, PhotoboothError::Validation(_)));
        assert!(error.to_string().contains("origin must not be empty"));
    }

    #[test]
    fn config_error_includes_path() {
        let error = ConfigError::Parse {
            path: PathBuf::from("/etc/photobooth.json"),
            reason: "expected value".to_string(),
        };
        assert!(error.to_string().contains("/etc/photobooth.json"));
    }
}
