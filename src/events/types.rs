//! Event type definitions.
//!
//! Events describe something that happened: a button press, a GUI tap,
//! a camera lifecycle step, a failure, a request to tear down. Payloads
//! are checked once at construction and never change afterwards.

use crate::core::picture::{Picture, PictureRef, Shot};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Well-known event names exchanged with the collaborators
pub mod names {
    pub const START: &str = "start";
    pub const EXIT: &str = "exit";
    pub const TRIGGER: &str = "trigger";
    pub const SLIDESHOW: &str = "slideshow";
    pub const UPDATE_SLIDESHOW: &str = "updateslideshow";
    pub const GALLERY: &str = "gallery";
    pub const GALLERY_SELECT: &str = "galleryselect";
    pub const CLOSE: &str = "close";
    pub const POSTPROCESS: &str = "postprocess";
    pub const COUNTDOWN: &str = "countdown";
    pub const CAPTURE: &str = "capture";
    pub const IDLE: &str = "idle";
    pub const RETRY: &str = "retry";
    pub const ABORT: &str = "abort";
    pub const WELCOME: &str = "welcome";
    pub const READY: &str = "ready";
    pub const ASSEMBLE: &str = "assemble";
    pub const REVIEW: &str = "review";
    pub const PREVIEW: &str = "preview";
}

/// Where a teardown leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeardownTarget {
    /// Stop the process
    Exit,
    /// Stop the process and ask the supervisor to start it again
    Restart,
    /// Stop the session and return to the welcome screen
    Welcome,
}

impl TeardownTarget {
    /// Process exit code reported for this target, if it ends the process
    pub fn exit_code(self) -> Option<i32> {
        match self {
            TeardownTarget::Exit => Some(0),
            TeardownTarget::Restart => Some(123),
            TeardownTarget::Welcome => None,
        }
    }
}

impl std::fmt::Display for TeardownTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeardownTarget::Exit => write!(f, "Exit"),
            TeardownTarget::Restart => write!(f, "Restart"),
            TeardownTarget::Welcome => write!(f, "Welcome"),
        }
    }
}

/// All events that can be sent through the communicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A component caught an internal failure
    Error(ErrorEvent),
    /// Leave the session (exit, restart, back to welcome)
    Teardown(TeardownTarget),
    /// User interaction on the display
    Gui(GuiEvent),
    /// Hardware button
    Gpio(NamedEvent),
    /// Camera lifecycle
    Camera(CameraEvent),
    /// Background worker (no transitions defined yet)
    Worker(NamedEvent),
}

impl Event {
    /// Build an error event
    pub fn error(
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Event::Error(ErrorEvent::new(origin, message)?))
    }

    pub fn teardown(target: TeardownTarget) -> Self {
        Event::Teardown(target)
    }

    /// Build a GUI event that carries no payload
    pub fn gui(name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Event::Gui(GuiEvent::new(name, None, None)?))
    }

    /// Build a GUI event selecting a picture in the gallery
    pub fn gui_select(picture_ref: PictureRef) -> Result<Self, ValidationError> {
        Ok(Event::Gui(GuiEvent::new(
            names::GALLERY_SELECT,
            Some(picture_ref),
            None,
        )?))
    }

    /// Build a GUI postprocess request
    pub fn gui_postprocess(
        picture_ref: Option<PictureRef>,
        action: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Event::Gui(GuiEvent::new(
            names::POSTPROCESS,
            picture_ref,
            action,
        )?))
    }

    pub fn gpio(name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Event::Gpio(NamedEvent::new("Gpio", name)?))
    }

    pub fn worker(name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Event::Worker(NamedEvent::new("Worker", name)?))
    }

    /// Build a camera event that carries no payload
    pub fn camera(name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Event::Camera(CameraEvent::new(name, None, None, None)?))
    }

    /// Camera is up and knows how many shots make a picture
    pub fn camera_ready(num_shots: u32) -> Result<Self, ValidationError> {
        Ok(Event::Camera(CameraEvent::new(
            names::READY,
            None,
            None,
            Some(num_shots),
        )?))
    }

    /// An assembled picture is ready for review
    pub fn camera_review(picture: Picture) -> Result<Self, ValidationError> {
        Ok(Event::Camera(CameraEvent::new(
            names::REVIEW,
            Some(picture),
            None,
            None,
        )?))
    }

    /// A single shot was taken
    pub fn camera_capture(shot: Shot) -> Result<Self, ValidationError> {
        Ok(Event::Camera(CameraEvent::new(
            names::CAPTURE,
            None,
            Some(shot),
            None,
        )?))
    }

    /// A live preview frame
    pub fn camera_preview(frame: Shot) -> Result<Self, ValidationError> {
        Ok(Event::Camera(CameraEvent::new(
            names::PREVIEW,
            None,
            Some(frame),
            None,
        )?))
    }

    /// Kind discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Error(_) => "Error",
            Event::Teardown(_) => "Teardown",
            Event::Gui(_) => "Gui",
            Event::Gpio(_) => "Gpio",
            Event::Camera(_) => "Camera",
            Event::Worker(_) => "Worker",
        }
    }

    /// Name of the event, `None` for error and teardown events
    pub fn name(&self) -> Option<&str> {
        match self {
            Event::Gui(e) => Some(e.name()),
            Event::Gpio(e) | Event::Worker(e) => Some(e.name()),
            Event::Camera(e) => Some(e.name()),
            Event::Error(_) | Event::Teardown(_) => None,
        }
    }

    /// Whether this is a GUI or GPIO event named `name`
    ///
    /// Several transitions accept the same action from a screen tap or
    /// a hardware button.
    pub fn is_user_action(&self, name: &str) -> bool {
        match self {
            Event::Gui(e) => e.name() == name,
            Event::Gpio(e) => e.name() == name,
            _ => false,
        }
    }

    pub fn is_gui(&self, name: &str) -> bool {
        matches!(self, Event::Gui(e) if e.name() == name)
    }

    pub fn is_camera(&self, name: &str) -> bool {
        matches!(self, Event::Camera(e) if e.name() == name)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Error(e) => write!(f, "Error({}: {})", e.origin(), e.message()),
            Event::Teardown(target) => write!(f, "Teardown({})", target),
            other => write!(f, "{}/{}", other.kind(), other.name().unwrap_or_default()),
        }
    }
}

/// Payload of [`Event::Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawErrorEvent")]
pub struct ErrorEvent {
    origin: String,
    message: String,
}

impl ErrorEvent {
    pub fn new(
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let origin = origin.into();
        let message = message.into();
        if origin.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "origin" });
        }
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "message" });
        }
        Ok(Self { origin, message })
    }

    /// Component that reported the failure
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Payload of [`Event::Gpio`] and [`Event::Worker`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNamedEvent")]
pub struct NamedEvent {
    name: String,
}

impl NamedEvent {
    fn new(kind: &'static str, name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name(kind, &name)?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Payload of [`Event::Gui`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGuiEvent")]
pub struct GuiEvent {
    name: String,
    picture_ref: Option<PictureRef>,
    postprocess_action: Option<String>,
}

impl GuiEvent {
    pub fn new(
        name: impl Into<String>,
        picture_ref: Option<PictureRef>,
        postprocess_action: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name("Gui", &name)?;

        if name == names::GALLERY_SELECT && picture_ref.is_none() {
            return Err(ValidationError::MissingPayload {
                kind: "Gui",
                name,
                field: "picture reference",
            });
        }
        if let Some(action) = &postprocess_action {
            if action.trim().is_empty() {
                return Err(ValidationError::EmptyField {
                    field: "postprocess action",
                });
            }
        }

        Ok(Self {
            name,
            picture_ref,
            postprocess_action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn picture_ref(&self) -> Option<&PictureRef> {
        self.picture_ref.as_ref()
    }

    pub fn postprocess_action(&self) -> Option<&str> {
        self.postprocess_action.as_deref()
    }
}

/// Payload of [`Event::Camera`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCameraEvent")]
pub struct CameraEvent {
    name: String,
    picture: Option<Picture>,
    shot: Option<Shot>,
    num_shots: Option<u32>,
}

impl CameraEvent {
    pub fn new(
        name: impl Into<String>,
        picture: Option<Picture>,
        shot: Option<Shot>,
        num_shots: Option<u32>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name("Camera", &name)?;

        let missing = match name.as_str() {
            names::READY if num_shots.is_none() => Some("number of shots"),
            names::REVIEW if picture.is_none() => Some("picture"),
            names::CAPTURE | names::PREVIEW if shot.is_none() => Some("shot"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(ValidationError::MissingPayload {
                kind: "Camera",
                name,
                field,
            });
        }
        if num_shots == Some(0) {
            return Err(ValidationError::InvalidValue {
                field: "number of shots",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            name,
            picture,
            shot,
            num_shots,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    pub fn shot(&self) -> Option<&Shot> {
        self.shot.as_ref()
    }

    pub fn num_shots(&self) -> Option<u32> {
        self.num_shots
    }
}

// Deserialized payloads go through the same constructors as built ones

#[derive(Deserialize)]
struct RawErrorEvent {
    origin: String,
    message: String,
}

impl TryFrom<RawErrorEvent> for ErrorEvent {
    type Error = ValidationError;

    fn try_from(raw: RawErrorEvent) -> Result<Self, Self::Error> {
        ErrorEvent::new(raw.origin, raw.message)
    }
}

#[derive(Deserialize)]
struct RawNamedEvent {
    name: String,
}

impl TryFrom<RawNamedEvent> for NamedEvent {
    type Error = ValidationError;

    fn try_from(raw: RawNamedEvent) -> Result<Self, Self::Error> {
        NamedEvent::new("Named", raw.name)
    }
}

#[derive(Deserialize)]
struct RawGuiEvent {
    name: String,
    #[serde(default)]
    picture_ref: Option<PictureRef>,
    #[serde(default)]
    postprocess_action: Option<String>,
}

impl TryFrom<RawGuiEvent> for GuiEvent {
    type Error = ValidationError;

    fn try_from(raw: RawGuiEvent) -> Result<Self, Self::Error> {
        GuiEvent::new(raw.name, raw.picture_ref, raw.postprocess_action)
    }
}

#[derive(Deserialize)]
struct RawCameraEvent {
    name: String,
    #[serde(default)]
    picture: Option<Picture>,
    #[serde(default)]
    shot: Option<Shot>,
    #[serde(default)]
    num_shots: Option<u32>,
}

impl TryFrom<RawCameraEvent> for CameraEvent {
    type Error = ValidationError;

    fn try_from(raw: RawCameraEvent) -> Result<Self, Self::Error> {
        CameraEvent::new(raw.name, raw.picture, raw.shot, raw.num_shots)
    }
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyField { field: "name" });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: "name",
            reason: format!("{} event name '{}' contains whitespace", kind, name),
        });
    }
    Ok(())
}
