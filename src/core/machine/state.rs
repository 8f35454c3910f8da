//! Session states and the pure transition function.

use crate::core::picture::{Picture, PictureRef};
use crate::error::{UnhandledEventError, ValidationError};
use crate::events::{names, Event, TeardownTarget};
use serde::{Deserialize, Serialize};

/// Session parameters read by transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    /// False until the camera reports it is ready
    pub is_running: bool,
    /// Shots per picture, set once at startup
    pub num_shots: u32,
}

/// One node of the session state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum State {
    Welcome,
    Startup,
    Idle,
    Slideshow,
    Gallery,
    GallerySelect {
        picture_ref: PictureRef,
        action: Option<String>,
    },
    Greeter {
        num_shots: u32,
    },
    Countdown {
        picture_index: u32,
        num_shots: u32,
    },
    Capture {
        picture_index: u32,
        num_shots: u32,
    },
    Assemble,
    Review {
        picture: Picture,
    },
    Postprocess {
        picture_ref: Option<PictureRef>,
        action: Option<String>,
    },
    Error {
        origin: String,
        message: String,
        /// State to resume on retry
        saved: Box<State>,
        was_running: bool,
    },
    Teardown {
        target: TeardownTarget,
    },
}

/// What handling an event does to the current state
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Keep the current state, nothing is broadcast
    Stay,
    /// Replace the current state
    Enter(State),
    /// Camera is ready: start the session and enter Idle
    Start { num_shots: u32 },
}

impl State {
    pub fn greeter(num_shots: u32) -> Result<Self, ValidationError> {
        check_count("number of shots", num_shots)?;
        Ok(State::Greeter { num_shots })
    }

    pub fn countdown(picture_index: u32, num_shots: u32) -> Result<Self, ValidationError> {
        check_count("picture index", picture_index)?;
        check_count("number of shots", num_shots)?;
        Ok(State::Countdown {
            picture_index,
            num_shots,
        })
    }

    pub fn capture(picture_index: u32, num_shots: u32) -> Result<Self, ValidationError> {
        check_count("picture index", picture_index)?;
        check_count("number of shots", num_shots)?;
        Ok(State::Capture {
            picture_index,
            num_shots,
        })
    }

    pub fn error(
        origin: impl Into<String>,
        message: impl Into<String>,
        saved: State,
        was_running: bool,
    ) -> Result<Self, ValidationError> {
        let origin = origin.into();
        let message = message.into();
        if origin.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "origin" });
        }
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "message" });
        }
        Ok(State::Error {
            origin,
            message,
            saved: Box::new(saved),
            was_running,
        })
    }

    pub fn teardown(target: TeardownTarget) -> Self {
        State::Teardown { target }
    }

    /// Variant name for display and logging
    pub fn name(&self) -> &'static str {
        match self {
            State::Welcome => "Welcome",
            State::Startup => "Startup",
            State::Idle => "Idle",
            State::Slideshow => "Slideshow",
            State::Gallery => "Gallery",
            State::GallerySelect { .. } => "GallerySelect",
            State::Greeter { .. } => "Greeter",
            State::Countdown { .. } => "Countdown",
            State::Capture { .. } => "Capture",
            State::Assemble => "Assemble",
            State::Review { .. } => "Review",
            State::Postprocess { .. } => "Postprocess",
            State::Error { .. } => "Error",
            State::Teardown { .. } => "Teardown",
        }
    }

    /// Whether the process ends in this state
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            State::Teardown {
                target: TeardownTarget::Exit | TeardownTarget::Restart
            }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, State::Error { .. })
    }

    /// Compute the successor for a non-error, non-teardown event.
    ///
    /// Pure: neither `self` nor `session` is modified. Every pair missing
    /// from the table is an [`UnhandledEventError`].
    pub fn next(
        &self,
        event: &Event,
        session: &Session,
    ) -> Result<Transition, UnhandledEventError> {
        let unhandled = || UnhandledEventError {
            state: self.to_string(),
            event: event.to_string(),
        };
        let invalid = |_: ValidationError| unhandled();

        let transition = match self {
            State::Welcome if event.is_gui(names::START) => Transition::Enter(State::Startup),
            State::Welcome if event.is_gui(names::EXIT) => {
                Transition::Enter(State::teardown(TeardownTarget::Exit))
            }

            State::Startup => match event {
                Event::Camera(camera) if camera.name() == names::READY => {
                    let num_shots = camera.num_shots().ok_or_else(unhandled)?;
                    Transition::Start { num_shots }
                }
                _ => return Err(unhandled()),
            },

            State::Idle if event.is_user_action(names::TRIGGER) => {
                Transition::Enter(State::greeter(session.num_shots).map_err(invalid)?)
            }
            State::Idle if event.is_gui(names::SLIDESHOW) => Transition::Enter(State::Slideshow),
            State::Idle if event.is_gui(names::GALLERY) => Transition::Enter(State::Gallery),

            State::Slideshow if event.is_user_action(names::TRIGGER) => {
                Transition::Enter(State::Idle)
            }
            State::Slideshow
                if event.is_gui(names::SLIDESHOW) || event.is_gui(names::UPDATE_SLIDESHOW) =>
            {
                Transition::Stay
            }

            State::Gallery if event.is_user_action(names::TRIGGER) => {
                Transition::Enter(State::Idle)
            }
            State::Gallery if event.is_gui(names::SLIDESHOW) => Transition::Enter(State::Slideshow),
            State::Gallery => match event {
                Event::Gui(gui) if gui.name() == names::GALLERY_SELECT => {
                    let picture_ref = gui.picture_ref().ok_or_else(unhandled)?.clone();
                    Transition::Enter(State::GallerySelect {
                        picture_ref,
                        action: None,
                    })
                }
                _ => return Err(unhandled()),
            },

            State::GallerySelect { picture_ref, .. } => match event {
                Event::Gui(gui) => match gui.name() {
                    names::CLOSE => Transition::Enter(State::Gallery),
                    names::SLIDESHOW => Transition::Enter(State::Slideshow),
                    names::POSTPROCESS => Transition::Enter(State::GallerySelect {
                        picture_ref: gui.picture_ref().unwrap_or(picture_ref).clone(),
                        action: gui.postprocess_action().map(str::to_string),
                    }),
                    // A second tap behind the popup
                    names::GALLERY_SELECT => Transition::Stay,
                    _ => return Err(unhandled()),
                },
                _ => return Err(unhandled()),
            },

            State::Greeter { .. } if event.is_user_action(names::COUNTDOWN) => {
                Transition::Enter(State::countdown(1, session.num_shots).map_err(invalid)?)
            }

            State::Countdown { .. } if event.is_gui(names::COUNTDOWN) => Transition::Stay,
            State::Countdown {
                picture_index,
                num_shots,
            } if event.is_gui(names::CAPTURE) => {
                Transition::Enter(State::capture(*picture_index, *num_shots).map_err(invalid)?)
            }

            State::Capture {
                picture_index,
                num_shots,
            } if event.is_camera(names::COUNTDOWN) => Transition::Enter(
                State::countdown(picture_index + 1, *num_shots).map_err(invalid)?,
            ),
            State::Capture { .. } if event.is_camera(names::ASSEMBLE) => {
                Transition::Enter(State::Assemble)
            }

            State::Assemble => match event {
                Event::Camera(camera) if camera.name() == names::REVIEW => {
                    let picture = camera.picture().ok_or_else(unhandled)?.clone();
                    Transition::Enter(State::Review { picture })
                }
                _ => return Err(unhandled()),
            },

            State::Review { .. } if event.is_gui(names::POSTPROCESS) => {
                Transition::Enter(State::Postprocess {
                    picture_ref: None,
                    action: None,
                })
            }

            State::Postprocess { .. } if event.is_user_action(names::IDLE) => {
                Transition::Enter(State::Idle)
            }
            State::Postprocess { .. } => match event {
                Event::Gui(gui) if gui.name() == names::POSTPROCESS => {
                    Transition::Enter(State::Postprocess {
                        picture_ref: gui.picture_ref().cloned(),
                        action: gui.postprocess_action().map(str::to_string),
                    })
                }
                _ => return Err(unhandled()),
            },

            State::Error {
                saved, was_running, ..
            } => {
                if event.is_gui(names::RETRY) {
                    Transition::Enter(saved.as_ref().clone())
                } else if event.is_gui(names::ABORT) {
                    if *was_running {
                        Transition::Enter(State::Idle)
                    } else {
                        Transition::Enter(State::teardown(TeardownTarget::Welcome))
                    }
                } else {
                    return Err(unhandled());
                }
            }

            State::Teardown {
                target: TeardownTarget::Welcome,
            } if event.is_gui(names::WELCOME) => Transition::Enter(State::Welcome),

            _ => return Err(unhandled()),
        };

        Ok(transition)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Greeter { num_shots } => write!(f, "Greeter({})", num_shots),
            State::Countdown {
                picture_index,
                num_shots,
            } => write!(f, "Countdown({}/{})", picture_index, num_shots),
            State::Capture {
                picture_index,
                num_shots,
            } => write!(f, "Capture({}/{})", picture_index, num_shots),
            State::GallerySelect {
                picture_ref,
                action: Some(action),
            } => write!(f, "GallerySelect({}, {})", picture_ref, action),
            State::GallerySelect { picture_ref, .. } => write!(f, "GallerySelect({})", picture_ref),
            State::Postprocess {
                action: Some(action),
                ..
            } => write!(f, "Postprocess({})", action),
            State::Error {
                origin, message, ..
            } => write!(f, "Error({}: {})", origin, message),
            State::Teardown { target } => write!(f, "Teardown({})", target),
            other => write!(f, "{}", other.name()),
        }
    }
}

fn check_count(field: &'static str, value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidValue {
            field,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(num_shots: u32) -> Session {
        Session {
            is_running: true,
            num_shots,
        }
    }

    fn gui(name: &str) -> Event {
        Event::gui(name).unwrap()
    }

    #[test]
    fn validated_constructors_reject_zero_counts() {
        assert!(State::countdown(0, 3).is_err());
        assert!(State::capture(1, 0).is_err());
        assert!(State::greeter(0).is_err());
        assert!(State::countdown(2, 3).is_ok());
    }

    #[test]
    fn error_state_requires_origin_and_message() {
        assert!(State::error("", "boom", State::Idle, true).is_err());
        assert!(State::error("camera", "", State::Idle, true).is_err());

        let state = State::error("camera", "boom", State::Idle, true).unwrap();
        assert!(state.is_error());
    }

    #[test]
    fn welcome_starts_or_exits() {
        let session = Session::default();
        assert_eq!(
            State::Welcome.next(&gui("start"), &session).unwrap(),
            Transition::Enter(State::Startup)
        );
        assert_eq!(
            State::Welcome.next(&gui("exit"), &session).unwrap(),
            Transition::Enter(State::teardown(TeardownTarget::Exit))
        );
        assert!(State::Welcome.next(&gui("trigger"), &session).is_err());
    }

    #[test]
    fn startup_waits_for_camera_ready() {
        let session = Session::default();
        let ready = Event::camera_ready(3).unwrap();
        assert_eq!(
            State::Startup.next(&ready, &session).unwrap(),
            Transition::Start { num_shots: 3 }
        );
        assert!(State::Startup.next(&gui("start"), &session).is_err());
    }

    #[test]
    fn trigger_accepts_gui_and_gpio() {
        let session = running(4);
        let expected = Transition::Enter(State::Greeter { num_shots: 4 });
        assert_eq!(State::Idle.next(&gui("trigger"), &session).unwrap(), expected);
        assert_eq!(
            State::Idle.next(&Event::gpio("trigger").unwrap(), &session).unwrap(),
            expected
        );
    }

    #[test]
    fn slideshow_updates_are_no_ops() {
        let session = running(2);
        assert_eq!(
            State::Slideshow.next(&gui("slideshow"), &session).unwrap(),
            Transition::Stay
        );
        assert_eq!(
            State::Slideshow.next(&gui("updateslideshow"), &session).unwrap(),
            Transition::Stay
        );
    }

    #[test]
    fn gallery_select_and_postprocess() {
        let session = running(2);
        let reference = PictureRef::single("0001.jpg");
        let select = Event::gui_select(reference.clone()).unwrap();

        let selected = match State::Gallery.next(&select, &session).unwrap() {
            Transition::Enter(state) => state,
            other => panic!("Expected a new state, got {:?}", other),
        };
        assert_eq!(
            selected,
            State::GallerySelect {
                picture_ref: reference.clone(),
                action: None
            }
        );

        assert_eq!(selected.next(&select, &session).unwrap(), Transition::Stay);

        let print = Event::gui_postprocess(Some(reference.clone()), Some("print".into())).unwrap();
        assert_eq!(
            selected.next(&print, &session).unwrap(),
            Transition::Enter(State::GallerySelect {
                picture_ref: reference,
                action: Some("print".into())
            })
        );
        assert_eq!(
            selected.next(&gui("close"), &session).unwrap(),
            Transition::Enter(State::Gallery)
        );
    }

    #[test]
    fn countdown_ignores_repeated_ticks() {
        let session = running(3);
        let countdown = State::countdown(2, 3).unwrap();
        assert_eq!(countdown.next(&gui("countdown"), &session).unwrap(), Transition::Stay);
        assert_eq!(
            countdown.next(&gui("capture"), &session).unwrap(),
            Transition::Enter(State::Capture {
                picture_index: 2,
                num_shots: 3
            })
        );
    }

    #[test]
    fn capture_follows_the_camera() {
        let session = running(3);
        let capture = State::capture(1, 3).unwrap();
        assert_eq!(
            capture.next(&Event::camera("countdown").unwrap(), &session).unwrap(),
            Transition::Enter(State::Countdown {
                picture_index: 2,
                num_shots: 3
            })
        );
        assert_eq!(
            capture.next(&Event::camera("assemble").unwrap(), &session).unwrap(),
            Transition::Enter(State::Assemble)
        );
        // The GUI cannot advance a capture
        assert!(capture.next(&gui("countdown"), &session).is_err());
    }

    #[test]
    fn retry_restores_saved_state() {
        let saved = State::countdown(2, 3).unwrap();
        let error = State::error("camera", "timeout", saved.clone(), true).unwrap();
        assert_eq!(
            error.next(&gui("retry"), &running(3)).unwrap(),
            Transition::Enter(saved)
        );
    }

    #[test]
    fn abort_depends_on_running_flag() {
        let running_error = State::error("camera", "timeout", State::Idle, true).unwrap();
        let startup_error = State::error("camera", "timeout", State::Startup, false).unwrap();

        assert_eq!(
            running_error.next(&gui("abort"), &running(3)).unwrap(),
            Transition::Enter(State::Idle)
        );
        assert_eq!(
            startup_error.next(&gui("abort"), &Session::default()).unwrap(),
            Transition::Enter(State::teardown(TeardownTarget::Welcome))
        );
    }

    #[test]
    fn only_welcome_teardown_accepts_events() {
        let session = Session::default();
        assert_eq!(
            State::teardown(TeardownTarget::Welcome)
                .next(&gui("welcome"), &session)
                .unwrap(),
            Transition::Enter(State::Welcome)
        );
        assert!(State::teardown(TeardownTarget::Exit)
            .next(&gui("welcome"), &session)
            .is_err());
    }

    #[test]
    fn unhandled_error_names_both_sides() {
        let error = State::Idle
            .next(&Event::camera_ready(3).unwrap(), &running(3))
            .unwrap_err();
        assert_eq!(error.state, "Idle");
        assert_eq!(error.event, "Camera/ready");
    }

    #[test]
    fn final_states() {
        assert!(State::teardown(TeardownTarget::Exit).is_final());
        assert!(State::teardown(TeardownTarget::Restart).is_final());
        assert!(!State::teardown(TeardownTarget::Welcome).is_final());
        assert!(!State::Idle.is_final());
    }

    #[test]
    fn display_includes_session_data() {
        assert_eq!(State::countdown(2, 3).unwrap().to_string(), "Countdown(2/3)");
        assert_eq!(State::Idle.to_string(), "Idle");
        assert_eq!(
            State::teardown(TeardownTarget::Welcome).to_string(),
            "Teardown(Welcome)"
        );
    }
}
