//! Camera backend and template trait definitions.

use crate::core::picture::{Picture, Shot};
use crate::error::DeviceError;

/// Trait for camera drivers
pub trait CameraBackend: Send {
    /// Whether the camera can stream preview frames
    fn has_preview(&self) -> bool;

    /// Whether the camera has a power-saving idle mode
    fn has_idle(&self) -> bool {
        false
    }

    /// Connect to the device
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Leave idle mode
    fn set_active(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Enter idle mode
    fn set_idle(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// One encoded preview frame
    fn preview(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// One encoded full resolution picture
    fn picture(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Release the device
    fn cleanup(&mut self) {}
}

/// Trait for picture layouts
///
/// The template owns the number of shots per picture; the camera asks
/// it whether another shot is needed.
pub trait Template: Send {
    /// Shots assembled into one picture
    fn total_shots(&self) -> u32;

    /// Prepare the layout using a test picture from the camera
    fn startup(&mut self, test_picture: &[u8]) -> Result<(), DeviceError>;

    /// Combine the shots of one session into a picture
    fn assemble(&mut self, shots: &[Shot]) -> Result<Picture, DeviceError>;
}

impl<B: CameraBackend + ?Sized> CameraBackend for Box<B> {
    fn has_preview(&self) -> bool {
        (**self).has_preview()
    }

    fn has_idle(&self) -> bool {
        (**self).has_idle()
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        (**self).open()
    }

    fn set_active(&mut self) -> Result<(), DeviceError> {
        (**self).set_active()
    }

    fn set_idle(&mut self) -> Result<(), DeviceError> {
        (**self).set_idle()
    }

    fn preview(&mut self) -> Result<Vec<u8>, DeviceError> {
        (**self).preview()
    }

    fn picture(&mut self) -> Result<Vec<u8>, DeviceError> {
        (**self).picture()
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }
}

impl<T: Template + ?Sized> Template for Box<T> {
    fn total_shots(&self) -> u32 {
        (**self).total_shots()
    }

    fn startup(&mut self, test_picture: &[u8]) -> Result<(), DeviceError> {
        (**self).startup(test_picture)
    }

    fn assemble(&mut self, shots: &[Shot]) -> Result<Picture, DeviceError> {
        (**self).assemble(shots)
    }
}
