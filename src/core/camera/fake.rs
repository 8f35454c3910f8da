//! Stand-in camera and template for running without hardware.

use super::{CameraBackend, Template};
use crate::core::picture::{Picture, Shot};
use crate::error::DeviceError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const WATERMARK: &[u8] = b"#photobooth";

/// Camera that returns a fixed frame
pub struct FakeCamera {
    frame: Vec<u8>,
    failing_opens: u32,
    fail_pictures: bool,
    captures: Arc<AtomicU32>,
}

impl FakeCamera {
    pub fn new(frame: impl Into<Vec<u8>>) -> Self {
        Self {
            frame: frame.into(),
            failing_opens: 0,
            fail_pictures: false,
            captures: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fail the first `count` attempts to open the camera
    pub fn failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = count;
        self
    }

    /// Fail every full resolution capture
    pub fn failing_pictures(mut self) -> Self {
        self.fail_pictures = true;
        self
    }

    /// Counter of full resolution pictures taken, shared with clones
    pub fn capture_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.captures)
    }
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self::new(b"fake-frame".to_vec())
    }
}

impl CameraBackend for FakeCamera {
    fn has_preview(&self) -> bool {
        true
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        if self.failing_opens > 0 {
            self.failing_opens -= 1;
            return Err(DeviceError::Camera("no camera detected".to_string()));
        }
        tracing::info!("Using fake camera");
        Ok(())
    }

    fn preview(&mut self) -> Result<Vec<u8>, DeviceError> {
        Ok(self.frame.clone())
    }

    fn picture(&mut self) -> Result<Vec<u8>, DeviceError> {
        if self.fail_pictures {
            return Err(DeviceError::Camera("shutter stuck".to_string()));
        }
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }
}

/// Layout that strings the shots together one after another
pub struct StripTemplate {
    total_shots: u32,
    frame_size: Option<usize>,
}

impl StripTemplate {
    pub fn new(total_shots: u32) -> Self {
        Self {
            total_shots,
            frame_size: None,
        }
    }
}

impl Template for StripTemplate {
    fn total_shots(&self) -> u32 {
        self.total_shots
    }

    fn startup(&mut self, test_picture: &[u8]) -> Result<(), DeviceError> {
        if test_picture.is_empty() {
            return Err(DeviceError::Template("test picture is empty".to_string()));
        }
        self.frame_size = Some(test_picture.len());
        Ok(())
    }

    fn assemble(&mut self, shots: &[Shot]) -> Result<Picture, DeviceError> {
        if self.frame_size.is_none() {
            return Err(DeviceError::Template("template was not started".to_string()));
        }
        if shots.len() != self.total_shots as usize {
            return Err(DeviceError::Template(format!(
                "expected {} shots, got {}",
                self.total_shots,
                shots.len()
            )));
        }

        let original: Vec<u8> = shots.iter().flat_map(|shot| shot.data.iter().copied()).collect();
        let watermarked: Vec<u8> = original
            .iter()
            .copied()
            .chain(WATERMARK.iter().copied())
            .collect();
        let thumbnail = shots[0].data.to_vec();

        Ok(Picture::new(original, watermarked, thumbnail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_opens_recover() {
        let mut camera = FakeCamera::default().failing_opens(2);
        assert!(camera.open().is_err());
        assert!(camera.open().is_err());
        assert!(camera.open().is_ok());
    }

    #[test]
    fn captures_are_counted() {
        let mut camera = FakeCamera::new(vec![7u8]);
        let counter = camera.capture_counter();
        camera.picture().unwrap();
        camera.preview().unwrap();
        camera.picture().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn template_assembles_all_shots() {
        let mut template = StripTemplate::new(2);
        template.startup(b"ab").unwrap();

        let shots = vec![Shot::new(1, b"ab".to_vec()), Shot::new(2, b"cd".to_vec())];
        let picture = template.assemble(&shots).unwrap();

        assert_eq!(&picture.original[..], b"abcd");
        assert_eq!(&picture.thumbnail[..], b"ab");
        assert!(picture.watermarked.ends_with(WATERMARK));
    }

    #[test]
    fn template_rejects_wrong_shot_count() {
        let mut template = StripTemplate::new(3);
        template.startup(b"ab").unwrap();
        assert!(template.assemble(&[Shot::new(1, b"ab".to_vec())]).is_err());
    }

    #[test]
    fn template_must_be_started() {
        let mut template = StripTemplate::new(1);
        assert!(template.assemble(&[Shot::new(1, b"ab".to_vec())]).is_err());
    }
}
