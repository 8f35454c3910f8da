//! # Picture Module
//!
//! Boundary types for pictures flowing through the session.
//!
//! The state machine only carries these values around; the camera
//! produces them and the worker stores them.

mod list;

pub use list::PictureList;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage names of one assembled picture
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PictureRef {
    /// Full resolution picture
    pub original: String,
    /// Picture with watermark applied, served to guests
    pub watermarked: String,
    /// Small preview for gallery views
    pub thumbnail: String,
}

impl PictureRef {
    /// Create a reference from its three names
    pub fn new(
        original: impl Into<String>,
        watermarked: impl Into<String>,
        thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            original: original.into(),
            watermarked: watermarked.into(),
            thumbnail: thumbnail.into(),
        }
    }

    /// A reference where all three names point at the same file
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            original: name.clone(),
            watermarked: name.clone(),
            thumbnail: name,
        }
    }
}

impl std::fmt::Display for PictureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Encoded bytes of one assembled picture
///
/// Buffers are shared so broadcasting a state that carries a picture
/// to every subscriber does not copy image data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub original: Arc<[u8]>,
    pub watermarked: Arc<[u8]>,
    pub thumbnail: Arc<[u8]>,
}

impl Picture {
    /// Create a picture from its three encodings
    pub fn new(
        original: impl Into<Arc<[u8]>>,
        watermarked: impl Into<Arc<[u8]>>,
        thumbnail: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            original: original.into(),
            watermarked: watermarked.into(),
            thumbnail: thumbnail.into(),
        }
    }

    /// A picture whose three encodings share one buffer
    pub fn uniform(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        Self {
            original: Arc::clone(&data),
            watermarked: Arc::clone(&data),
            thumbnail: data,
        }
    }

    /// Size of the original encoding in bytes
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}

/// One raw capture contributing to an assembled picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    /// 1-based position within the picture
    pub index: u32,
    pub data: Arc<[u8]>,
}

impl Shot {
    pub fn new(index: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            index,
            data: data.into(),
        }
    }
}
