// src/models/identity.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub const IDENTITY_PHOTO_FILE_NAME: &str = "identity_photo.jpg";

/// A still image taken from the live preview.
#[derive(Debug, Clone, PartialEq)]
pub struct StillImage {
    pub mime_type: String,
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl StillImage {
    pub fn jpeg(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data: Arc::new(data),
            width,
            height,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Identity photo taken during the photo step.
/// Retakes replace it until the step is left, after which it is frozen.
#[derive(Debug, Clone, Default)]
pub struct IdentityCapture {
    photo: Option<StillImage>,
    captured_at: Option<DateTime<Utc>>,
    frozen: bool,
}

impl IdentityCapture {
    /// Stores `photo`, replacing any previous one. Returns false once frozen.
    pub fn replace(&mut self, photo: StillImage, now: DateTime<Utc>) -> bool {
        if self.frozen {
            return false;
        }
        self.photo = Some(photo);
        self.captured_at = Some(now);
        true
    }

    /// Drops the current photo. Returns false once frozen.
    pub fn clear(&mut self) -> bool {
        if self.frozen {
            return false;
        }
        self.photo = None;
        self.captured_at = None;
        true
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_captured(&self) -> bool {
        self.photo.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn photo(&self) -> Option<&StillImage> {
        self.photo.as_ref()
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }
}
