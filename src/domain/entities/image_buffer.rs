//! Normalized image payload.

use std::fmt;

use bytes::Bytes;

/// MIME type of every normalized image.
pub const NORMALIZED_MIME_TYPE: &str = "image/jpeg";

/// Encoded image ready for transmission to the vision model.
///
/// Only produced by the preprocessor, so the bytes are always a JPEG whose
/// longest side fits the configured bound. Cloning is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    bytes: Bytes,
    width: u32,
    height: u32,
}

impl ImageBuffer {
    pub(crate) const fn new(bytes: Bytes, width: u32, height: u32) -> Self {
        Self {
            bytes,
            width,
            height,
        }
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a cheap handle to the encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Pixel width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Longest side in pixels.
    #[must_use]
    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }

    /// MIME type of the encoded bytes.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        NORMALIZED_MIME_TYPE
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}
