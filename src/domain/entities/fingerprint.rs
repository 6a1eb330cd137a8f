//! Cache key derived from request content.

use std::fmt;

use sha2::{Digest, Sha256};

use super::ImageBuffer;

/// SHA-256 digest over a normalized image and the prompt sent with it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of an image and prompt.
    ///
    /// The image length is hashed first so that no (image, prompt) split of
    /// the same byte stream can collide with another.
    #[must_use]
    pub fn compute(image: &ImageBuffer, prompt: &str) -> Self {
        Self::from_parts(image.as_bytes(), prompt)
    }

    /// Computes the fingerprint from raw parts.
    #[must_use]
    pub fn from_parts(image: &[u8], prompt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((image.len() as u64).to_le_bytes());
        hasher.update(image);
        hasher.update(prompt.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Parses a 64-character hex string.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let mut digest = [0u8; 32];
        hex::decode_to_slice(value, &mut digest).ok()?;
        Some(Self(digest))
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 12 hex characters, for logs and display.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_fingerprint() {
        let a = Fingerprint::from_parts(b"image", "what is this?");
        let b = Fingerprint::from_parts(b"image", "what is this?");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_difference_changes_fingerprint() {
        let a = Fingerprint::from_parts(b"image", "what is this?");
        let b = Fingerprint::from_parts(b"image", "what is this? ");
        assert_ne!(a, b);
    }

    #[test]
    fn test_image_difference_changes_fingerprint() {
        let a = Fingerprint::from_parts(b"image-a", "q");
        let b = Fingerprint::from_parts(b"image-b", "q");
        assert_ne!(a, b);
    }

    #[test]
    fn test_boundary_shift_does_not_collide() {
        let a = Fingerprint::from_parts(b"abc", "def");
        let b = Fingerprint::from_parts(b"abcd", "ef");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = Fingerprint::from_parts(b"image", "q");
        let hex = fp.to_hex();

        assert_eq!(hex.len(), 64);
        assert_eq!(Fingerprint::from_hex(&hex), Some(fp));
        assert!(Fingerprint::from_hex("not-hex").is_none());
    }
}
