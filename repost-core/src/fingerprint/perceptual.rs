//! Perceptual hashing for images.
//!
//! Turns raw image bytes into a [`Fingerprint`] that stays stable across
//! re-encoding, recompression and resizing, which is what makes reposts of
//! the same picture land within a small Hamming distance of each other.
//!
//! # Algorithm
//!
//! Blockhash over a 8x8 grid, producing a 64-bit hash rendered as 64
//! `'0'`/`'1'` symbols.
//!
//! # Usage
//!
//! ```no_run
//! use repost_core::fingerprint::PerceptualHasher;
//!
//! let image_data = std::fs::read("image.jpg").unwrap();
//! let fingerprint = PerceptualHasher.fingerprint_bytes(&image_data).unwrap();
//! assert_eq!(fingerprint.len(), 64);
//! ```

use blockhash::{blockhash64, Blockhash64};
use image::DynamicImage;

use super::Fingerprint;
use crate::error::{RepostError, Result};

/// Fingerprint length in symbols for Blockhash64.
pub const FINGERPRINT_BITS: usize = 64;

/// Blockhash64 over decoded images.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher;

impl PerceptualHasher {
    /// Decode raw image bytes and fingerprint them.
    ///
    /// Supports JPEG, PNG, GIF, and WebP formats.
    pub fn fingerprint_bytes(&self, image_data: &[u8]) -> Result<Fingerprint> {
        let image = image::load_from_memory(image_data).map_err(|e| {
            RepostError::PerceptualHashError(format!("Failed to decode image: {}", e))
        })?;

        self.fingerprint_image(&image)
    }

    pub fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
        let hash: Blockhash64 = blockhash64(image);
        let bytes: [u8; 8] = hash.into();
        Fingerprint::from_bits(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let buffer = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128u8])
        });
        DynamicImage::ImageRgb8(buffer)
    }

    #[test]
    fn test_fingerprint_is_64_bits() {
        let fp = PerceptualHasher
            .fingerprint_image(&gradient(64, 64))
            .unwrap();
        assert_eq!(fp.len(), FINGERPRINT_BITS);
        assert!(fp.as_str().chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let hasher = PerceptualHasher;
        let a = hasher.fingerprint_image(&gradient(64, 64)).unwrap();
        let b = hasher.fingerprint_image(&gradient(64, 64)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_undecodable_bytes_rejected() {
        let err = PerceptualHasher
            .fingerprint_bytes(&[0x00, 0x01, 0x02])
            .unwrap_err();
        assert!(matches!(err, RepostError::PerceptualHashError(_)));
    }
}
