//! Utilities for loading images to be rendered on the map.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::error::PortolanError;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(0);

/// An image that has been decoded into raw RGBA bytes.
///
/// Cloning is cheap; the pixel data is shared. Every decoded image gets a
/// process-unique id that render backends use to cache GPU-side resources.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    id: u64,
    bytes: Bytes,
    width: u32,
    height: u32,
}

impl DecodedImage {
    /// Decodes an image from an encoded byte buffer.
    ///
    /// Attempts to guess the format of the image from the data. Non-RGBA
    /// images are converted to RGBA.
    pub fn decode(data: &[u8]) -> Result<Self, PortolanError> {
        let decoded = image::load_from_memory(data)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        Self::from_raw(rgba.into_raw(), width, height)
    }

    /// Creates an image from raw RGBA bytes.
    pub fn from_raw(
        bytes: impl Into<Bytes>,
        width: u32,
        height: u32,
    ) -> Result<Self, PortolanError> {
        let bytes = bytes.into();
        if bytes.len() != (width as usize) * (height as usize) * 4 {
            return Err(PortolanError::Generic(format!(
                "invalid image buffer length {} for dimensions {width}x{height}",
                bytes.len()
            )));
        }

        Ok(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            bytes,
            width,
            height,
        })
    }

    /// Process-unique id of the image.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Width of the image in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the image in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_image_length_is_checked() {
        assert!(DecodedImage::from_raw(vec![0u8; 16], 2, 2).is_ok());
        assert!(DecodedImage::from_raw(vec![0u8; 15], 2, 2).is_err());
    }

    #[test]
    fn ids_are_unique() {
        let a = DecodedImage::from_raw(vec![0u8; 4], 1, 1).expect("valid image");
        let b = DecodedImage::from_raw(vec![0u8; 4], 1, 1).expect("valid image");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }
}
