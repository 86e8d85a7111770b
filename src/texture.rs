//! Image decoding for image widgets
//!
//! Images are decoded once at catalog load into RGBA format for direct
//! rendering; the pixel data lives as long as the owning widget.

use std::path::Path;

use thiserror::Error;

/// Errors raised while decoding an image file
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoded RGBA image data
#[derive(Clone, PartialEq)]
pub struct Texture {
    /// RGBA pixel data (width * height * 4 bytes)
    rgba: Vec<u8>,
    /// Natural width in pixels
    width: u32,
    /// Natural height in pixels
    height: u32,
}

impl Texture {
    /// Decode the image at `path` into RGBA8
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let decoded = image::open(path)?.to_rgba8();
        let (width, height) = decoded.dimensions();

        Ok(Self {
            rgba: decoded.into_raw(),
            width,
            height,
        })
    }

    /// Natural width of the decoded image
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Natural height of the decoded image
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fetch a single pixel; coordinates must be within the natural size
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }

    #[cfg(test)]
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        assert_eq!(rgba.len(), (width * height * 4) as usize);
        Self {
            rgba,
            width,
            height,
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error() {
        assert!(Texture::load(Path::new("/nonexistent.png")).is_err());
    }

    #[test]
    fn non_image_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"plain text, not pixels").unwrap();
        assert!(Texture::load(&path).is_err());
    }

    #[test]
    fn decodes_natural_dimensions_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");

        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 255, 128]));
        img.save(&path).unwrap();

        let texture = Texture::load(&path).unwrap();
        assert_eq!((texture.width(), texture.height()), (2, 1));
        assert_eq!(texture.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(texture.pixel(1, 0), [0, 0, 255, 128]);
    }
}
