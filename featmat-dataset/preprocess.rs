use featmat_core::Image;
use image::{imageops::FilterType, DynamicImage};

#[derive(Debug)]
pub enum PreprocessError {
    EmptyImage,
}

impl std::fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessError::EmptyImage => write!(f, "Image has zero width or height"),
        }
    }
}

impl std::error::Error for PreprocessError {}

/// A normalized image ready for feature extraction.
pub struct PreprocessedImage {
    pub pixels: Image,
    pub width: usize,
    pub height: usize,
}

/// Normalization seam between image loading and feature extraction. The
/// walker treats implementations as opaque: whatever comes back is fed
/// straight to the extractor, and errors skip the image.
pub trait Preprocess {
    fn preprocess(&self, img: DynamicImage) -> Result<PreprocessedImage, PreprocessError>;
}

/// Default preprocessing: grayscale conversion plus exact resize to one
/// fixed size, so every extractor in a run sees identical dimensions.
pub struct StandardPreprocess {
    width: usize,
    height: usize,
}

impl StandardPreprocess {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0);
        Self { width, height }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

impl Preprocess for StandardPreprocess {
    fn preprocess(&self, img: DynamicImage) -> Result<PreprocessedImage, PreprocessError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(PreprocessError::EmptyImage);
        }
        let gray = img
            .resize_exact(self.width as u32, self.height as u32, FilterType::Triangle)
            .to_luma8();
        Ok(PreprocessedImage {
            pixels: gray.into_raw(),
            width: self.width,
            height: self.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn test_resize_to_configured_size() {
        let pre = StandardPreprocess::new(32, 24);
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 60, image::Luma([77])));
        let out = pre.preprocess(img).unwrap();
        assert_eq!((out.width, out.height), (32, 24));
        assert_eq!(out.pixels.len(), 32 * 24);
    }

    #[test]
    fn test_color_input_becomes_grayscale() {
        let pre = StandardPreprocess::new(16, 16);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([255, 0, 0])));
        let out = pre.preprocess(img).unwrap();
        assert_eq!(out.pixels.len(), 16 * 16);
        // Pure red maps to a single luma value everywhere
        let first = out.pixels[0];
        assert!(out.pixels.iter().all(|&p| p == first));
    }
}
