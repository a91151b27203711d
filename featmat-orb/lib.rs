use featmat_core::{DescriptorSet, Image};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod brief;
mod fast;

pub use brief::{BriefDescriptor, DESCRIPTOR_BYTES};
pub use fast::{CornerDetector, Keypoint};

/// Column count each ORB descriptor contributes to the feature matrix.
pub const DESCRIPTOR_WIDTH: usize = DESCRIPTOR_BYTES;

#[derive(Debug, Clone)]
pub enum OrbError {
    InvalidImageSize { width: usize, height: usize },
    InvalidImageData { expected_len: usize, actual_len: usize },
    InvalidThreshold(u8),
    InvalidPatchSize { patch_size: usize, min_image_dim: usize },
    InvalidArcLength(usize),
    ImageTooSmall { width: usize, height: usize, min_size: usize },
}

impl std::fmt::Display for OrbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            OrbError::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
            OrbError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be 1-127)", t)
            }
            OrbError::InvalidPatchSize { patch_size, min_image_dim } => {
                write!(f, "Patch size {} invalid for minimum image dimension {}", patch_size, min_image_dim)
            }
            OrbError::InvalidArcLength(n) => {
                write!(f, "Invalid FAST arc length: {} (must be 1-16)", n)
            }
            OrbError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
        }
    }
}

impl std::error::Error for OrbError {}

pub type OrbResult<T> = Result<T, OrbError>;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbParams {
    /// FAST intensity threshold against the circle center.
    pub threshold: u8,
    /// Contiguous circle pixels required for a corner (FAST-9).
    pub arc_length: usize,
    /// Square patch side for intensity-centroid orientation.
    pub patch_size: usize,
    /// Minimum distance kept between keypoints after suppression.
    pub nms_radius: f32,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            threshold: 20,
            arc_length: 9,
            patch_size: 31,
            nms_radius: 3.0,
        }
    }
}

/// ORB extractor: FAST corners with intensity-centroid orientation,
/// described by rotation-steered BRIEF. One instance per image size.
pub struct OrbExtractor {
    detector: CornerDetector,
    brief: BriefDescriptor,
}

impl OrbExtractor {
    pub fn new(params: OrbParams, width: usize, height: usize) -> OrbResult<Self> {
        let detector = CornerDetector::new(params, width, height)?;
        let brief = BriefDescriptor::new(width, height);
        Ok(Self { detector, brief })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.detector.dimensions()
    }

    pub fn detect(&self, img: &Image) -> OrbResult<Vec<Keypoint>> {
        self.detector.detect(img)
    }

    /// Detects keypoints and packs their descriptors into a set of
    /// 32-wide f32 rows. Zero keypoints yields an empty set, which the
    /// caller must treat as the recoverable "no features" case.
    pub fn extract(&self, img: &Image) -> OrbResult<DescriptorSet> {
        let keypoints = self.detector.detect(img)?;
        let descriptors = self.brief.describe(img, &keypoints);

        let mut set = DescriptorSet::with_capacity(DESCRIPTOR_WIDTH, descriptors.len());
        let mut row = [0.0f32; DESCRIPTOR_WIDTH];
        for desc in &descriptors {
            for (dst, &byte) in row.iter_mut().zip(desc.iter()) {
                *dst = byte as f32;
            }
            set.push_row(&row);
        }
        Ok(set)
    }
}
