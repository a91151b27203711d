use featmat_core::{FeatureVector, Image};
use image::GrayImage;
use imageproc::hog::{hog, HogOptions};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum HogError {
    InvalidImageSize { width: usize, height: usize },
    InvalidImageData { expected_len: usize, actual_len: usize },
    InvalidOrientations(usize),
    CellMismatch { side: usize, width: usize, height: usize },
    BlockMismatch { block_side: usize, block_stride: usize, cells: usize },
    Hog(String),
}

impl std::fmt::Display for HogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HogError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            HogError::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
            HogError::InvalidOrientations(n) => {
                write!(f, "Invalid orientation count: {} (must be > 0)", n)
            }
            HogError::CellMismatch { side, width, height } => {
                write!(f, "Cell side {} does not evenly divide image {}x{}", side, width, height)
            }
            HogError::BlockMismatch { block_side, block_stride, cells } => {
                write!(
                    f,
                    "Block side {} with stride {} does not tile {} cells per side",
                    block_side, block_stride, cells
                )
            }
            HogError::Hog(msg) => write!(f, "HOG computation failed: {}", msg),
        }
    }
}

impl std::error::Error for HogError {}

pub type HogResult<T> = Result<T, HogError>;

/// HOG parameters matching the usual skimage-style call:
/// orientations, pixels per cell side, cells per block side.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HogParams {
    pub orientations: usize,
    pub cell_side: usize,
    pub block_side: usize,
    pub block_stride: usize,
    /// Signed (0-360 degree) rather than unsigned gradient histograms.
    pub signed: bool,
}

impl Default for HogParams {
    fn default() -> Self {
        Self {
            orientations: 9,
            cell_side: 8,
            block_side: 3,
            block_stride: 1,
            signed: false,
        }
    }
}

/// HOG extractor bound to one image size, so the output length is fixed
/// for the whole run.
pub struct HogExtractor {
    params: HogParams,
    w: usize,
    h: usize,
    feature_len: usize,
}

impl HogExtractor {
    pub fn new(params: HogParams, width: usize, height: usize) -> HogResult<Self> {
        if width == 0 || height == 0 {
            return Err(HogError::InvalidImageSize { width, height });
        }
        if params.orientations == 0 {
            return Err(HogError::InvalidOrientations(params.orientations));
        }
        if params.cell_side == 0 || width % params.cell_side != 0 || height % params.cell_side != 0 {
            return Err(HogError::CellMismatch { side: params.cell_side, width, height });
        }

        let cells_w = width / params.cell_side;
        let cells_h = height / params.cell_side;
        let blocks_w = Self::blocks_per_side(cells_w, params.block_side, params.block_stride)?;
        let blocks_h = Self::blocks_per_side(cells_h, params.block_side, params.block_stride)?;

        let feature_len =
            blocks_w * blocks_h * params.block_side * params.block_side * params.orientations;

        Ok(Self { params, w: width, h: height, feature_len })
    }

    fn blocks_per_side(cells: usize, block_side: usize, block_stride: usize) -> HogResult<usize> {
        if block_side == 0 || block_stride == 0 || block_side > cells {
            return Err(HogError::BlockMismatch { block_side, block_stride, cells });
        }
        if (cells - block_side) % block_stride != 0 {
            return Err(HogError::BlockMismatch { block_side, block_stride, cells });
        }
        Ok((cells - block_side) / block_stride + 1)
    }

    /// Output length for any image of the configured dimensions. This is a
    /// pure function of the parameters, so no per-vector padding is needed
    /// downstream.
    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    pub fn params(&self) -> &HogParams {
        &self.params
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn extract(&self, img: &Image) -> HogResult<FeatureVector> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(HogError::InvalidImageData { expected_len, actual_len: img.len() });
        }

        let gray = GrayImage::from_raw(self.w as u32, self.h as u32, img.clone())
            .ok_or(HogError::InvalidImageData { expected_len, actual_len: img.len() })?;

        let options = HogOptions {
            orientations: self.params.orientations,
            signed: self.params.signed,
            cell_side: self.params.cell_side,
            block_side: self.params.block_side,
            block_stride: self.params.block_stride,
        };

        let features = hog(&gray, options).map_err(HogError::Hog)?;
        debug_assert_eq!(features.len(), self.feature_len);
        Ok(features)
    }
}
