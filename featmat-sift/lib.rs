use featmat_core::{DescriptorSet, Image};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod descriptor;
mod pyramid;

use descriptor::{compute_descriptor, dominant_orientation};
use pyramid::{build_octaves, Octave};

/// Column count each SIFT descriptor contributes to the feature matrix.
pub const DESCRIPTOR_WIDTH: usize = descriptor::DESCRIPTOR_LEN;

/// Extrema are not sampled closer than this to a DoG level border.
const BORDER: usize = 5;

const MIN_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub enum SiftError {
    InvalidImageSize { width: usize, height: usize },
    InvalidImageData { expected_len: usize, actual_len: usize },
    ImageTooSmall { width: usize, height: usize, min_size: usize },
    InvalidScales(usize),
}

impl std::fmt::Display for SiftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiftError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            SiftError::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
            SiftError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
            SiftError::InvalidScales(s) => {
                write!(f, "Invalid scales per octave: {} (must be 1-8)", s)
            }
        }
    }
}

impl std::error::Error for SiftError {}

pub type SiftResult<T> = Result<T, SiftError>;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiftParams {
    pub octaves: usize,
    pub scales_per_octave: usize,
    /// Base blur of the first scale-space level.
    pub sigma: f32,
    /// Minimum absolute DoG response, on [0, 1] intensities.
    pub contrast_threshold: f32,
    /// Principal-curvature ratio bound for edge rejection.
    pub edge_threshold: f32,
}

impl Default for SiftParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            scales_per_octave: 3,
            sigma: 1.6,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
        }
    }
}

/// Scale-space keypoint before description.
#[derive(Debug, Clone, Copy)]
struct ScaleSpaceExtremum {
    x: usize,
    y: usize,
    level: usize,
}

/// SIFT extractor: DoG extrema with contrast and edge rejection,
/// described by 128-wide rotated gradient histograms.
pub struct SiftExtractor {
    params: SiftParams,
}

impl SiftExtractor {
    pub fn new(params: SiftParams) -> SiftResult<Self> {
        if params.scales_per_octave == 0 || params.scales_per_octave > 8 {
            return Err(SiftError::InvalidScales(params.scales_per_octave));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &SiftParams {
        &self.params
    }

    /// Detects and describes keypoints. Zero surviving keypoints yields
    /// an empty set, which the caller must treat as the recoverable
    /// "no features" case.
    pub fn extract(&self, img: &Image, width: usize, height: usize) -> SiftResult<DescriptorSet> {
        if width == 0 || height == 0 {
            return Err(SiftError::InvalidImageSize { width, height });
        }
        if width < MIN_SIZE || height < MIN_SIZE {
            return Err(SiftError::ImageTooSmall { width, height, min_size: MIN_SIZE });
        }
        let expected_len = width * height;
        if img.len() != expected_len {
            return Err(SiftError::InvalidImageData { expected_len, actual_len: img.len() });
        }

        let base: Vec<f32> = img.iter().map(|&p| p as f32 / 255.0).collect();
        let octaves = build_octaves(
            &base,
            width,
            height,
            self.params.octaves,
            self.params.scales_per_octave,
            self.params.sigma,
        );

        let mut set = DescriptorSet::new(DESCRIPTOR_WIDTH);
        for octave in &octaves {
            let extrema = self.find_extrema(octave);

            let rows: Vec<[f32; DESCRIPTOR_WIDTH]> = extrema
                .par_iter()
                .filter_map(|ext| self.describe(octave, ext))
                .collect();
            for row in &rows {
                set.push_row(row);
            }
        }

        Ok(set)
    }

    /// Scans interior DoG levels for 26-neighborhood extrema that clear
    /// the contrast threshold and survive edge rejection.
    fn find_extrema(&self, octave: &Octave) -> Vec<ScaleSpaceExtremum> {
        let threshold = self.params.contrast_threshold / self.params.scales_per_octave as f32;
        let w = octave.width;
        let h = octave.height;

        let mut extrema = Vec::new();
        for level in 1..octave.dogs.len() - 1 {
            let prev = &octave.dogs[level - 1];
            let curr = &octave.dogs[level];
            let next = &octave.dogs[level + 1];

            for y in BORDER..h - BORDER {
                for x in BORDER..w - BORDER {
                    let value = curr[y * w + x];
                    if value.abs() < threshold {
                        continue;
                    }
                    if !is_local_extremum(value, prev, curr, next, w, x, y) {
                        continue;
                    }
                    if self.is_edge_response(curr, w, x, y) {
                        continue;
                    }
                    extrema.push(ScaleSpaceExtremum { x, y, level });
                }
            }
        }
        extrema
    }

    /// Principal-curvature test on the 2x2 spatial Hessian of the DoG.
    fn is_edge_response(&self, dog: &[f32], w: usize, x: usize, y: usize) -> bool {
        let center = dog[y * w + x];
        let dxx = dog[y * w + x + 1] + dog[y * w + x - 1] - 2.0 * center;
        let dyy = dog[(y + 1) * w + x] + dog[(y - 1) * w + x] - 2.0 * center;
        let dxy = (dog[(y + 1) * w + x + 1] - dog[(y + 1) * w + x - 1]
            - dog[(y - 1) * w + x + 1]
            + dog[(y - 1) * w + x - 1])
            / 4.0;

        let trace = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        if det <= 0.0 {
            return true;
        }
        let r = self.params.edge_threshold;
        trace * trace / det >= (r + 1.0) * (r + 1.0) / r
    }

    fn describe(&self, octave: &Octave, ext: &ScaleSpaceExtremum) -> Option<[f32; DESCRIPTOR_WIDTH]> {
        let gauss = &octave.gaussians[ext.level];
        let scale_sigma = octave.sigmas[ext.level];
        let angle = dominant_orientation(
            gauss,
            octave.width,
            octave.height,
            ext.x,
            ext.y,
            scale_sigma,
        )?;
        compute_descriptor(
            gauss,
            octave.width,
            octave.height,
            ext.x,
            ext.y,
            angle,
            scale_sigma,
        )
    }
}

/// Strictly larger or strictly smaller than all 26 scale-space neighbors.
fn is_local_extremum(
    value: f32,
    prev: &[f32],
    curr: &[f32],
    next: &[f32],
    w: usize,
    x: usize,
    y: usize,
) -> bool {
    let mut is_max = true;
    let mut is_min = true;

    for buffer in [prev, curr, next] {
        let skip_center = std::ptr::eq(buffer, curr);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if skip_center && dx == 0 && dy == 0 {
                    continue;
                }
                let neighbor =
                    buffer[(y as i64 + dy) as usize * w + (x as i64 + dx) as usize];
                is_max &= value > neighbor;
                is_min &= value < neighbor;
                if !(is_max || is_min) {
                    return false;
                }
            }
        }
    }

    is_max || is_min
}
