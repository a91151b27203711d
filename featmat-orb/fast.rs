use featmat_core::Image;
use rayon::prelude::*;

use crate::{OrbError, OrbParams, OrbResult};

/// Bresenham circle of radius 3 around the candidate pixel, clockwise
/// from the top.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// Oriented FAST keypoint with its corner response.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub response: f32,
}

/// FAST corner detector with intensity-centroid orientation and greedy
/// non-maximum suppression.
pub struct CornerDetector {
    params: OrbParams,
    w: usize,
    h: usize,
}

impl CornerDetector {
    pub fn new(params: OrbParams, width: usize, height: usize) -> OrbResult<Self> {
        if width == 0 || height == 0 {
            return Err(OrbError::InvalidImageSize { width, height });
        }

        // The circle needs a 3-pixel border on every side
        const MIN_SIZE: usize = 7;
        if width < MIN_SIZE || height < MIN_SIZE {
            return Err(OrbError::ImageTooSmall { width, height, min_size: MIN_SIZE });
        }

        if params.threshold == 0 || params.threshold > 127 {
            return Err(OrbError::InvalidThreshold(params.threshold));
        }

        if params.arc_length == 0 || params.arc_length > 16 {
            return Err(OrbError::InvalidArcLength(params.arc_length));
        }

        let min_dim = width.min(height);
        if params.patch_size % 2 == 0 || params.patch_size >= min_dim {
            return Err(OrbError::InvalidPatchSize {
                patch_size: params.patch_size,
                min_image_dim: min_dim,
            });
        }

        Ok(Self { params, w: width, h: height })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn params(&self) -> &OrbParams {
        &self.params
    }

    pub fn detect(&self, img: &Image) -> OrbResult<Vec<Keypoint>> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(OrbError::InvalidImageData { expected_len, actual_len: img.len() });
        }

        let candidates: Vec<Keypoint> = (3..self.h - 3)
            .into_par_iter()
            .flat_map_iter(|y| self.scan_row(img, y))
            .collect();

        Ok(self.suppress(candidates))
    }

    fn scan_row(&self, img: &Image, y: usize) -> Vec<Keypoint> {
        let t = self.params.threshold;
        let mut found = Vec::new();

        for x in 3..self.w - 3 {
            let center = img[y * self.w + x];

            let mut bright: u16 = 0;
            let mut dark: u16 = 0;
            let mut diff_sum = 0i32;
            for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
                let xx = (x as i32 + dx) as usize;
                let yy = (y as i32 + dy) as usize;
                let q = img[yy * self.w + xx];

                if q >= center.saturating_add(t) {
                    bright |= 1 << i;
                    diff_sum += q as i32 - center as i32;
                } else if q.saturating_add(t) <= center {
                    dark |= 1 << i;
                    diff_sum += center as i32 - q as i32;
                }
            }

            let is_corner = has_contiguous_arc(bright, self.params.arc_length)
                || has_contiguous_arc(dark, self.params.arc_length);
            if !is_corner {
                continue;
            }

            let qualifying = (bright.count_ones() + dark.count_ones()) as i32;
            found.push(Keypoint {
                x: x as f32,
                y: y as f32,
                angle: self.orientation(img, x, y),
                response: diff_sum as f32 / qualifying as f32,
            });
        }

        found
    }

    /// Intensity-centroid orientation over the configured square patch.
    /// Keypoints whose patch would leave the image keep angle 0.
    fn orientation(&self, img: &Image, x: usize, y: usize) -> f32 {
        let half = (self.params.patch_size / 2) as i32;
        let (cx, cy) = (x as i32, y as i32);

        if cx - half < 0
            || cy - half < 0
            || cx + half >= self.w as i32
            || cy + half >= self.h as i32
        {
            return 0.0;
        }

        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let yy = (cy + dy) as usize;
            for dx in -half..=half {
                let xx = (cx + dx) as usize;
                let val = img[yy * self.w + xx] as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }

        (m01 as f32).atan2(m10 as f32)
    }

    /// Greedy non-maximum suppression: strongest responses first, drop
    /// anything closer than `nms_radius` to an accepted keypoint.
    fn suppress(&self, mut keypoints: Vec<Keypoint>) -> Vec<Keypoint> {
        if keypoints.is_empty() {
            return keypoints;
        }

        keypoints.sort_by(|a, b| {
            b.response
                .partial_cmp(&a.response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let min_dist_sq = self.params.nms_radius * self.params.nms_radius;
        let mut accepted: Vec<Keypoint> = Vec::new();

        for candidate in keypoints {
            let too_close = accepted.iter().any(|kp| {
                let dx = candidate.x - kp.x;
                let dy = candidate.y - kp.y;
                dx * dx + dy * dy < min_dist_sq
            });
            if !too_close {
                accepted.push(candidate);
            }
        }

        accepted
    }
}

/// True when the 16-bit circle mask contains `min_len` consecutive set
/// bits, treating the mask as circular.
pub(crate) fn has_contiguous_arc(mask: u16, min_len: usize) -> bool {
    if min_len == 0 || min_len > 16 {
        return false;
    }
    let mut acc = mask;
    for i in 1..min_len {
        acc &= mask.rotate_left(i as u32);
        if acc == 0 {
            return false;
        }
    }
    acc != 0
}
