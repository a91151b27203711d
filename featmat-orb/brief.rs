use featmat_core::Image;
use rayon::prelude::*;

use crate::fast::Keypoint;

pub const DESCRIPTOR_BYTES: usize = 32;

const NUM_PAIRS: usize = DESCRIPTOR_BYTES * 8;

/// Sampling coordinates stay inside this radius so the rotated pattern
/// rarely leaves the patch.
const SAMPLE_RADIUS: i32 = 13;

/// Steered BRIEF: 256 intensity comparisons per keypoint, with the
/// sampling pattern rotated by the keypoint orientation.
pub struct BriefDescriptor {
    w: usize,
    h: usize,
    pairs: Vec<(f32, f32, f32, f32)>,
}

impl BriefDescriptor {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0);
        Self {
            w: width,
            h: height,
            pairs: sampling_pattern(),
        }
    }

    pub fn describe(&self, img: &Image, kps: &[Keypoint]) -> Vec<[u8; DESCRIPTOR_BYTES]> {
        kps.par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let mut d = [0u8; DESCRIPTOR_BYTES];

                for (i, &(x1, y1, x2, y2)) in self.pairs.iter().enumerate() {
                    let (rx1, ry1) = (kp.x + c * x1 - s * y1, kp.y + s * x1 + c * y1);
                    let (rx2, ry2) = (kp.x + c * x2 - s * y2, kp.y + s * x2 + c * y2);

                    let val1 = self.bilinear_sample(img, rx1, ry1);
                    let val2 = self.bilinear_sample(img, rx2, ry2);

                    let bit = (val1 < val2) as u8;
                    d[i / 8] |= bit << (i % 8);
                }
                d
            })
            .collect()
    }

    /// Bilinear interpolation for subpixel sampling, clamped at borders.
    fn bilinear_sample(&self, img: &Image, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let x1 = x0 + 1.0;
        let y1 = y0 + 1.0;

        if x0 < 0.0 || y0 < 0.0 || x1 >= self.w as f32 || y1 >= self.h as f32 {
            let cx = x.round().clamp(0.0, (self.w - 1) as f32) as usize;
            let cy = y.round().clamp(0.0, (self.h - 1) as f32) as usize;
            return img[cy * self.w + cx] as f32;
        }

        let dx = x - x0;
        let dy = y - y0;

        let x0_idx = x0 as usize;
        let y0_idx = y0 as usize;
        let x1_idx = x1 as usize;
        let y1_idx = y1 as usize;

        let p00 = img[y0_idx * self.w + x0_idx] as f32;
        let p10 = img[y0_idx * self.w + x1_idx] as f32;
        let p01 = img[y1_idx * self.w + x0_idx] as f32;
        let p11 = img[y1_idx * self.w + x1_idx] as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;

        top * (1.0 - dy) + bottom * dy
    }
}

/// 256 comparison pairs drawn from a fixed-seed xorshift so every
/// descriptor bit is populated and the pattern is identical across runs.
fn sampling_pattern() -> Vec<(f32, f32, f32, f32)> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next_coord = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let span = (2 * SAMPLE_RADIUS + 1) as u64;
        (state % span) as i32 - SAMPLE_RADIUS
    };

    (0..NUM_PAIRS)
        .map(|_| {
            (
                next_coord() as f32,
                next_coord() as f32,
                next_coord() as f32,
                next_coord() as f32,
            )
        })
        .collect()
}
