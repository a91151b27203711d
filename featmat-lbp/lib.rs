use featmat_core::{FeatureVector, Image};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Denominator guard so an all-zero histogram never divides by zero.
const HIST_EPS: f32 = 1e-7;

const MAX_RADIUS: usize = 8;

#[derive(Debug, Clone)]
pub enum LbpError {
    InvalidRadius(usize),
    InvalidImageSize { width: usize, height: usize },
    InvalidImageData { expected_len: usize, actual_len: usize },
}

impl std::fmt::Display for LbpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LbpError::InvalidRadius(r) => {
                write!(f, "Invalid LBP radius: {} (must be 1-{})", r, MAX_RADIUS)
            }
            LbpError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            LbpError::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
        }
    }
}

impl std::error::Error for LbpError {}

pub type LbpResult<T> = Result<T, LbpError>;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LbpParams {
    /// Circle radius; the neighborhood has 8*radius sampling points.
    pub radius: usize,
}

impl Default for LbpParams {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

/// Uniform LBP histogram extractor.
///
/// Each pixel is coded against `P = 8*radius` circularly arranged
/// neighbors sampled with bilinear interpolation. Uniform patterns (at
/// most two 0/1 transitions around the circle) map to bins 0..=P by their
/// set-bit count; everything else lands in the non-uniform bin, giving
/// `P + 2` bins. The histogram is normalized by `sum + eps`.
pub struct LbpExtractor {
    radius: usize,
    points: usize,
}

impl LbpExtractor {
    pub fn new(params: LbpParams) -> LbpResult<Self> {
        if params.radius == 0 || params.radius > MAX_RADIUS {
            return Err(LbpError::InvalidRadius(params.radius));
        }
        Ok(Self { radius: params.radius, points: 8 * params.radius })
    }

    /// Number of histogram bins: `8*radius + 2`.
    pub fn feature_len(&self) -> usize {
        self.points + 2
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn extract(&self, img: &Image, width: usize, height: usize) -> LbpResult<FeatureVector> {
        if width == 0 || height == 0 {
            return Err(LbpError::InvalidImageSize { width, height });
        }
        let expected_len = width * height;
        if img.len() != expected_len {
            return Err(LbpError::InvalidImageData { expected_len, actual_len: img.len() });
        }

        let codes = self.compute_code_raster(img, width, height);

        let bins = self.feature_len();
        let mut counts = vec![0u32; bins];
        for &code in &codes {
            counts[code as usize] += 1;
        }

        let sum: f32 = counts.iter().map(|&c| c as f32).sum();
        let histogram = counts
            .into_iter()
            .map(|c| c as f32 / (sum + HIST_EPS))
            .collect();
        Ok(histogram)
    }

    /// Per-pixel uniform-pattern bin indices for the whole raster,
    /// row-parallel.
    fn compute_code_raster(&self, img: &Image, width: usize, height: usize) -> Vec<u16> {
        let p = self.points;
        let r = self.radius as f64;

        // Neighbor k sits at angle 2*pi*k/P:
        //   row offset = -r * sin(theta), col offset = r * cos(theta)
        let offsets: Vec<(f64, f64)> = (0..p)
            .map(|k| {
                let theta = 2.0 * std::f64::consts::PI * k as f64 / p as f64;
                (-r * theta.sin(), r * theta.cos())
            })
            .collect();

        let mut codes = vec![0u16; width * height];
        codes.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            let yf = y as f64;
            for x in 0..width {
                let center = img[y * width + x] as f64;
                let mut pattern: u64 = 0;
                for (k, &(dy, dx)) in offsets.iter().enumerate() {
                    let val = bilinear(img, width, height, yf + dy, x as f64 + dx);
                    if val >= center {
                        pattern |= 1 << k;
                    }
                }
                row[x] = uniform_bin(pattern, p);
            }
        });
        codes
    }
}

/// Bilinear interpolation at sub-pixel (y, x) with clamped boundaries.
fn bilinear(img: &Image, width: usize, height: usize, y: f64, x: f64) -> f64 {
    let fy = y.floor() as i64;
    let fx = x.floor() as i64;
    let ty = y - fy as f64;
    let tx = x - fx as f64;
    let y0 = fy.clamp(0, height as i64 - 1) as usize;
    let y1 = (fy + 1).clamp(0, height as i64 - 1) as usize;
    let x0 = fx.clamp(0, width as i64 - 1) as usize;
    let x1 = (fx + 1).clamp(0, width as i64 - 1) as usize;
    let v00 = img[y0 * width + x0] as f64;
    let v01 = img[y0 * width + x1] as f64;
    let v10 = img[y1 * width + x0] as f64;
    let v11 = img[y1 * width + x1] as f64;
    (1.0 - ty) * ((1.0 - tx) * v00 + tx * v01) + ty * ((1.0 - tx) * v10 + tx * v11)
}

/// Map a P-bit circular pattern to its uniform-LBP bin: set-bit count for
/// uniform patterns, P+1 for non-uniform ones.
fn uniform_bin(pattern: u64, p: usize) -> u16 {
    let mut transitions = 0u32;
    for k in 0..p {
        let b0 = (pattern >> k) & 1;
        let b1 = (pattern >> ((k + 1) % p)) & 1;
        if b0 != b1 {
            transitions += 1;
        }
    }
    if transitions <= 2 {
        pattern.count_ones() as u16
    } else {
        (p + 1) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn create_test_image(width: usize, height: usize) -> Image {
        let mut img = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                img[y * width + x] = ((x * 7 + y * 13) % 256) as u8;
            }
        }
        img
    }

    #[test]
    fn test_invalid_radius() {
        assert!(matches!(
            LbpExtractor::new(LbpParams { radius: 0 }),
            Err(LbpError::InvalidRadius(0))
        ));
        assert!(matches!(
            LbpExtractor::new(LbpParams { radius: 9 }),
            Err(LbpError::InvalidRadius(9))
        ));
    }

    #[test]
    fn test_feature_len() {
        for radius in 1..=3 {
            let extractor = LbpExtractor::new(LbpParams { radius }).unwrap();
            assert_eq!(extractor.feature_len(), 8 * radius + 2);
        }
    }

    #[test]
    fn test_histogram_normalized() {
        let extractor = LbpExtractor::new(LbpParams::default()).unwrap();
        let img = create_test_image(32, 32);
        let hist = extractor.extract(&img, 32, 32).unwrap();

        assert_eq!(hist.len(), 10);
        assert!(hist.iter().all(|&v| (0.0..=1.0).contains(&v)));
        let sum: f32 = hist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "histogram sum {} not ~1", sum);
    }

    #[test]
    fn test_flat_image_is_all_uniform() {
        // Every neighbor equals the center, so every code is the all-ones
        // pattern: uniform with P set bits.
        let extractor = LbpExtractor::new(LbpParams::default()).unwrap();
        let img = vec![128u8; 16 * 16];
        let hist = extractor.extract(&img, 16, 16).unwrap();
        assert!((hist[8] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_image_data() {
        let extractor = LbpExtractor::new(LbpParams::default()).unwrap();
        let img = vec![0u8; 10];
        let result = extractor.extract(&img, 16, 16);
        assert!(matches!(result, Err(LbpError::InvalidImageData { .. })));
    }

    #[test]
    fn test_uniform_bin_classification() {
        // 00001111 has two transitions: uniform, four set bits
        assert_eq!(uniform_bin(0b0000_1111, 8), 4);
        // alternating bits: eight transitions, non-uniform
        assert_eq!(uniform_bin(0b0101_0101, 8), 9);
        assert_eq!(uniform_bin(0, 8), 0);
        assert_eq!(uniform_bin(0xFF, 8), 8);
    }

    proptest! {
        #[test]
        fn prop_histogram_sums_to_one(seed in 0u64..1000, radius in 1usize..=3) {
            let width = 24;
            let height = 24;
            let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let img: Image = (0..width * height)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state % 256) as u8
                })
                .collect();

            let extractor = LbpExtractor::new(LbpParams { radius }).unwrap();
            let hist = extractor.extract(&img, width, height).unwrap();

            prop_assert_eq!(hist.len(), 8 * radius + 2);
            prop_assert!(hist.iter().all(|&v| v >= 0.0));
            let sum: f32 = hist.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-6);
        }
    }
}
