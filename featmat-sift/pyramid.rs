use rayon::prelude::*;

/// One octave of the scale space: blurred levels, their pairwise
/// differences, and the blur applied at each level (octave-relative).
pub(crate) struct Octave {
    pub width: usize,
    pub height: usize,
    pub gaussians: Vec<Vec<f32>>,
    pub dogs: Vec<Vec<f32>>,
    pub sigmas: Vec<f32>,
}

/// Builds the Gaussian/DoG scale space. Each octave holds
/// `scales + 3` blurred levels so extrema can be scanned over `scales`
/// interior DoG levels; octaves halve in resolution.
pub(crate) fn build_octaves(
    base: &[f32],
    width: usize,
    height: usize,
    n_octaves: usize,
    scales: usize,
    sigma: f32,
) -> Vec<Octave> {
    let levels = scales + 3;
    let k = 2f32.powf(1.0 / scales as f32);

    let sigmas: Vec<f32> = (0..levels).map(|i| sigma * k.powi(i as i32)).collect();

    // Incremental blur between consecutive levels:
    // sigma_total(i)^2 = sigma_total(i-1)^2 + delta(i)^2
    let deltas: Vec<f32> = (1..levels)
        .map(|i| (sigmas[i] * sigmas[i] - sigmas[i - 1] * sigmas[i - 1]).sqrt())
        .collect();

    let mut octaves = Vec::with_capacity(n_octaves);
    let mut current = gaussian_blur(base, width, height, sigma);
    let mut w = width;
    let mut h = height;

    for _ in 0..n_octaves {
        let mut gaussians = Vec::with_capacity(levels);
        gaussians.push(current.clone());
        for &delta in &deltas {
            let blurred = gaussian_blur(&gaussians[gaussians.len() - 1], w, h, delta);
            gaussians.push(blurred);
        }

        let dogs = gaussians
            .windows(2)
            .map(|pair| {
                pair[1]
                    .iter()
                    .zip(pair[0].iter())
                    .map(|(a, b)| a - b)
                    .collect()
            })
            .collect();

        // The level blurred by 2*sigma seeds the next octave
        let seed = &gaussians[scales];
        let (next, nw, nh) = downsample(seed, w, h);

        octaves.push(Octave {
            width: w,
            height: h,
            gaussians,
            dogs,
            sigmas: sigmas.clone(),
        });

        if nw < 16 || nh < 16 {
            break;
        }
        current = next;
        w = nw;
        h = nh;
    }

    octaves
}

/// Separable Gaussian blur with clamped borders, row-parallel per pass.
pub(crate) fn gaussian_blur(img: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return img.to_vec();
    }

    let radius = (3.0 * sigma).ceil() as i64;
    let kernel = gaussian_kernel(sigma, radius);

    // Horizontal pass
    let mut tmp = vec![0.0f32; width * height];
    tmp.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let xx = (x as i64 + k as i64 - radius).clamp(0, width as i64 - 1) as usize;
                acc += img[y * width + xx] * weight;
            }
            row[x] = acc;
        }
    });

    // Vertical pass
    let mut out = vec![0.0f32; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, &weight) in kernel.iter().enumerate() {
                let yy = (y as i64 + k as i64 - radius).clamp(0, height as i64 - 1) as usize;
                acc += tmp[yy * width + x] * weight;
            }
            row[x] = acc;
        }
    });

    out
}

fn gaussian_kernel(sigma: f32, radius: i64) -> Vec<f32> {
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }
    kernel
}

/// Halves resolution by taking every second pixel.
fn downsample(img: &[f32], width: usize, height: usize) -> (Vec<f32>, usize, usize) {
    let nw = width / 2;
    let nh = height / 2;
    let mut out = vec![0.0f32; nw * nh];
    for y in 0..nh {
        for x in 0..nw {
            out[y * nw + x] = img[(y * 2) * width + x * 2];
        }
    }
    (out, nw, nh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_image(width: usize, height: usize) -> Vec<f32> {
        let mut img = vec![0.0f32; width * height];
        img[(height / 2) * width + width / 2] = 1.0;
        img
    }

    #[test]
    fn test_blur_preserves_mass() {
        let img = impulse_image(33, 33);
        let blurred = gaussian_blur(&img, 33, 33, 1.6);
        let sum: f32 = blurred.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "mass {} after blur", sum);
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let img = impulse_image(33, 33);
        let blurred = gaussian_blur(&img, 33, 33, 1.6);
        let center = blurred[16 * 33 + 16];
        let neighbor = blurred[16 * 33 + 17];
        assert!(center > neighbor);
        assert!(neighbor > 0.0);
    }

    #[test]
    fn test_downsample_halves() {
        let img = vec![0.5f32; 64 * 48];
        let (out, w, h) = downsample(&img, 64, 48);
        assert_eq!((w, h), (32, 24));
        assert_eq!(out.len(), 32 * 24);
    }

    #[test]
    fn test_octave_shapes() {
        let img = vec![0.25f32; 64 * 64];
        let octaves = build_octaves(&img, 64, 64, 3, 3, 1.6);
        assert_eq!(octaves.len(), 3);
        for (i, oct) in octaves.iter().enumerate() {
            assert_eq!(oct.width, 64 >> i);
            assert_eq!(oct.gaussians.len(), 6);
            assert_eq!(oct.dogs.len(), 5);
            assert_eq!(oct.sigmas.len(), 6);
        }
    }

    #[test]
    fn test_octave_count_limited_by_size() {
        let img = vec![0.25f32; 32 * 32];
        // Requesting 8 octaves stops once levels get tiny
        let octaves = build_octaves(&img, 32, 32, 8, 3, 1.6);
        assert!(octaves.len() <= 2);
    }
}
