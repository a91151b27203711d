use std::f32::consts::PI;

pub(crate) const DESCRIPTOR_CELLS: usize = 4;
pub(crate) const ORIENTATION_BINS: usize = 8;
pub(crate) const DESCRIPTOR_LEN: usize =
    DESCRIPTOR_CELLS * DESCRIPTOR_CELLS * ORIENTATION_BINS;

const PEAK_CLAMP: f32 = 0.2;

/// Gradient at an interior pixel via central differences.
#[inline]
fn gradient(img: &[f32], width: usize, x: usize, y: usize) -> (f32, f32) {
    let gx = img[y * width + x + 1] - img[y * width + x - 1];
    let gy = img[(y + 1) * width + x] - img[(y - 1) * width + x];
    (gx, gy)
}

/// Dominant gradient orientation around (x, y): a 36-bin histogram of
/// Gaussian-weighted gradient angles, peak bin wins.
pub(crate) fn dominant_orientation(
    img: &[f32],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    scale_sigma: f32,
) -> Option<f32> {
    const BINS: usize = 36;
    let sigma = 1.5 * scale_sigma;
    let radius = (3.0 * sigma).round().max(1.0) as i64;
    let denom = 2.0 * sigma * sigma;

    let mut hist = [0.0f32; BINS];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let xx = x as i64 + dx;
            let yy = y as i64 + dy;
            if xx < 1 || yy < 1 || xx >= width as i64 - 1 || yy >= height as i64 - 1 {
                continue;
            }
            let (gx, gy) = gradient(img, width, xx as usize, yy as usize);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag == 0.0 {
                continue;
            }
            let weight = (-((dx * dx + dy * dy) as f32) / denom).exp();
            let angle = gy.atan2(gx).rem_euclid(2.0 * PI);
            let bin = ((angle / (2.0 * PI)) * BINS as f32) as usize % BINS;
            hist[bin] += weight * mag;
        }
    }

    let (peak_bin, &peak) = hist
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if peak <= 0.0 {
        return None;
    }

    Some((peak_bin as f32 + 0.5) / BINS as f32 * 2.0 * PI)
}

/// 4x4x8 gradient histogram descriptor in the keypoint's rotated frame,
/// normalized, peak-clamped at 0.2 and renormalized.
pub(crate) fn compute_descriptor(
    img: &[f32],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    angle: f32,
    scale_sigma: f32,
) -> Option<[f32; DESCRIPTOR_LEN]> {
    let d = DESCRIPTOR_CELLS as f32;
    let cell_size = (3.0 * scale_sigma).max(1.0);
    let radius = (cell_size * (d + 1.0) * std::f32::consts::SQRT_2 * 0.5).round() as i64;

    let (sin_a, cos_a) = angle.sin_cos();
    let gauss_denom = 2.0 * (0.5 * d) * (0.5 * d);

    let mut hist = [0.0f32; DESCRIPTOR_LEN];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let xx = x as i64 + dx;
            let yy = y as i64 + dy;
            if xx < 1 || yy < 1 || xx >= width as i64 - 1 || yy >= height as i64 - 1 {
                continue;
            }

            // Offsets rotated into the keypoint frame, in cell units
            let xr = (cos_a * dx as f32 + sin_a * dy as f32) / cell_size;
            let yr = (-sin_a * dx as f32 + cos_a * dy as f32) / cell_size;

            let col = xr + d / 2.0 - 0.5;
            let row = yr + d / 2.0 - 0.5;
            if !(-0.5..d - 0.5).contains(&col) || !(-0.5..d - 0.5).contains(&row) {
                continue;
            }

            let (gx, gy) = gradient(img, width, xx as usize, yy as usize);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag == 0.0 {
                continue;
            }

            let weight = (-(xr * xr + yr * yr) / gauss_denom).exp();
            let theta = (gy.atan2(gx) - angle).rem_euclid(2.0 * PI);

            // Nearest spatial cell, linear split between orientation bins
            let ci = col.round().clamp(0.0, d - 1.0) as usize;
            let ri = row.round().clamp(0.0, d - 1.0) as usize;
            let obin_f = theta / (2.0 * PI) * ORIENTATION_BINS as f32;
            let o0 = obin_f.floor() as usize % ORIENTATION_BINS;
            let o1 = (o0 + 1) % ORIENTATION_BINS;
            let frac = obin_f - obin_f.floor();

            let base = (ri * DESCRIPTOR_CELLS + ci) * ORIENTATION_BINS;
            hist[base + o0] += weight * mag * (1.0 - frac);
            hist[base + o1] += weight * mag * frac;
        }
    }

    let norm: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm < 1e-6 {
        return None;
    }
    for v in hist.iter_mut() {
        *v = (*v / norm).min(PEAK_CLAMP);
    }
    let norm: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm < 1e-6 {
        return None;
    }
    for v in hist.iter_mut() {
        *v /= norm;
    }

    Some(hist)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vertical step edge: strong horizontal gradient everywhere on the
    /// boundary column.
    fn step_image(width: usize, height: usize) -> Vec<f32> {
        let mut img = vec![0.0f32; width * height];
        for y in 0..height {
            for x in width / 2..width {
                img[y * width + x] = 1.0;
            }
        }
        img
    }

    #[test]
    fn test_orientation_of_step_edge() {
        let img = step_image(32, 32);
        let angle = dominant_orientation(&img, 32, 32, 16, 16, 1.6).unwrap();
        // Gradient points in +x: angle near 0 (or wrapped near 2*pi)
        let wrapped = angle.min((2.0 * PI - angle).abs());
        assert!(wrapped < 0.3, "angle {} not near 0", angle);
    }

    #[test]
    fn test_orientation_none_on_flat() {
        let img = vec![0.5f32; 32 * 32];
        assert!(dominant_orientation(&img, 32, 32, 16, 16, 1.6).is_none());
    }

    #[test]
    fn test_descriptor_unit_norm() {
        let img = step_image(48, 48);
        let desc = compute_descriptor(&img, 48, 48, 24, 24, 0.0, 1.6).unwrap();
        let norm: f32 = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(desc.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_descriptor_none_on_flat() {
        let img = vec![0.5f32; 48 * 48];
        assert!(compute_descriptor(&img, 48, 48, 24, 24, 0.0, 1.6).is_none());
    }

    #[test]
    fn test_descriptor_rotation_steers_bins() {
        // The same edge described at two orientations distributes energy
        // into different orientation bins
        let img = step_image(48, 48);
        let d0 = compute_descriptor(&img, 48, 48, 24, 24, 0.0, 1.6).unwrap();
        let d1 = compute_descriptor(&img, 48, 48, 24, 24, PI / 2.0, 1.6).unwrap();
        assert_ne!(d0, d1);
    }
}
