/// Row-major 8-bit grayscale image
pub type Image = Vec<u8>;

/// Fixed-length feature vector (one image, one row of the final matrix)
pub type FeatureVector = Vec<f32>;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Descriptor type selector, matching the integer modes of the original
/// dataset tooling: 0 = HOG, 1 = LBP, 2 = SIFT, 3 = ORB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FeatureMethod {
    Hog,
    Lbp,
    Sift,
    Orb,
}

impl FeatureMethod {
    /// True for descriptors that emit a variable number of keypoint rows
    /// per image and need the padding pass before matrix assembly.
    pub fn is_keypoint_based(self) -> bool {
        matches!(self, FeatureMethod::Sift | FeatureMethod::Orb)
    }

    pub fn as_mode(self) -> u8 {
        match self {
            FeatureMethod::Hog => 0,
            FeatureMethod::Lbp => 1,
            FeatureMethod::Sift => 2,
            FeatureMethod::Orb => 3,
        }
    }
}

impl TryFrom<u8> for FeatureMethod {
    type Error = u8;

    fn try_from(mode: u8) -> Result<Self, u8> {
        match mode {
            0 => Ok(FeatureMethod::Hog),
            1 => Ok(FeatureMethod::Lbp),
            2 => Ok(FeatureMethod::Sift),
            3 => Ok(FeatureMethod::Orb),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for FeatureMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeatureMethod::Hog => "hog",
            FeatureMethod::Lbp => "lbp",
            FeatureMethod::Sift => "sift",
            FeatureMethod::Orb => "orb",
        };
        write!(f, "{}", name)
    }
}

/// Per-image collection of fixed-width keypoint descriptor rows, stored
/// flat row-major. An empty set is the explicit "no keypoints detected"
/// case; it is never represented by a null or a sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorSet {
    width: usize,
    data: Vec<f32>,
}

impl DescriptorSet {
    pub fn new(width: usize) -> Self {
        Self { width, data: Vec::new() }
    }

    pub fn with_capacity(width: usize, rows: usize) -> Self {
        Self { width, data: Vec::with_capacity(width * rows) }
    }

    /// Appends one descriptor row. All rows in a set share the same width.
    pub fn push_row(&mut self, row: &[f32]) {
        assert_eq!(row.len(), self.width, "descriptor row width mismatch");
        self.data.extend_from_slice(row);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        if self.width == 0 { 0 } else { self.data.len() / self.width }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    /// Flat row-major view of all descriptor rows.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

/// Default worker count for configs that parallelize per-image work.
pub fn default_thread_count() -> usize {
    num_cpus::get().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for method in [
            FeatureMethod::Hog,
            FeatureMethod::Lbp,
            FeatureMethod::Sift,
            FeatureMethod::Orb,
        ] {
            assert_eq!(FeatureMethod::try_from(method.as_mode()), Ok(method));
        }
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert_eq!(FeatureMethod::try_from(4), Err(4));
        assert_eq!(FeatureMethod::try_from(99), Err(99));
    }

    #[test]
    fn test_keypoint_based() {
        assert!(!FeatureMethod::Hog.is_keypoint_based());
        assert!(!FeatureMethod::Lbp.is_keypoint_based());
        assert!(FeatureMethod::Sift.is_keypoint_based());
        assert!(FeatureMethod::Orb.is_keypoint_based());
    }

    #[test]
    fn test_descriptor_set_rows() {
        let mut set = DescriptorSet::new(4);
        assert!(set.is_empty());
        assert_eq!(set.rows(), 0);

        set.push_row(&[1.0, 2.0, 3.0, 4.0]);
        set.push_row(&[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(set.rows(), 2);
        assert_eq!(set.row(1), &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(set.data().len(), 8);
    }

    #[test]
    #[should_panic(expected = "width mismatch")]
    fn test_descriptor_set_rejects_ragged_row() {
        let mut set = DescriptorSet::new(4);
        set.push_row(&[1.0, 2.0]);
    }
}
