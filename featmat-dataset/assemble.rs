use featmat_core::{DescriptorSet, FeatureVector};

#[derive(Debug, Clone)]
pub enum AssembleError {
    RaggedRows { row: usize, expected_len: usize, actual_len: usize },
    WidthMismatch { set: usize, expected_width: usize, actual_width: usize },
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssembleError::RaggedRows { row, expected_len, actual_len } => {
                write!(f, "Feature row {} has length {}, expected {}", row, actual_len, expected_len)
            }
            AssembleError::WidthMismatch { set, expected_width, actual_width } => {
                write!(
                    f,
                    "Descriptor set {} has width {}, expected {}",
                    set, actual_width, expected_width
                )
            }
        }
    }
}

impl std::error::Error for AssembleError {}

/// Dense row-major feature matrix; one row per successfully processed
/// image, aligned with the label vector the walker produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Stacks fixed-length feature vectors (HOG, LBP). All rows must
    /// share one length; a ragged input is a run-level error, not a
    /// per-image skip.
    pub fn from_feature_rows(rows: Vec<FeatureVector>) -> Result<Self, AssembleError> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(AssembleError::RaggedRows {
                    row: i,
                    expected_len: cols,
                    actual_len: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), cols, data })
    }

    /// Reconciles variable-count descriptor sets (SIFT, ORB) into a
    /// uniform matrix. Phase one finds the dataset-wide maximum row
    /// count; phase two pads every set with zero rows up to that count
    /// and flattens each image's block row-major into one matrix row.
    /// A padded zero row is indistinguishable from a real zero
    /// descriptor; that loss is the intended trade-off.
    pub fn from_descriptor_sets(sets: &[DescriptorSet]) -> Result<Self, AssembleError> {
        let Some(first) = sets.first() else {
            return Ok(Self { rows: 0, cols: 0, data: Vec::new() });
        };

        let width = first.width();
        let mut max_rows = 0;
        for (i, set) in sets.iter().enumerate() {
            if set.width() != width {
                return Err(AssembleError::WidthMismatch {
                    set: i,
                    expected_width: width,
                    actual_width: set.width(),
                });
            }
            max_rows = max_rows.max(set.rows());
        }

        let cols = max_rows * width;
        let mut data = Vec::with_capacity(sets.len() * cols);
        for set in sets {
            data.extend_from_slice(set.data());
            data.resize(data.len() + (max_rows - set.rows()) * width, 0.0);
        }

        Ok(Self { rows: sets.len(), cols, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set_with_rows(width: usize, rows: usize, fill: f32) -> DescriptorSet {
        let mut set = DescriptorSet::new(width);
        let row: Vec<f32> = vec![fill; width];
        for _ in 0..rows {
            set.push_row(&row);
        }
        set
    }

    #[test]
    fn test_dense_rows() {
        let matrix = FeatureMatrix::from_feature_rows(vec![
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
        ])
        .unwrap();
        assert_eq!((matrix.rows(), matrix.cols()), (3, 2));
        assert_eq!(matrix.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_dense_ragged_rejected() {
        let result = FeatureMatrix::from_feature_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(AssembleError::RaggedRows { row: 1, .. })));
    }

    #[test]
    fn test_dense_empty() {
        let matrix = FeatureMatrix::from_feature_rows(Vec::new()).unwrap();
        assert_eq!((matrix.rows(), matrix.cols()), (0, 0));
    }

    #[test]
    fn test_padding_shape() {
        // Row counts [3, 5, 2] at width 4 must give shape (3, 20)
        let sets = vec![
            set_with_rows(4, 3, 1.0),
            set_with_rows(4, 5, 2.0),
            set_with_rows(4, 2, 3.0),
        ];
        let matrix = FeatureMatrix::from_descriptor_sets(&sets).unwrap();
        assert_eq!((matrix.rows(), matrix.cols()), (3, 20));

        // Trailing zero blocks where the real rows run out
        assert!(matrix.row(0)[12..].iter().all(|&v| v == 0.0));
        assert!(matrix.row(0)[..12].iter().all(|&v| v == 1.0));
        assert!(matrix.row(1).iter().all(|&v| v == 2.0));
        assert!(matrix.row(2)[8..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let sets = vec![set_with_rows(4, 2, 1.0), set_with_rows(8, 2, 1.0)];
        let result = FeatureMatrix::from_descriptor_sets(&sets);
        assert!(matches!(result, Err(AssembleError::WidthMismatch { set: 1, .. })));
    }

    #[test]
    fn test_no_sets() {
        let matrix = FeatureMatrix::from_descriptor_sets(&[]).unwrap();
        assert_eq!((matrix.rows(), matrix.cols()), (0, 0));
    }

    proptest! {
        #[test]
        fn prop_padded_shape(counts in proptest::collection::vec(0usize..12, 1..8), width in 1usize..16) {
            let sets: Vec<DescriptorSet> = counts
                .iter()
                .map(|&n| set_with_rows(width, n, 1.0))
                .collect();
            let matrix = FeatureMatrix::from_descriptor_sets(&sets).unwrap();
            let max_rows = counts.iter().copied().max().unwrap_or(0);

            prop_assert_eq!(matrix.rows(), counts.len());
            prop_assert_eq!(matrix.cols(), max_rows * width);

            // Each row: real descriptors then zero padding
            for (i, &n) in counts.iter().enumerate() {
                let row = matrix.row(i);
                prop_assert!(row[..n * width].iter().all(|&v| v == 1.0));
                prop_assert!(row[n * width..].iter().all(|&v| v == 0.0));
            }
        }
    }
}
