//! Dataset-level feature extraction: walks class directories, runs one of
//! the four extractors over every image, and assembles the results into a
//! dense feature matrix aligned with a label vector.

use std::path::Path;

pub mod assemble;
pub mod config;
pub mod preprocess;
mod walker;

pub use assemble::{AssembleError, FeatureMatrix};
pub use config::ExtractionConfig;
pub use preprocess::{Preprocess, PreprocessError, PreprocessedImage, StandardPreprocess};
pub use walker::SkippedImage;

pub use featmat_core::{DescriptorSet, FeatureMethod, FeatureVector, Image};

use featmat_hog::{HogError, HogExtractor};
use featmat_lbp::{LbpError, LbpExtractor};
use featmat_orb::{OrbError, OrbExtractor};
use featmat_sift::{SiftError, SiftExtractor};

#[derive(Debug)]
pub enum DatasetError {
    /// Integer mode with no corresponding extraction method.
    InvalidMode(u8),
    /// A class directory could not be listed.
    ClassDir { path: std::path::PathBuf, source: std::io::Error },
    Hog(HogError),
    Lbp(LbpError),
    Sift(SiftError),
    Orb(OrbError),
    Assemble(AssembleError),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::InvalidMode(mode) => {
                write!(f, "Invalid feature mode: {} (expected 0-3)", mode)
            }
            DatasetError::ClassDir { path, source } => {
                write!(f, "Cannot read class directory {}: {}", path.display(), source)
            }
            DatasetError::Hog(e) => write!(f, "HOG error: {}", e),
            DatasetError::Lbp(e) => write!(f, "LBP error: {}", e),
            DatasetError::Sift(e) => write!(f, "SIFT error: {}", e),
            DatasetError::Orb(e) => write!(f, "ORB error: {}", e),
            DatasetError::Assemble(e) => write!(f, "Matrix assembly error: {}", e),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::ClassDir { source, .. } => Some(source),
            DatasetError::Hog(e) => Some(e),
            DatasetError::Lbp(e) => Some(e),
            DatasetError::Sift(e) => Some(e),
            DatasetError::Orb(e) => Some(e),
            DatasetError::Assemble(e) => Some(e),
            DatasetError::InvalidMode(_) => None,
        }
    }
}

impl From<HogError> for DatasetError {
    fn from(e: HogError) -> Self {
        DatasetError::Hog(e)
    }
}

impl From<LbpError> for DatasetError {
    fn from(e: LbpError) -> Self {
        DatasetError::Lbp(e)
    }
}

impl From<SiftError> for DatasetError {
    fn from(e: SiftError) -> Self {
        DatasetError::Sift(e)
    }
}

impl From<OrbError> for DatasetError {
    fn from(e: OrbError) -> Self {
        DatasetError::Orb(e)
    }
}

impl From<AssembleError> for DatasetError {
    fn from(e: AssembleError) -> Self {
        DatasetError::Assemble(e)
    }
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Result of one extraction run. `labels[i]` is the class directory name
/// that produced `features.row(i)`; `skipped` lists the images that were
/// dropped along the way.
#[derive(Debug)]
pub struct ExtractionOutput {
    pub features: FeatureMatrix,
    pub labels: Vec<String>,
    pub skipped: Vec<SkippedImage>,
}

/// Runs one extraction method over `base_path/<class>/` for every class in
/// `class_dirs`, in the given class order and sorted filename order within
/// each class.
pub fn run_extraction(
    method: FeatureMethod,
    class_dirs: &[String],
    base_path: &Path,
    config: &ExtractionConfig,
) -> DatasetResult<ExtractionOutput> {
    config.validate()?;
    let pre = StandardPreprocess::new(config.image_width, config.image_height);
    log::info!("extracting {} features from {} classes", method, class_dirs.len());

    match method {
        FeatureMethod::Hog => {
            let extractor =
                HogExtractor::new(config.hog.clone(), config.image_width, config.image_height)?;
            let out = walker::walk(class_dirs, base_path, &pre, |img| {
                extractor.extract(&img.pixels).map_err(|e| e.to_string())
            })?;
            Ok(ExtractionOutput {
                features: FeatureMatrix::from_feature_rows(out.items)?,
                labels: out.labels,
                skipped: out.skipped,
            })
        }
        FeatureMethod::Lbp => {
            let extractor = LbpExtractor::new(config.lbp.clone())?;
            let out = walker::walk(class_dirs, base_path, &pre, |img| {
                extractor
                    .extract(&img.pixels, img.width, img.height)
                    .map_err(|e| e.to_string())
            })?;
            Ok(ExtractionOutput {
                features: FeatureMatrix::from_feature_rows(out.items)?,
                labels: out.labels,
                skipped: out.skipped,
            })
        }
        FeatureMethod::Sift => {
            let extractor = SiftExtractor::new(config.sift.clone())?;
            let out = walker::walk(class_dirs, base_path, &pre, |img| {
                keypoint_rows(
                    extractor
                        .extract(&img.pixels, img.width, img.height)
                        .map_err(|e| e.to_string())?,
                )
            })?;
            Ok(ExtractionOutput {
                features: FeatureMatrix::from_descriptor_sets(&out.items)?,
                labels: out.labels,
                skipped: out.skipped,
            })
        }
        FeatureMethod::Orb => {
            let extractor =
                OrbExtractor::new(config.orb.clone(), config.image_width, config.image_height)?;
            let out = walker::walk(class_dirs, base_path, &pre, |img| {
                keypoint_rows(extractor.extract(&img.pixels).map_err(|e| e.to_string())?)
            })?;
            Ok(ExtractionOutput {
                features: FeatureMatrix::from_descriptor_sets(&out.items)?,
                labels: out.labels,
                skipped: out.skipped,
            })
        }
    }
}

/// Integer-mode entry point: 0 = HOG, 1 = LBP, 2 = SIFT, 3 = ORB. Any
/// other value is rejected up front instead of silently producing nothing.
pub fn run_extraction_mode(
    mode: u8,
    class_dirs: &[String],
    base_path: &Path,
    config: &ExtractionConfig,
) -> DatasetResult<ExtractionOutput> {
    let method = FeatureMethod::try_from(mode).map_err(DatasetError::InvalidMode)?;
    run_extraction(method, class_dirs, base_path, config)
}

/// An image where detection found no keypoints carries no information for
/// the matrix; treat it like any other skippable image.
fn keypoint_rows(set: DescriptorSet) -> Result<DescriptorSet, String> {
    if set.is_empty() {
        Err("no keypoints detected".to_string())
    } else {
        Ok(set)
    }
}
