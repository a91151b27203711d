use std::fs;
use std::path::{Path, PathBuf};

use crate::preprocess::{Preprocess, PreprocessedImage};
use crate::DatasetError;

/// One image dropped from the run, with the reason it was dropped.
/// Partial datasets are acceptable; this record replaces the original
/// print-and-forget diagnostics so callers can inspect the losses.
#[derive(Debug, Clone)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

pub(crate) struct WalkOutput<T> {
    pub items: Vec<T>,
    pub labels: Vec<String>,
    pub skipped: Vec<SkippedImage>,
}

/// Walks `base_path/<class_dir>/<file>` in class order, then sorted
/// filename order, applying preprocess + extract per image. Every
/// per-image failure is logged, recorded and skipped; a class directory
/// that cannot be listed fails the run, since the directory list is part
/// of the caller's contract.
pub(crate) fn walk<T, P, F>(
    class_dirs: &[String],
    base_path: &Path,
    preprocessor: &P,
    mut extract: F,
) -> Result<WalkOutput<T>, DatasetError>
where
    P: Preprocess,
    F: FnMut(&PreprocessedImage) -> Result<T, String>,
{
    let mut items = Vec::new();
    let mut labels = Vec::new();
    let mut skipped = Vec::new();

    for class in class_dirs {
        let dir = base_path.join(class);
        let mut files = list_files(&dir)?;
        files.sort();

        for path in files {
            match process_one(&path, preprocessor, &mut extract) {
                Ok(item) => {
                    items.push(item);
                    labels.push(class.clone());
                }
                Err(reason) => {
                    log::warn!("skipping {}: {}", path.display(), reason);
                    skipped.push(SkippedImage { path, reason });
                }
            }
        }
    }

    Ok(WalkOutput { items, labels, skipped })
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let entries = fs::read_dir(dir).map_err(|source| DatasetError::ClassDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DatasetError::ClassDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn process_one<T, P, F>(path: &Path, preprocessor: &P, extract: &mut F) -> Result<T, String>
where
    P: Preprocess,
    F: FnMut(&PreprocessedImage) -> Result<T, String>,
{
    let img = image::open(path).map_err(|e| format!("load failed: {}", e))?;
    let pre = preprocessor
        .preprocess(img)
        .map_err(|e| format!("preprocess failed: {}", e))?;
    extract(&pre)
}
