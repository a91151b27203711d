use std::fs;
use std::path::PathBuf;

use featmat_dataset::{
    run_extraction, run_extraction_mode, DatasetError, ExtractionConfig, FeatureMethod,
};
use featmat_hog::HogExtractor;
use image::GrayImage;

/// Builds a two-class dataset on disk: one class of concentric rings, one
/// of stripes, plus one file that is not an image at all.
struct TestDataset {
    root: PathBuf,
    classes: Vec<String>,
    good_images: usize,
}

impl TestDataset {
    fn create(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "featmat_pipeline_{}_{}",
            tag,
            std::process::id()
        ));
        if root.exists() {
            fs::remove_dir_all(&root).unwrap();
        }

        let classes = vec!["rings".to_string(), "stripes".to_string()];
        let per_class = 3;

        let rings_dir = root.join("rings");
        fs::create_dir_all(&rings_dir).unwrap();
        for i in 0..per_class {
            ring_image(64, 6 + i * 4)
                .save(rings_dir.join(format!("img_{}.png", i)))
                .unwrap();
        }

        let stripes_dir = root.join("stripes");
        fs::create_dir_all(&stripes_dir).unwrap();
        for i in 0..per_class {
            stripe_image(64, 4 + i * 2)
                .save(stripes_dir.join(format!("img_{}.png", i)))
                .unwrap();
        }

        // Not decodable as any image format
        fs::write(stripes_dir.join("broken.png"), b"this is not a png").unwrap();

        Self {
            root,
            classes,
            good_images: (per_class * 2) as usize,
        }
    }
}

impl Drop for TestDataset {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn ring_image(size: u32, ring_spacing: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - size as f32 / 2.0;
        let dy = y as f32 - size as f32 / 2.0;
        let dist = (dx * dx + dy * dy).sqrt() as u32;
        if (dist / ring_spacing) % 2 == 0 {
            image::Luma([230])
        } else {
            image::Luma([30])
        }
    })
}

fn stripe_image(size: u32, stripe_width: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, _| {
        if (x / stripe_width) % 2 == 0 {
            image::Luma([220])
        } else {
            image::Luma([40])
        }
    })
}

#[test]
fn test_lbp_run_counts_and_labels() {
    let dataset = TestDataset::create("lbp");
    let config = ExtractionConfig::default();

    let out = run_extraction(FeatureMethod::Lbp, &dataset.classes, &dataset.root, &config)
        .unwrap();

    // The broken file is skipped, every real image produces a row
    assert_eq!(out.features.rows(), dataset.good_images);
    assert_eq!(out.labels.len(), dataset.good_images);
    assert_eq!(out.skipped.len(), 1);
    assert!(out.skipped[0].path.ends_with("broken.png"));

    // Class order first, sorted filenames within each class
    assert_eq!(
        out.labels,
        vec!["rings", "rings", "rings", "stripes", "stripes", "stripes"]
    );

    // Default radius 1 gives 10-bin histograms
    assert_eq!(out.features.cols(), 10);
    for i in 0..out.features.rows() {
        let sum: f32 = out.features.row(i).iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "row {} sum {}", i, sum);
    }
}

#[test]
fn test_hog_column_count_matches_extractor() {
    let dataset = TestDataset::create("hog");
    let config = ExtractionConfig::default();

    let out = run_extraction(FeatureMethod::Hog, &dataset.classes, &dataset.root, &config)
        .unwrap();

    let extractor =
        HogExtractor::new(config.hog.clone(), config.image_width, config.image_height).unwrap();
    assert_eq!(out.features.rows(), dataset.good_images);
    assert_eq!(out.features.cols(), extractor.feature_len());
}

#[test]
fn test_orb_columns_are_descriptor_multiples() {
    let dataset = TestDataset::create("orb");
    let config = ExtractionConfig::default();

    let out = run_extraction(FeatureMethod::Orb, &dataset.classes, &dataset.root, &config)
        .unwrap();

    // Every matrix row is a whole number of 32-wide descriptor slots
    assert_eq!(out.features.cols() % featmat_orb::DESCRIPTOR_WIDTH, 0);
    assert_eq!(out.features.rows() + out.skipped.len(), dataset.good_images + 1);
    assert_eq!(out.features.rows(), out.labels.len());
}

#[test]
fn test_sift_rows_align_with_labels() {
    let dataset = TestDataset::create("sift");
    let config = ExtractionConfig::default();

    let out = run_extraction(FeatureMethod::Sift, &dataset.classes, &dataset.root, &config)
        .unwrap();

    assert_eq!(out.features.cols() % featmat_sift::DESCRIPTOR_WIDTH, 0);
    assert_eq!(out.features.rows(), out.labels.len());
    assert_eq!(out.features.rows() + out.skipped.len(), dataset.good_images + 1);
}

#[test]
fn test_mode_dispatch() {
    let dataset = TestDataset::create("mode");
    let config = ExtractionConfig::default();

    // Mode 1 is LBP
    let out = run_extraction_mode(1, &dataset.classes, &dataset.root, &config).unwrap();
    assert_eq!(out.features.cols(), 10);

    let result = run_extraction_mode(42, &dataset.classes, &dataset.root, &config);
    assert!(matches!(result, Err(DatasetError::InvalidMode(42))));
}
