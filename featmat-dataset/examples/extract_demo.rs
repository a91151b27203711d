//! Extracts LBP features from a generated two-class dataset and prints
//! the resulting matrix shape.
//!
//! Run with: cargo run --example extract_demo

use std::fs;

use featmat_dataset::{run_extraction, ExtractionConfig, FeatureMethod};
use image::GrayImage;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let root = std::env::temp_dir().join("featmat_demo_dataset");
    if root.exists() {
        fs::remove_dir_all(&root)?;
    }

    for (class, period) in [("coarse", 8u32), ("fine", 3u32)] {
        let dir = root.join(class);
        fs::create_dir_all(&dir)?;
        for i in 0..4u32 {
            let img = GrayImage::from_fn(96, 96, |x, y| {
                if ((x + i) / period + y / period) % 2 == 0 {
                    image::Luma([210])
                } else {
                    image::Luma([45])
                }
            });
            img.save(dir.join(format!("sample_{}.png", i)))?;
        }
    }

    let classes = vec!["coarse".to_string(), "fine".to_string()];
    let config = ExtractionConfig::default();
    println!("{}", config.summary());

    let out = run_extraction(FeatureMethod::Lbp, &classes, &root, &config)?;
    println!(
        "Extracted {} x {} feature matrix, {} skipped",
        out.features.rows(),
        out.features.cols(),
        out.skipped.len()
    );
    for (i, label) in out.labels.iter().enumerate() {
        let first: Vec<String> = out.features.row(i)[..4]
            .iter()
            .map(|v| format!("{:.3}", v))
            .collect();
        println!("  [{}] {}: {} ...", i, label, first.join(" "));
    }

    fs::remove_dir_all(&root)?;
    Ok(())
}
