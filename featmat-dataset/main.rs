use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use featmat_core::init_thread_pool;
use featmat_dataset::{run_extraction_mode, DatasetError, ExtractionConfig, ExtractionOutput};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: featmat <mode> <dataset_dir> [out_prefix]");
        eprintln!("  mode: 0 = HOG, 1 = LBP, 2 = SIFT, 3 = ORB");
        eprintln!("  dataset_dir: directory with one subdirectory per class");
        eprintln!("  out_prefix: if given, writes <prefix>_features.csv and <prefix>_labels.csv");
        std::process::exit(2);
    }

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mode: u8 = args[1]
        .parse()
        .map_err(|_| format!("mode must be an integer 0-3, got '{}'", args[1]))?;
    let base_path = Path::new(&args[2]);
    let out_prefix = args.get(3);

    let classes = discover_classes(base_path)?;
    if classes.is_empty() {
        return Err(format!("no class subdirectories found in {}", base_path.display()).into());
    }

    let config = ExtractionConfig::default();
    if init_thread_pool(config.n_threads).is_err() {
        log::warn!("global thread pool already initialized, keeping existing size");
    }
    println!("{}", config.summary());
    println!("Classes: {}", classes.join(", "));

    let t0 = Instant::now();
    let output = run_extraction_mode(mode, &classes, base_path, &config)?;
    let elapsed = t0.elapsed();

    println!("Time taken: {:.2?}", elapsed);
    println!(
        "Feature matrix: {} x {} ({} labels, {} skipped)",
        output.features.rows(),
        output.features.cols(),
        output.labels.len(),
        output.skipped.len()
    );
    for skip in &output.skipped {
        println!("  skipped {}: {}", skip.path.display(), skip.reason);
    }

    if let Some(prefix) = out_prefix {
        write_csv(prefix, &output)?;
    }
    Ok(())
}

/// Class labels are the sorted names of the dataset's immediate
/// subdirectories.
fn discover_classes(base_path: &Path) -> Result<Vec<String>, DatasetError> {
    let entries = fs::read_dir(base_path).map_err(|source| DatasetError::ClassDir {
        path: base_path.to_path_buf(),
        source,
    })?;

    let mut classes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DatasetError::ClassDir {
            path: base_path.to_path_buf(),
            source,
        })?;
        if entry.path().is_dir() {
            if let Ok(name) = entry.file_name().into_string() {
                classes.push(name);
            }
        }
    }
    classes.sort();
    Ok(classes)
}

fn write_csv(prefix: &str, output: &ExtractionOutput) -> std::io::Result<()> {
    let features_path = PathBuf::from(format!("{}_features.csv", prefix));
    let labels_path = PathBuf::from(format!("{}_labels.csv", prefix));

    let mut f = std::io::BufWriter::new(fs::File::create(&features_path)?);
    for i in 0..output.features.rows() {
        let row = output.features.row(i);
        for (j, v) in row.iter().enumerate() {
            if j > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        writeln!(f)?;
    }
    f.flush()?;

    let mut f = std::io::BufWriter::new(fs::File::create(&labels_path)?);
    for label in &output.labels {
        writeln!(f, "{}", label)?;
    }
    f.flush()?;

    println!(
        "Saved {} and {}",
        features_path.display(),
        labels_path.display()
    );
    Ok(())
}
