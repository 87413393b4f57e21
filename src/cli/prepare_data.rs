//! Sample dataset generation
//!
//! Writes an Iris-shaped dataset: four measurements per sample and an
//! integer `target` column with three classes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cli::Result;

pub const FEATURE_COLUMNS: [&str; 4] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];
pub const SAMPLES_PER_CLASS: usize = 50;

/// Per-class measurement centers and spreads
const CLASS_PROFILES: [([f64; 4], [f64; 4]); 3] = [
    ([5.0, 3.4, 1.5, 0.2], [0.35, 0.38, 0.17, 0.1]),
    ([5.9, 2.8, 4.3, 1.3], [0.5, 0.3, 0.47, 0.2]),
    ([6.6, 3.0, 5.6, 2.0], [0.6, 0.32, 0.55, 0.27]),
];

/// Generate the dataset and write it to `output`, returning the row count
pub fn write_dataset(output: &Path, seed: u64) -> Result<usize> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = BufWriter::new(File::create(output)?);

    let header: Vec<String> = FEATURE_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain(std::iter::once("target".to_string()))
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    let mut rows = 0;
    for (target, (centers, spreads)) in CLASS_PROFILES.iter().enumerate() {
        for _ in 0..SAMPLES_PER_CLASS {
            let values: Vec<String> = centers
                .iter()
                .zip(spreads)
                .map(|(center, spread)| {
                    let value: f64 = center + rng.gen_range(-1.5..1.5) * spread;
                    format!("{:.1}", value.max(0.1))
                })
                .collect();
            writeln!(writer, "{},{}", values.join(","), target)?;
            rows += 1;
        }
    }

    writer.flush()?;
    tracing::info!("Dataset saved to {} ({} rows)", output.display(), rows);
    Ok(rows)
}
