//! Example of tracking a run on the console and the local server from Rust.

use std::collections::HashMap;
use std::path::PathBuf;

use unitrack_core::{ConfigValue, MetricValue, Tracking, TrackingSettings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Describe the run configuration
    let config = ConfigValue::mapping([
        (
            "model",
            ConfigValue::mapping([
                ("hidden", ConfigValue::sequence([256, 128])),
                ("activation", ConfigValue::enumeration("Relu", "relu")),
            ]),
        ),
        ("lr", ConfigValue::from(3e-4)),
        ("output_dir", ConfigValue::from(PathBuf::from("./checkpoints"))),
    ]);

    // 2. Start the run on both backends; params land in ./experiments/demo/sine/<run>/params.yaml
    let settings = TrackingSettings::default().with_local_dir("./experiments");
    let mut tracking = Tracking::new("demo", "sine", vec!["console", "mlflow"], Some(&config), &settings)?;

    // 3. Log metrics
    for i in 0..50u64 {
        let mut metrics = HashMap::new();
        metrics.insert("sine".to_string(), MetricValue::Float((i as f64 * 0.1).sin()));
        metrics.insert("cosine".to_string(), MetricValue::Float((i as f64 * 0.1).cos()));
        tracking.log(&metrics, i, None)?;
    }

    // 4. Dropping the tracker marks the local run finished
    Ok(())
}
