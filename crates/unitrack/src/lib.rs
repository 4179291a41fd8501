//! unitrack: emit metrics and run parameters to console, hosted and local
//! tracking backends through one facade.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use unitrack::{BackendKind, ConfigValue, MetricValue, Tracking, TrackingSettings};
//!
//! let config = ConfigValue::mapping([("lr", ConfigValue::from(0.001))]);
//! let mut tracking = Tracking::new(
//!     "resnet",
//!     "baseline",
//!     vec!["console", "mlflow"],
//!     Some(&config),
//!     &TrackingSettings::from_env(),
//! )?;
//!
//! let mut metrics = HashMap::new();
//! metrics.insert("loss".to_string(), MetricValue::from(0.42));
//! tracking.log(&metrics, 1, None)?;
//! tracking.log(&metrics, 2, Some(&[BackendKind::Console][..]))?;
//! # Ok::<(), unitrack::TrackingError>(())
//! ```

pub use unitrack_core::*;
