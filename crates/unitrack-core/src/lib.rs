//! unitrack-core: a single facade over console, hosted and local experiment
//! tracking backends.
//!
//! [`Tracking`] starts a run on every requested backend and fans each `log`
//! call out to them. [`normalize`] flattens nested run configurations into the
//! `/`-joined parameter mappings parameter-logging backends expect.

pub mod backend;
pub mod error;
pub mod models;
pub mod params;
pub mod settings;
pub mod storage;
pub mod tracking;

pub use backend::{BackendKind, BackendSelection, LoggerBackend};
pub use error::TrackingError;
pub use models::{MetricValue, Metrics, RunIdentity, RunStatus};
pub use params::{normalize, normalize_with, ConfigValue, NormalizeOptions, Params, ToConfigValue};
pub use settings::{HostedCredentials, LocalServerSettings, TrackingSettings};
pub use tracking::Tracking;
