//! Data models shared by the dispatcher and the backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies one tracking run. Both parts are passed through to the backends
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Project the run belongs to (e.g. "resnet_cifar10")
    pub project: String,
    /// Name of this experiment within the project
    pub experiment: String,
}

impl RunIdentity {
    pub fn new(project: impl Into<String>, experiment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            experiment: experiment.into(),
        }
    }
}

/// A single metric value: float, int, bool or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value. Booleans and text are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(f) => Some(*f),
            MetricValue::Int(i) => Some(*i as f64),
            MetricValue::Bool(_) | MetricValue::Text(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}
impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(v as f64)
    }
}
impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}
impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int(v as i64)
    }
}
impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Int(v as i64)
    }
}
impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}
impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}
impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

/// One metric record: metric name to value. Paired with a step on every call.
pub type Metrics = HashMap<String, MetricValue>;

/// A row of metrics as stored by the local server backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub step: u64,
    pub timestamp: DateTime<Utc>,
    pub values: Metrics,
}

impl MetricRow {
    pub fn new(values: Metrics, step: u64) -> Self {
        Self {
            step,
            timestamp: Utc::now(),
            values,
        }
    }
}

/// Status of a local run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Finished,
    Crashed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "RUNNING"),
            RunStatus::Finished => write!(f, "FINISHED"),
            RunStatus::Crashed => write!(f, "CRASHED"),
        }
    }
}

/// Metadata stored alongside a local run (`run.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub project: String,
    pub experiment: String,
    /// Directory name of this run under the experiment (e.g. "20260301_142530").
    #[serde(default)]
    pub run_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    /// Number of `log` calls recorded so far.
    #[serde(default)]
    pub steps_logged: u64,
}

impl RunMetadata {
    pub fn started(identity: &RunIdentity, run_name: impl Into<String>) -> Self {
        Self {
            project: identity.project.clone(),
            experiment: identity.experiment.clone(),
            run_name: run_name.into(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            duration_secs: None,
            steps_logged: 0,
        }
    }

    pub fn finish(&mut self, status: RunStatus) {
        let finished_at = Utc::now();
        self.status = status;
        self.duration_secs =
            Some((finished_at - self.started_at).num_milliseconds() as f64 / 1000.0);
        self.finished_at = Some(finished_at);
    }
}
