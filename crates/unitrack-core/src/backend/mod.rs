//! Tracking backends.
//!
//! Provides:
//! - `LoggerBackend` trait every destination implements
//! - `ConsoleBackend` for lightweight stdout logging
//! - `HostedMetricsBackend` for the hosted metrics service
//! - `LocalServerBackend` for the on-disk metrics and params store

mod console;
mod hosted;
mod local;

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TrackingError};
use crate::models::Metrics;

pub use console::{format_console_line, ConsoleBackend};
pub use hosted::{HostedClient, HostedMetricsBackend};
pub use local::LocalServerBackend;

/// A destination for metric records.
pub trait LoggerBackend: Send {
    /// Deliver one metric record at `step`.
    fn log(&mut self, data: &Metrics, step: u64) -> Result<()>;
}

/// The supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Console,
    HostedMetrics,
    LocalServer,
}

/// Name kept for configurations written against the old hosted backend name.
pub const DEPRECATED_HOSTED_ALIAS: &str = "tracking";

static DEPRECATED_ALIAS_WARNING: Once = Once::new();

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Console,
        BackendKind::HostedMetrics,
        BackendKind::LocalServer,
    ];

    /// Canonical name accepted by [`BackendKind::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Console => "console",
            BackendKind::HostedMetrics => "wandb",
            BackendKind::LocalServer => "mlflow",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AsRef<str> for BackendKind {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl FromStr for BackendKind {
    type Err = TrackingError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "console" => Ok(BackendKind::Console),
            "wandb" => Ok(BackendKind::HostedMetrics),
            "mlflow" => Ok(BackendKind::LocalServer),
            DEPRECATED_HOSTED_ALIAS => {
                DEPRECATED_ALIAS_WARNING.call_once(|| {
                    warn!("`tracking` logger is deprecated. use `wandb` instead.");
                });
                Ok(BackendKind::HostedMetrics)
            }
            other => Err(TrackingError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// The backends requested for a run, as a single name or an ordered list.
///
/// Names are kept unparsed until [`BackendSelection::resolve`], so an
/// unsupported name surfaces as an error from the dispatcher's constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSelection(Vec<String>);

impl BackendSelection {
    /// Parse every requested name, then drop repeats keeping first-request order.
    pub fn resolve(&self) -> Result<Vec<BackendKind>> {
        let parsed = self
            .0
            .iter()
            .map(|name| name.parse::<BackendKind>())
            .collect::<Result<Vec<_>>>()?;

        let mut kinds = Vec::with_capacity(parsed.len());
        for kind in parsed {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl Default for BackendSelection {
    fn default() -> Self {
        BackendSelection(vec![BackendKind::Console.name().to_string()])
    }
}

impl From<&str> for BackendSelection {
    fn from(name: &str) -> Self {
        BackendSelection(vec![name.to_string()])
    }
}

impl From<String> for BackendSelection {
    fn from(name: String) -> Self {
        BackendSelection(vec![name])
    }
}

impl From<BackendKind> for BackendSelection {
    fn from(kind: BackendKind) -> Self {
        BackendSelection(vec![kind.name().to_string()])
    }
}

impl<S: AsRef<str>> From<Vec<S>> for BackendSelection {
    fn from(names: Vec<S>) -> Self {
        BackendSelection(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>> From<&[S]> for BackendSelection {
    fn from(names: &[S]) -> Self {
        BackendSelection(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for BackendSelection {
    fn from(names: [S; N]) -> Self {
        BackendSelection(names.iter().map(|n| n.as_ref().to_string()).collect())
    }
}
