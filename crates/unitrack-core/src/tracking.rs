//! Unified tracking facade: one `log` call fans out to every configured backend.

use tracing::info;

use crate::backend::{
    BackendKind, BackendSelection, ConsoleBackend, HostedMetricsBackend, LocalServerBackend,
    LoggerBackend,
};
use crate::error::Result;
use crate::models::{Metrics, RunIdentity};
use crate::params::ConfigValue;
use crate::settings::TrackingSettings;

/// The backends of one run, in the order they were requested.
///
/// Built once; no backend is added or removed afterwards.
pub struct Tracking {
    identity: RunIdentity,
    backends: Vec<(BackendKind, Box<dyn LoggerBackend>)>,
}

impl Tracking {
    /// Start a run on every requested backend.
    ///
    /// All names are checked before anything is initialized; an unsupported
    /// name fails with [`crate::TrackingError::UnsupportedBackend`]. The
    /// deprecated `tracking` alias starts the hosted backend. If a backend
    /// fails to start, the ones started before it are dropped.
    pub fn new(
        project: impl Into<String>,
        experiment: impl Into<String>,
        backends: impl Into<BackendSelection>,
        config: Option<&ConfigValue>,
        settings: &TrackingSettings,
    ) -> Result<Self> {
        let identity = RunIdentity::new(project, experiment);
        let kinds = backends.into().resolve()?;

        let mut started: Vec<(BackendKind, Box<dyn LoggerBackend>)> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let backend: Box<dyn LoggerBackend> = match kind {
                BackendKind::HostedMetrics => Box::new(HostedMetricsBackend::start(
                    &identity,
                    config,
                    &settings.hosted,
                )?),
                BackendKind::LocalServer => Box::new(LocalServerBackend::start(
                    &identity,
                    config,
                    &settings.local,
                )?),
                BackendKind::Console => Box::new(ConsoleBackend::new()),
            };
            started.push((kind, backend));
        }

        info!(
            project = %identity.project,
            experiment = %identity.experiment,
            backends = ?started.iter().map(|(k, _)| k.name()).collect::<Vec<_>>(),
            "Tracking initialized"
        );
        Ok(Self {
            identity,
            backends: started,
        })
    }

    /// Assemble a dispatcher from backends built elsewhere.
    ///
    /// A kind given more than once keeps its first backend.
    pub fn from_backends(
        identity: RunIdentity,
        backends: Vec<(BackendKind, Box<dyn LoggerBackend>)>,
    ) -> Self {
        let mut registry: Vec<(BackendKind, Box<dyn LoggerBackend>)> = Vec::with_capacity(backends.len());
        for (kind, backend) in backends {
            if !registry.iter().any(|(k, _)| *k == kind) {
                registry.push((kind, backend));
            }
        }
        Self {
            identity,
            backends: registry,
        }
    }

    /// Forward one metric record to the backends named in `only`, or to all of
    /// them when `only` is `None`.
    ///
    /// Delivery stops at the first failing backend; the ones before it have
    /// already received the record.
    pub fn log(&mut self, data: &Metrics, step: u64, only: Option<&[BackendKind]>) -> Result<()> {
        for (kind, backend) in self.backends.iter_mut() {
            if only.map_or(true, |selected| selected.contains(kind)) {
                backend.log(data, step)?;
            }
        }
        Ok(())
    }

    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Registered backend kinds in registry order.
    pub fn backends(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.backends.iter().any(|(k, _)| *k == kind)
    }
}
