//! Local metrics-and-params server backend.
//!
//! Each run is a fresh directory `<base_dir>/<project>/<experiment>/<run_name>`
//! holding `run.yaml`, `params.yaml` and `metrics.parquet`. The run name is the
//! start time, so restarting an experiment never touches an earlier run. Every
//! `log` call is written through immediately.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::LoggerBackend;
use crate::error::Result;
use crate::models::{MetricRow, Metrics, RunIdentity, RunMetadata, RunStatus};
use crate::params::{normalize, ConfigValue, Params};
use crate::settings::LocalServerSettings;
use crate::storage;

pub struct LocalServerBackend {
    run_dir: PathBuf,
    meta: RunMetadata,
}

impl LocalServerBackend {
    /// Start a named run and record the flattened configuration as its params.
    pub fn start(
        identity: &RunIdentity,
        config: Option<&ConfigValue>,
        settings: &LocalServerSettings,
    ) -> Result<Self> {
        let params = normalize(config)?;
        Self::start_with_params(identity, &params, settings)
    }

    pub fn start_with_params(
        identity: &RunIdentity,
        params: &Params,
        settings: &LocalServerSettings,
    ) -> Result<Self> {
        let experiment_dir = settings
            .base_dir
            .join(&identity.project)
            .join(&identity.experiment);
        let (run_name, run_dir) = storage::create_run_dir(&experiment_dir)?;

        let meta = RunMetadata::started(identity, run_name);
        storage::save_run_metadata(&run_dir, &meta)?;
        storage::save_params(&run_dir, params)?;

        info!(
            project = %identity.project,
            experiment = %identity.experiment,
            run = %meta.run_name,
            run_dir = %run_dir.display(),
            params = params.len(),
            "Local run started"
        );
        Ok(Self { run_dir, meta })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl LoggerBackend for LocalServerBackend {
    fn log(&mut self, data: &Metrics, step: u64) -> Result<()> {
        let row = MetricRow::new(data.clone(), step);
        storage::append_metrics(&self.run_dir.join(storage::METRICS_FILE), &[row])?;

        self.meta.steps_logged += 1;
        storage::save_run_metadata(&self.run_dir, &self.meta)
    }
}

impl Drop for LocalServerBackend {
    fn drop(&mut self) {
        // Best-effort final status; there is no explicit close.
        self.meta.finish(RunStatus::Finished);
        if let Err(e) = storage::save_run_metadata(&self.run_dir, &self.meta) {
            error!("Failed to write final run metadata: {}", e);
        }
    }
}
