//! Hosted metrics service backend.
//!
//! The service speaks JSON over HTTP. `HostedClient` owns a small tokio
//! runtime and blocks on each request, so the backend stays synchronous for
//! its callers. Do not call it from inside another tokio runtime.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::LoggerBackend;
use crate::error::{Result, TrackingError};
use crate::models::{Metrics, RunIdentity};
use crate::params::{to_nested_json, ConfigValue};
use crate::settings::HostedCredentials;

#[derive(Serialize)]
struct NewRun<'a> {
    entity: Option<&'a str>,
    project: &'a str,
    name: &'a str,
    config: Value,
}

#[derive(Deserialize)]
struct RunCreated {
    id: String,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    step: u64,
    data: &'a Metrics,
}

/// Thin blocking client for the hosted metrics API.
pub struct HostedClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    runtime: Arc<Runtime>,
}

impl HostedClient {
    pub fn new(credentials: &HostedCredentials) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("unitrack-http")
            .enable_all()
            .build()?;
        let http = reqwest::Client::builder()
            .timeout(credentials.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            runtime: Arc::new(runtime),
        })
    }

    /// Check the API key with the service. A client without a key skips this.
    pub fn login(&self) -> Result<()> {
        if self.api_key.is_none() {
            return Ok(());
        }
        self.post("/api/v1/login", &serde_json::json!({}))?;
        info!(base_url = %self.base_url, "Authenticated with hosted metrics service");
        Ok(())
    }

    /// Create a run and return its id.
    pub fn create_run(
        &self,
        entity: Option<&str>,
        identity: &RunIdentity,
        config: Value,
    ) -> Result<String> {
        let body = NewRun {
            entity,
            project: &identity.project,
            name: &identity.experiment,
            config,
        };
        let created: RunCreated = serde_json::from_value(self.post("/api/v1/runs", &body)?)?;
        Ok(created.id)
    }

    pub fn log_history(&self, run_id: &str, data: &Metrics, step: u64) -> Result<()> {
        let path = format!("/api/v1/runs/{}/history", run_id);
        self.post(&path, &HistoryEntry { step, data })?;
        Ok(())
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let value = self.runtime.block_on(send_json(request))?;
        debug!(%url, "Hosted request done");
        Ok(value)
    }
}

async fn send_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(TrackingError::Hosted {
            status: status.as_u16(),
            body: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Backend that streams metric records to a run on the hosted service.
pub struct HostedMetricsBackend {
    client: HostedClient,
    run_id: String,
}

impl HostedMetricsBackend {
    /// Authenticate when a key is configured, then start the run.
    ///
    /// The whole configuration travels as nested JSON; the service keeps its
    /// structure, so sequences stay sequences. NaN and infinities are sent as
    /// `null` rather than failing the run.
    pub fn start(
        identity: &RunIdentity,
        config: Option<&ConfigValue>,
        credentials: &HostedCredentials,
    ) -> Result<Self> {
        let client = HostedClient::new(credentials)?;
        client.login()?;

        let config = config.map(to_nested_json).unwrap_or(Value::Null);
        let run_id = client.create_run(credentials.entity.as_deref(), identity, config)?;

        info!(
            project = %identity.project,
            experiment = %identity.experiment,
            run_id = %run_id,
            "Hosted metrics run started"
        );
        Ok(Self { client, run_id })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl LoggerBackend for HostedMetricsBackend {
    fn log(&mut self, data: &Metrics, step: u64) -> Result<()> {
        self.client.log_history(&self.run_id, data, step)
    }
}
