//! Backend settings injected into the dispatcher.
//!
//! Nothing inside the library reads the environment; the composition root
//! calls [`TrackingSettings::from_env`] once (or builds the settings by hand)
//! and passes them to [`crate::Tracking::new`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY_ENV: &str = "WANDB_API_KEY";
pub const ENTITY_ENV: &str = "WANDB_ENTITY";
pub const BASE_URL_ENV: &str = "WANDB_BASE_URL";
pub const LOCAL_DIR_ENV: &str = "UNITRACK_DIR";

pub const DEFAULT_BASE_URL: &str = "https://api.wandb.ai";
pub const DEFAULT_LOCAL_DIR: &str = "./mlruns";

/// Credentials and endpoint of the hosted metrics service.
#[derive(Debug, Clone)]
pub struct HostedCredentials {
    /// Authenticate with this key before starting the run, when present.
    pub api_key: Option<String>,
    /// Team or user namespace the run is created under.
    pub entity: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for HostedCredentials {
    fn default() -> Self {
        Self {
            api_key: None,
            entity: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HostedCredentials {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: non_empty_var(API_KEY_ENV),
            entity: non_empty_var(ENTITY_ENV),
            base_url: non_empty_var(BASE_URL_ENV).unwrap_or(defaults.base_url),
            request_timeout: defaults.request_timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Where the local server backend keeps its runs.
#[derive(Debug, Clone)]
pub struct LocalServerSettings {
    /// Runs live at `<base_dir>/<project>/<experiment>/<run_name>`.
    pub base_dir: PathBuf,
}

impl Default for LocalServerSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
        }
    }
}

impl LocalServerSettings {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_env() -> Self {
        non_empty_var(LOCAL_DIR_ENV)
            .map(Self::new)
            .unwrap_or_default()
    }
}

/// Everything the backends need besides the run identity and configuration.
#[derive(Debug, Clone, Default)]
pub struct TrackingSettings {
    pub hosted: HostedCredentials,
    pub local: LocalServerSettings,
}

impl TrackingSettings {
    pub fn from_env() -> Self {
        Self {
            hosted: HostedCredentials::from_env(),
            local: LocalServerSettings::from_env(),
        }
    }

    pub fn with_hosted(mut self, hosted: HostedCredentials) -> Self {
        self.hosted = hosted;
        self
    }

    pub fn with_local_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.local = LocalServerSettings::new(base_dir);
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
