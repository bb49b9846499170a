// Application state module
// Shared by every connection for the lifetime of the process

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::types::Config;
use crate::samples::{SampleContext, SampleRegistry};
use crate::signnow::SignApi;

/// Application state
pub struct AppState {
    pub config: Config,
    pub api: Arc<dyn SignApi>,
    pub samples: SampleRegistry,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: &Config, api: Arc<dyn SignApi>, samples: SampleRegistry) -> Self {
        Self {
            config: config.clone(),
            api,
            samples,
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
        }
    }

    /// Per-request view handed to sample handlers
    pub fn sample_context(&self) -> SampleContext<'_> {
        SampleContext {
            api: self.api.as_ref(),
            static_dir: &self.config.samples.static_dir,
            public_url: &self.config.samples.public_url,
            link_expiration: self.config.samples.link_expiration,
        }
    }
}
