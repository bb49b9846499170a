//! Sample handlers
//!
//! Every sample is an instance of [`DeclarativeSample`] configured from the
//! catalog. The registry maps sample names to handlers once at startup.

mod catalog;
mod declarative;
mod pages;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::Value;

pub use catalog::{is_valid_name, Catalog};
pub use declarative::DeclarativeSample;

use crate::pipeline::{FlowError, Form};
use crate::signnow::{Download, SignApi};

/// What a sample hands back to the router
#[derive(Debug)]
pub enum SampleResponse {
    Html(String),
    Redirect(String),
    Json(StatusCode, Value),
    Pdf(Download),
}

/// Request-independent settings every sample needs
pub struct SampleContext<'a> {
    pub api: &'a dyn SignApi,
    pub static_dir: &'a str,
    pub public_url: &'a str,
    pub link_expiration: u32,
}

#[async_trait]
pub trait Sample: Send + Sync {
    fn name(&self) -> &str;

    /// Whether a GET with this query would call the remote service.
    fn get_runs_flow(&self, _query: &Form) -> bool {
        false
    }

    async fn handle_get(
        &self,
        ctx: &SampleContext<'_>,
        query: Form,
    ) -> Result<SampleResponse, FlowError>;

    async fn handle_post(
        &self,
        ctx: &SampleContext<'_>,
        form: Form,
    ) -> Result<SampleResponse, FlowError>;
}

#[derive(Clone, Default)]
pub struct SampleRegistry {
    samples: HashMap<String, Arc<dyn Sample>>,
}

impl SampleRegistry {
    pub fn from_catalog(catalog: Catalog) -> Self {
        let samples = catalog
            .samples
            .into_iter()
            .map(|spec| {
                let sample: Arc<dyn Sample> = Arc::new(DeclarativeSample::new(spec));
                (sample.name().to_string(), sample)
            })
            .collect();
        Self { samples }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Sample>> {
        self.samples.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.samples.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
