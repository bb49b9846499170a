//! Declarative sample catalog
//!
//! The catalog is parsed and validated once at startup; a catalog that names
//! an unknown action or an invalid sample fails startup rather than a request.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::pipeline::Flow;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("unable to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid sample name: {0:?}")]
    InvalidName(String),
    #[error("duplicate sample: {0}")]
    Duplicate(String),
    #[error("sample {sample} refers to unknown action {action}")]
    UnknownAction { sample: String, action: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(rename = "sample", default)]
    pub samples: Vec<SampleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleSpec {
    pub name: String,
    /// HTML file under `static/samples/<name>/`
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default)]
    pub get: GetMode,
    #[serde(default)]
    pub actions: BTreeMap<String, Action>,
    /// Action run when the posted action is unknown; without one the
    /// request is rejected
    #[serde(default)]
    pub default_action: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_page() -> String {
    "index.html".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GetMode {
    /// Always serve the sample page
    #[default]
    Page,
    /// Serve the page for the listed `page` markers (`""` meaning no marker),
    /// otherwise run `action` with the query and redirect to its link
    Redirect {
        #[serde(default)]
        static_pages: Vec<String>,
        action: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub flow: Flow,
    #[serde(default)]
    pub respond: ResponseShape,
    /// Form keys that must be present before any remote call is made
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub required_message: Option<String>,
}

/// JSON shape of a creating action's reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseShape {
    #[serde(default = "default_link_key")]
    pub link_key: String,
    #[serde(default)]
    pub include_ids: bool,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_link_key() -> String {
    "link".to_string()
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self {
            link_key: default_link_key(),
            include_ids: false,
            extra: Map::new(),
        }
    }
}

/// Sample names double as URL segments
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(BUILTIN_CATALOG)
    }

    /// Load the catalog file when one is configured, else the built-in one
    pub fn load(path: Option<&str>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                    path: path.to_string(),
                    source,
                })?;
                Self::parse(&source)
            }
            None => Self::builtin(),
        }
    }

    pub fn parse(source: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(source)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for sample in &self.samples {
            if !is_valid_name(&sample.name) {
                return Err(CatalogError::InvalidName(sample.name.clone()));
            }
            if !seen.insert(sample.name.as_str()) {
                return Err(CatalogError::Duplicate(sample.name.clone()));
            }

            let referenced = sample.default_action.iter().chain(match &sample.get {
                GetMode::Page => None,
                GetMode::Redirect { action, .. } => Some(action),
            });
            for action in referenced {
                if !sample.actions.contains_key(action) {
                    return Err(CatalogError::UnknownAction {
                        sample: sample.name.clone(),
                        action: action.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
