//! Browser form input shared by every flow

use serde::Deserialize;
use serde_json::{Map, Value};

use super::FlowError;

/// Form values of one request: the JSON body of a POST or the query of a GET
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form(Map<String, Value>);

impl Form {
    /// Parse a JSON object body; an empty body is an empty form
    pub fn from_json(body: &[u8]) -> Result<Self, FlowError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(FlowError::InvalidBody("expected a JSON object".to_string())),
            Err(e) => Err(FlowError::InvalidBody(e.to_string())),
        }
    }

    pub fn from_query(query: &str) -> Self {
        let map = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        Self(map)
    }

    /// Non-empty string or number value of `key`
    pub fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn require(&self, key: &str) -> Result<String, FlowError> {
        self.get(key)
            .ok_or_else(|| FlowError::MissingInput(key.to_string()))
    }

    /// List value of `key`, accepting a JSON array or a comma separated string
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn action(&self) -> Option<String> {
        self.get("action")
    }
}

/// Where a value written into a remote request comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    Form {
        form: String,
        #[serde(default)]
        default: Option<String>,
    },
    Literal {
        value: String,
    },
}

impl ValueSource {
    pub fn resolve(&self, form: &Form) -> Option<String> {
        match self {
            Self::Form { form: key, default } => form.get(key).or_else(|| default.clone()),
            Self::Literal { value } => Some(value.clone()),
        }
    }

    pub fn require(&self, form: &Form) -> Result<String, FlowError> {
        self.resolve(form).ok_or_else(|| match self {
            Self::Form { form: key, .. } => FlowError::MissingInput(key.clone()),
            Self::Literal { .. } => FlowError::MissingInput("value".to_string()),
        })
    }
}
