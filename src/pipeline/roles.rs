//! Role lookup and role-to-email assignment

use serde::Deserialize;

use super::{FlowError, Form, ValueSource};
use crate::signnow::Role;

/// How a configured role name is compared with the names on a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMatch {
    #[default]
    Exact,
    /// Case-insensitive containment in either direction
    Contains,
}

impl RoleMatch {
    pub fn matches(self, candidate: &str, wanted: &str) -> bool {
        match self {
            Self::Exact => candidate == wanted,
            Self::Contains => {
                let candidate = candidate.to_lowercase();
                let wanted = wanted.to_lowercase();
                candidate.contains(&wanted) || wanted.contains(&candidate)
            }
        }
    }
}

pub fn find_role<'a>(roles: &'a [Role], name: &str, mode: RoleMatch) -> Option<&'a Role> {
    roles.iter().find(|role| mode.matches(&role.name, name))
}

pub fn find_role_id(roles: &[Role], name: &str, mode: RoleMatch) -> Result<String, FlowError> {
    find_role(roles, name, mode)
        .map(|role| role.unique_id.clone())
        .ok_or_else(|| FlowError::RoleNotFound(name.to_string()))
}

/// Email assigned to one named role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleAssignment {
    pub role: String,
    #[serde(flatten)]
    pub source: ValueSource,
}

/// Email for `role_name`: the first matching assignment that resolves, else the default
pub fn email_for(
    assignments: &[RoleAssignment],
    role_name: &str,
    mode: RoleMatch,
    default: Option<&ValueSource>,
    form: &Form,
) -> Option<String> {
    assignments
        .iter()
        .filter(|a| mode.matches(role_name, &a.role))
        .find_map(|a| a.source.resolve(form))
        .or_else(|| default.and_then(|d| d.resolve(form)))
}
