//! Signer status aggregation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::signnow::{FieldInvite, GroupInvite, GroupRecipient};

pub const NOT_INVITED: &str = "not_invited";
pub const UNKNOWN: &str = "unknown";

/// What a group recipient is matched against in the invite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKey {
    /// Recipient name against each step action's role name
    #[default]
    Role,
    /// Recipient signing order against the step order
    Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignerStatus {
    pub name: String,
    pub email: Option<String>,
    pub order: u32,
    pub status: String,
    pub timestamp: Option<String>,
}

/// One entry per recipient, in recipient order.
///
/// Without an invite every recipient is `not_invited`; recipients the invite
/// does not mention are `unknown`.
pub fn group_statuses(
    recipients: &[GroupRecipient],
    invite: Option<&GroupInvite>,
    key: StatusKey,
) -> Vec<SignerStatus> {
    let lookup: Option<HashMap<String, &str>> = invite.map(|invite| match key {
        StatusKey::Role => invite
            .steps
            .iter()
            .flat_map(|step| &step.actions)
            .map(|action| (action.role_name.clone(), action.status.as_str()))
            .collect(),
        StatusKey::Order => invite
            .steps
            .iter()
            .map(|step| (step.order.to_string(), step.status.as_str()))
            .collect(),
    });

    recipients
        .iter()
        .map(|recipient| {
            let status = match &lookup {
                None => NOT_INVITED,
                Some(lookup) => {
                    let lookup_key = match key {
                        StatusKey::Role => recipient.name.clone(),
                        StatusKey::Order => recipient.order.to_string(),
                    };
                    lookup.get(&lookup_key).copied().unwrap_or(UNKNOWN)
                }
            };
            SignerStatus {
                name: recipient.name.clone(),
                email: recipient.email.clone(),
                order: recipient.order,
                status: status.to_string(),
                timestamp: None,
            }
        })
        .collect()
}

/// Status of one signer of a single-document invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStatus {
    pub name: String,
    pub status: String,
    pub timestamp: Option<String>,
}

/// The latest email status wins over the invite's own status
pub fn document_statuses(invites: &[FieldInvite]) -> Vec<DocumentStatus> {
    invites
        .iter()
        .map(|invite| {
            let latest = invite.email_statuses.first();
            DocumentStatus {
                name: invite.email.clone(),
                status: latest
                    .map(|s| s.status.clone())
                    .or_else(|| invite.status.clone())
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                timestamp: latest
                    .and_then(|s| s.created_at.clone())
                    .or_else(|| invite.created.clone()),
            }
        })
        .collect()
}
