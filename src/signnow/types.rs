//! Wire models for the remote e-signature API
//!
//! Response types only declare the fields the pipeline reads; everything else
//! in the remote payload is ignored.

use hyper::body::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// Document as returned by `GET /document/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub fields: Vec<DocumentField>,
    #[serde(default)]
    pub field_invites: Vec<FieldInvite>,
}

impl Document {
    /// Names of the fillable fields placed on the document
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(DocumentField::name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Role {
    pub unique_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentField {
    #[serde(default)]
    pub json_attributes: Option<FieldAttributes>,
}

impl DocumentField {
    pub fn name(&self) -> Option<&str> {
        self.json_attributes.as_ref()?.name.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldAttributes {
    #[serde(default)]
    pub name: Option<String>,
}

/// Per-signer invite attached to a single document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldInvite {
    pub email: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created: Option<String>,
    #[serde(default)]
    pub email_statuses: Vec<EmailStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailStatus {
    pub status: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: Option<String>,
}

/// Value written into a named field before the document is sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    #[serde(rename = "field_name")]
    pub name: String,
    #[serde(rename = "prefilled_text")]
    pub value: String,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Signer entry of an embedded document invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedSigner {
    pub email: String,
    pub role_id: String,
    pub order: u32,
}

/// Invite created for one signer of an embedded document invite
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InviteRef {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOptions {
    pub auth_method: String,
    pub link_expiration: u32,
}

impl LinkOptions {
    pub fn unauthenticated(link_expiration: u32) -> Self {
        Self {
            auth_method: "none".to_string(),
            link_expiration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendingLinkOptions {
    #[serde(rename = "type")]
    pub kind: String,
    pub redirect_uri: String,
    pub link_expiration: u32,
    pub redirect_target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditLinkOptions {
    pub redirect_uri: String,
    pub redirect_target: String,
    pub link_expiration: u32,
}

/// Email (non-embedded) invite for a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailInvite {
    pub to: Vec<EmailRecipient>,
    pub from: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRecipient {
    pub email: String,
    pub role_id: String,
    pub role: String,
    pub order: u32,
    pub subject: String,
    pub message: String,
}

/// Document group as returned by `GET /documentgroup/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentGroup {
    pub id: String,
    #[serde(default)]
    pub documents: Vec<GroupDocument>,
    #[serde(default)]
    pub invite_id: Option<String>,
}

impl DocumentGroup {
    /// Invite id, treating an empty string the same as no invite
    pub fn active_invite(&self) -> Option<&str> {
        self.invite_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupDocument {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupRecipient {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub order: u32,
    #[serde(default)]
    pub documents: Vec<RecipientDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecipientDocument {
    pub id: String,
    pub role: String,
    pub action: String,
}

/// One ordered step of an embedded group invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInviteStep {
    pub order: u32,
    pub signers: Vec<GroupSigner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSigner {
    pub email: String,
    pub auth_method: String,
    pub documents: Vec<SignerDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignerDocument {
    pub id: String,
    pub action: String,
    pub role: String,
}

/// Email invite for a group, sent by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEmailInvite {
    pub invite_steps: Vec<GroupEmailStep>,
    pub cc: Vec<String>,
    pub sign_as_merged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEmailStep {
    pub order: u32,
    pub invite_emails: Vec<InviteEmail>,
    pub invite_actions: Vec<InviteAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteEmail {
    pub email: String,
    pub subject: String,
    pub message: String,
    pub expiration_days: u32,
    #[serde(rename = "reminder")]
    pub reminder_days: u32,
}

/// What one signer does with one document of the group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteAction {
    pub email: String,
    pub role_name: String,
    pub action: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
}

/// Status of a group invite as returned by `GET /documentgroup/{id}/groupinvite/{invite}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupInvite {
    pub status: String,
    #[serde(default)]
    pub steps: Vec<InviteStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InviteStep {
    pub order: u32,
    pub status: String,
    #[serde(default)]
    pub actions: Vec<StepAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepAction {
    pub role_name: String,
    pub status: String,
}

/// Downloaded file, read fully into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: Option<String>,
    pub content: Bytes,
}

/// Timestamps arrive as either strings or integers depending on the endpoint
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_field_names_skip_unnamed() {
        let doc: Document = serde_json::from_str(
            r#"{
                "roles": [{"unique_id": "R1", "name": "Recipient 1", "signing_order": "1"}],
                "fields": [
                    {"type": "text", "role": "Recipient 1", "json_attributes": {"name": "Name"}},
                    {"type": "signature", "json_attributes": {}},
                    {"type": "text"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.field_names().collect::<Vec<_>>(), vec!["Name"]);
        assert_eq!(doc.roles[0].unique_id, "R1");
        assert!(doc.field_invites.is_empty());
    }

    #[test]
    fn test_field_invite_timestamps_accept_numbers() {
        let invite: FieldInvite = serde_json::from_str(
            r#"{"email": "a@example.com", "status": "pending", "created": 1700000000,
                "email_statuses": [{"status": "viewed", "created_at": "1700000100"}]}"#,
        )
        .unwrap();

        assert_eq!(invite.created.as_deref(), Some("1700000000"));
        assert_eq!(invite.email_statuses[0].created_at.as_deref(), Some("1700000100"));
    }

    #[test]
    fn test_field_value_wire_names() {
        let json = serde_json::to_value(FieldValue::new("Name", "Jane")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field_name": "Name", "prefilled_text": "Jane"})
        );
    }

    #[test]
    fn test_group_email_invite_wire_names() {
        let invite = GroupEmailInvite {
            invite_steps: vec![GroupEmailStep {
                order: 1,
                invite_emails: vec![InviteEmail {
                    email: "a@example.com".to_string(),
                    subject: "Sign".to_string(),
                    message: "Please sign".to_string(),
                    expiration_days: 30,
                    reminder_days: 10,
                }],
                invite_actions: vec![InviteAction {
                    email: "a@example.com".to_string(),
                    role_name: "Recipient 1".to_string(),
                    action: "sign".to_string(),
                    document_id: "D1".to_string(),
                    redirect_uri: None,
                    redirect_target: None,
                }],
            }],
            cc: Vec::new(),
            sign_as_merged: true,
        };

        let json = serde_json::to_value(&invite).unwrap();
        let step = &json["invite_steps"][0];
        assert_eq!(step["invite_emails"][0]["reminder"], 10);
        assert_eq!(step["invite_actions"][0]["document_id"], "D1");
        assert!(step["invite_actions"][0].get("redirect_uri").is_none());
        assert_eq!(json["sign_as_merged"], true);
    }

    #[test]
    fn test_group_active_invite_ignores_empty() {
        let group = DocumentGroup {
            id: "G1".to_string(),
            invite_id: Some(String::new()),
            ..DocumentGroup::default()
        };
        assert_eq!(group.active_invite(), None);
    }
}
