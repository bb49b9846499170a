//! Remote call sequences behind the sample actions
//!
//! Every step that consumes an id produced by an earlier step awaits that step
//! first. The only concurrency is the per-document prefill of a group. A failed
//! call aborts the flow; remote side effects already made are left in place.

mod document;
mod group;
mod retrieve;

use serde::{Deserialize, Serialize};

pub use document::{EmailInviteSpec, EmbeddedInviteSpec, EmbeddedSendingSpec};
pub use group::{
    GroupEmailInviteSpec, GroupFromTemplateSpec, GroupFromTemplatesSpec, GroupInviteSpec,
    GroupSigningUrlSpec,
};

use super::status::{DocumentStatus, SignerStatus, StatusKey};
use super::{links, FlowError, Form, ValueSource};
use crate::logger;
use crate::signnow::{Download, SignApi};

/// Form key carrying a document id between the page and the API
pub const DOCUMENT_ID: &str = "document_id";
/// Form key carrying a document group id between the page and the API
pub const DOCUMENT_GROUP_ID: &str = "document_group_id";

pub struct FlowContext<'a> {
    pub api: &'a dyn SignApi,
    pub sample: &'a str,
    pub public_url: &'a str,
    /// Minutes a signing link stays valid unless the flow sets its own
    pub link_expiration: u32,
}

impl FlowContext<'_> {
    fn step(&self, message: &str) {
        logger::log_step(self.sample, message);
    }

    fn redirect_url(
        &self,
        redirect: &RedirectSpec,
        id_key: &str,
        id: &str,
    ) -> Result<String, FlowError> {
        match &redirect.url {
            Some(url) => Ok(url.clone()),
            None => links::callback_url(
                self.public_url,
                self.sample,
                redirect.page.as_deref(),
                &[(id_key, id)],
            ),
        }
    }
}

/// Where the remote service sends the browser once the user is done
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectSpec {
    /// Page marker of the callback into this sample
    #[serde(default)]
    pub page: Option<String>,
    /// Fixed absolute URL used instead of a callback
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_target")]
    pub target: String,
    /// Percent-encode the callback when it is appended to a remote link
    #[serde(default = "default_encode")]
    pub encode: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_target() -> String {
    "self".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_encode() -> bool {
    true
}

/// One signing step of an embedded group invite
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepSpec {
    /// Role signed by this step; documents lacking the role are only viewed
    #[serde(default)]
    pub role: Option<String>,
    /// Signer email; when absent, the email the group recipient of `role` carries
    #[serde(default)]
    pub email: Option<ValueSource>,
    #[serde(default)]
    pub delivery_type: Option<String>,
}

/// Ids and link produced by a creating flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Created {
    pub link: Option<String>,
    pub document_id: Option<String>,
    pub document_group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusReport {
    Signers(Vec<SignerStatus>),
    Documents(Vec<DocumentStatus>),
    Invite { status: String },
}

#[derive(Debug)]
pub enum FlowOutput {
    Created(Created),
    Statuses(StatusReport),
    Download(Download),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "flow", rename_all = "kebab-case")]
pub enum Flow {
    EmbeddedInvite(EmbeddedInviteSpec),
    EmbeddedSending(EmbeddedSendingSpec),
    EmailInvite(EmailInviteSpec),
    GroupFromTemplates(GroupFromTemplatesSpec),
    GroupFromTemplate(GroupFromTemplateSpec),
    GroupEmailInvite(GroupEmailInviteSpec),
    GroupEmbeddedInvite(GroupInviteSpec),
    GroupSigningUrl(GroupSigningUrlSpec),
    DocumentStatus,
    GroupStatus {
        #[serde(default)]
        key: StatusKey,
    },
    GroupInviteSummary,
    DownloadDocument {
        #[serde(default)]
        filename: Option<String>,
    },
    DownloadGroup {
        #[serde(default)]
        filename: Option<String>,
    },
}

impl Flow {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EmbeddedInvite(_) => "embedded-invite",
            Self::EmbeddedSending(_) => "embedded-sending",
            Self::EmailInvite(_) => "email-invite",
            Self::GroupFromTemplates(_) => "group-from-templates",
            Self::GroupFromTemplate(_) => "group-from-template",
            Self::GroupEmailInvite(_) => "group-email-invite",
            Self::GroupEmbeddedInvite(_) => "group-embedded-invite",
            Self::GroupSigningUrl(_) => "group-signing-url",
            Self::DocumentStatus => "document-status",
            Self::GroupStatus { .. } => "group-status",
            Self::GroupInviteSummary => "group-invite-summary",
            Self::DownloadDocument { .. } => "download-document",
            Self::DownloadGroup { .. } => "download-group",
        }
    }

    pub async fn run(&self, ctx: &FlowContext<'_>, form: &Form) -> Result<FlowOutput, FlowError> {
        ctx.step(&format!("running {}", self.name()));
        match self {
            Self::EmbeddedInvite(spec) => document::embedded_invite(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::EmbeddedSending(spec) => document::embedded_sending(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::EmailInvite(spec) => document::email_invite(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::GroupFromTemplates(spec) => group::group_from_templates(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::GroupFromTemplate(spec) => group::group_from_template(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::GroupEmailInvite(spec) => group::group_email_invite(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::GroupEmbeddedInvite(spec) => group::group_embedded_invite(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::GroupSigningUrl(spec) => group::group_signing_url(ctx, spec, form)
                .await
                .map(FlowOutput::Created),
            Self::DocumentStatus => retrieve::document_status(ctx, form)
                .await
                .map(FlowOutput::Statuses),
            Self::GroupStatus { key } => retrieve::group_status(ctx, *key, form)
                .await
                .map(FlowOutput::Statuses),
            Self::GroupInviteSummary => retrieve::group_invite_summary(ctx, form)
                .await
                .map(FlowOutput::Statuses),
            Self::DownloadDocument { filename } => {
                retrieve::download_document(ctx, filename.as_deref(), form)
                    .await
                    .map(FlowOutput::Download)
            }
            Self::DownloadGroup { filename } => {
                retrieve::download_group(ctx, filename.as_deref(), form)
                    .await
                    .map(FlowOutput::Download)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_parses_from_tagged_table() {
        let flow: Flow = toml::from_str(
            r#"
            flow = "embedded-invite"
            template_id = "T1"
            signer = { form = "email", default = "signer@example.com" }
            redirect = { page = "download-container" }
            fields = [{ field = "Name", form = "full_name" }]
            "#,
        )
        .unwrap();

        let Flow::EmbeddedInvite(spec) = flow else {
            panic!("wrong flow: {flow:?}");
        };
        assert_eq!(spec.template_id, "T1");
        assert_eq!(spec.role, "Recipient 1");
        let redirect = spec.redirect.unwrap();
        assert_eq!(redirect.target, "self");
        assert!(redirect.encode);
    }

    #[test]
    fn test_unit_and_struct_flows_parse() {
        let status: Flow = toml::from_str(r#"flow = "group-status""#).unwrap();
        assert!(matches!(status, Flow::GroupStatus { key: StatusKey::Role }));

        let download: Flow =
            toml::from_str("flow = \"download-group\"\nfilename = \"result.pdf\"").unwrap();
        assert!(matches!(
            download,
            Flow::DownloadGroup { filename: Some(ref f) } if f == "result.pdf"
        ));
        assert_eq!(download.name(), "download-group");
    }

    #[test]
    fn test_unknown_flow_is_rejected() {
        assert!(toml::from_str::<Flow>(r#"flow = "upload-document""#).is_err());
    }
}
