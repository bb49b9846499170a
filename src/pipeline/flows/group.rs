use serde::Deserialize;

use super::{Created, FlowContext, RedirectSpec, StepSpec, DOCUMENT_GROUP_ID};
use crate::pipeline::links::signing_url;
use crate::pipeline::prefill::{prefill_documents, prefill_group, FieldBinding};
use crate::pipeline::roles::{email_for, RoleAssignment, RoleMatch};
use crate::pipeline::{FlowError, Form, ValueSource};
use crate::signnow::{
    DocumentGroup, EditLinkOptions, GroupDocument, GroupEmailInvite, GroupEmailStep,
    GroupInviteStep, GroupRecipient, GroupSigner, InviteAction, InviteEmail, LinkOptions,
    SendingLinkOptions, SignerDocument,
};

/// Clone several templates, bundle them into a new group and invite its signers
#[derive(Debug, Clone, Deserialize)]
pub struct GroupFromTemplatesSpec {
    /// Form key listing the template ids to clone
    #[serde(default = "default_templates_key")]
    pub templates_from: String,
    /// Templates cloned when the form lists none
    #[serde(default)]
    pub template_ids: Vec<String>,
    pub group_name: String,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub redirect: Option<RedirectSpec>,
    #[serde(default)]
    pub link_expiration: Option<u32>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_templates_key() -> String {
    "template_ids".to_string()
}

/// Instantiate a group template, prefill it, assign recipients and open an
/// editor or sending page on it
#[derive(Debug, Clone, Deserialize)]
pub struct GroupFromTemplateSpec {
    pub template_id: String,
    pub group_name: String,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
    #[serde(default)]
    pub recipients: Vec<RoleAssignment>,
    #[serde(default)]
    pub role_match: RoleMatch,
    /// Email for recipients no assignment covers; without it they keep theirs
    #[serde(default)]
    pub default_email: Option<ValueSource>,
    pub link: GroupLink,
    #[serde(default = "default_group_sending_type")]
    pub sending_type: String,
    pub redirect: RedirectSpec,
    #[serde(default)]
    pub link_expiration: Option<u32>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_group_sending_type() -> String {
    "send-invite".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupLink {
    Edit,
    Sending,
}

/// Instantiate a group template, prefill it and have the remote service email
/// one signer an invite covering every document
#[derive(Debug, Clone, Deserialize)]
pub struct GroupEmailInviteSpec {
    pub template_id: String,
    pub group_name: String,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
    pub signer: ValueSource,
    #[serde(default = "default_signer_role")]
    pub role: String,
    pub subject: String,
    pub message: String,
    #[serde(default = "default_expiration_days")]
    pub expiration_days: u32,
    #[serde(default = "default_reminder_days")]
    pub reminder_days: u32,
    #[serde(default)]
    pub redirect: Option<RedirectSpec>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_signer_role() -> String {
    "Recipient 1".to_string()
}

const fn default_expiration_days() -> u32 {
    30
}

const fn default_reminder_days() -> u32 {
    10
}

/// Embedded invite on an existing group named by the form
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInviteSpec {
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub redirect: Option<RedirectSpec>,
    #[serde(default)]
    pub link_expiration: Option<u32>,
}

/// Signing page link for a group authenticated by a limited-scope token
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSigningUrlSpec {
    #[serde(default = "default_signing_base")]
    pub signing_base: String,
    pub redirect: RedirectSpec,
}

#[allow(clippy::missing_const_for_fn)]
fn default_signing_base() -> String {
    "https://app.signnow.com/webapp/documentgroup/signing".to_string()
}

pub async fn group_from_templates(
    ctx: &FlowContext<'_>,
    spec: &GroupFromTemplatesSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let mut template_ids = form.get_list(&spec.templates_from);
    if template_ids.is_empty() {
        template_ids.clone_from(&spec.template_ids);
    }
    if template_ids.is_empty() {
        return Err(FlowError::MissingInput(spec.templates_from.clone()));
    }

    let mut document_ids = Vec::with_capacity(template_ids.len());
    for template_id in &template_ids {
        document_ids.push(ctx.api.clone_template(template_id).await?);
    }
    ctx.step(&format!("cloned {} templates", document_ids.len()));

    prefill_documents(ctx.api, &document_ids, &spec.fields, form).await?;

    let group_id = ctx.api.create_group(&spec.group_name, &document_ids).await?;
    ctx.step(&format!("created group {group_id}"));

    // role-bound steps need the remote role list of each document
    let group = if spec.steps.iter().any(|s| s.role.is_some()) {
        ctx.api.get_group(&group_id).await?
    } else {
        DocumentGroup {
            id: group_id.clone(),
            documents: document_ids
                .iter()
                .map(|id| GroupDocument {
                    id: id.clone(),
                    ..GroupDocument::default()
                })
                .collect(),
            ..DocumentGroup::default()
        }
    };

    let link = invite_group(
        ctx,
        &group,
        &spec.steps,
        spec.redirect.as_ref(),
        spec.link_expiration,
        form,
    )
    .await?;

    Ok(Created {
        link: Some(link),
        document_id: None,
        document_group_id: Some(group_id),
    })
}

pub async fn group_from_template(
    ctx: &FlowContext<'_>,
    spec: &GroupFromTemplateSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let group_id = ctx
        .api
        .create_group_from_template(&spec.template_id, &spec.group_name)
        .await?;
    ctx.step(&format!("created group {group_id}"));

    prefill_group(ctx.api, &group_id, &spec.fields, form).await?;

    if !spec.recipients.is_empty() || spec.default_email.is_some() {
        let recipients = ctx.api.get_group_recipients(&group_id).await?;
        let updated = assign_emails(recipients, spec, form);
        ctx.api.update_group_recipients(&group_id, &updated).await?;
    }

    let redirect_uri = ctx.redirect_url(&spec.redirect, DOCUMENT_GROUP_ID, &group_id)?;
    let link_expiration = spec.link_expiration.unwrap_or(ctx.link_expiration);
    let link = match spec.link {
        GroupLink::Edit => {
            let options = EditLinkOptions {
                redirect_uri,
                redirect_target: spec.redirect.target.clone(),
                link_expiration,
            };
            ctx.api.create_group_edit_link(&group_id, &options).await?
        }
        GroupLink::Sending => {
            let options = SendingLinkOptions {
                kind: spec.sending_type.clone(),
                redirect_uri,
                link_expiration,
                redirect_target: spec.redirect.target.clone(),
            };
            ctx.api.create_group_sending_link(&group_id, &options).await?
        }
    };

    Ok(Created {
        link: Some(link),
        document_id: None,
        document_group_id: Some(group_id),
    })
}

pub async fn group_email_invite(
    ctx: &FlowContext<'_>,
    spec: &GroupEmailInviteSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let email = spec.signer.require(form)?;

    let group_id = ctx
        .api
        .create_group_from_template(&spec.template_id, &spec.group_name)
        .await?;
    ctx.step(&format!("created group {group_id}"));

    let group = prefill_group(ctx.api, &group_id, &spec.fields, form).await?;

    let redirect_uri = spec
        .redirect
        .as_ref()
        .map(|r| ctx.redirect_url(r, DOCUMENT_GROUP_ID, &group_id))
        .transpose()?;
    let invite_actions = group
        .documents
        .iter()
        .map(|doc| InviteAction {
            email: email.clone(),
            role_name: spec.role.clone(),
            action: "sign".to_string(),
            document_id: doc.id.clone(),
            redirect_uri: redirect_uri.clone(),
            redirect_target: spec.redirect.as_ref().map(|r| r.target.clone()),
        })
        .collect();
    let invite = GroupEmailInvite {
        invite_steps: vec![GroupEmailStep {
            order: 1,
            invite_emails: vec![InviteEmail {
                email,
                subject: spec.subject.clone(),
                message: spec.message.clone(),
                expiration_days: spec.expiration_days,
                reminder_days: spec.reminder_days,
            }],
            invite_actions,
        }],
        cc: Vec::new(),
        sign_as_merged: true,
    };
    ctx.api.send_group_email_invite(&group_id, &invite).await?;
    ctx.step(&format!("emailed invite for group {group_id}"));

    Ok(Created {
        link: None,
        document_id: None,
        document_group_id: Some(group_id),
    })
}

pub async fn group_embedded_invite(
    ctx: &FlowContext<'_>,
    spec: &GroupInviteSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let group_id = form.require(DOCUMENT_GROUP_ID)?;
    let group = ctx.api.get_group(&group_id).await?;

    let link = invite_group(
        ctx,
        &group,
        &spec.steps,
        spec.redirect.as_ref(),
        spec.link_expiration,
        form,
    )
    .await?;

    Ok(Created {
        link: Some(link),
        document_id: None,
        document_group_id: Some(group_id),
    })
}

pub async fn group_signing_url(
    ctx: &FlowContext<'_>,
    spec: &GroupSigningUrlSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let group_id = form.require(DOCUMENT_GROUP_ID)?;
    let scope = format!("limited_signer_scope_token_for_document_group_invite/{group_id}");
    let token = ctx.api.limited_token(&scope).await?;

    let redirect = ctx.redirect_url(&spec.redirect, DOCUMENT_GROUP_ID, &group_id)?;
    let link = signing_url(&spec.signing_base, &group_id, &token, &redirect)?;

    Ok(Created {
        link: Some(link),
        document_id: None,
        document_group_id: Some(group_id),
    })
}

/// Create the ordered group invite and the signing link of its first signer
async fn invite_group(
    ctx: &FlowContext<'_>,
    group: &DocumentGroup,
    steps: &[StepSpec],
    redirect: Option<&RedirectSpec>,
    link_expiration: Option<u32>,
    form: &Form,
) -> Result<String, FlowError> {
    let recipients = if steps.iter().any(|s| s.email.is_none()) {
        ctx.api.get_group_recipients(&group.id).await?
    } else {
        Vec::new()
    };
    let redirect_uri = redirect
        .map(|r| ctx.redirect_url(r, DOCUMENT_GROUP_ID, &group.id))
        .transpose()?;

    let mut invite_steps = Vec::with_capacity(steps.len());
    for (order, step) in (1..).zip(steps) {
        let signer = GroupSigner {
            email: step_email(step, &recipients, form)?,
            auth_method: "none".to_string(),
            documents: signer_documents(group, step.role.as_deref()),
            redirect_uri: redirect_uri.clone(),
            redirect_target: redirect.map(|r| r.target.clone()),
            delivery_type: step.delivery_type.clone(),
        };
        invite_steps.push(GroupInviteStep {
            order,
            signers: vec![signer],
        });
    }

    let first_email = invite_steps
        .first()
        .and_then(|step| step.signers.first())
        .map(|signer| signer.email.clone())
        .ok_or_else(|| FlowError::MissingInput("steps".to_string()))?;

    let invite_id = ctx.api.create_group_invite(&group.id, &invite_steps).await?;
    ctx.step(&format!("created group invite {invite_id}"));

    let options = LinkOptions::unauthenticated(link_expiration.unwrap_or(ctx.link_expiration));
    let link = ctx
        .api
        .create_group_invite_link(&group.id, &invite_id, &first_email, &options)
        .await?;
    Ok(link)
}

fn step_email(
    step: &StepSpec,
    recipients: &[GroupRecipient],
    form: &Form,
) -> Result<String, FlowError> {
    if let Some(source) = &step.email {
        return source.require(form);
    }
    let role = step.role.as_deref().unwrap_or_default();
    recipients
        .iter()
        .find(|r| r.name == role)
        .and_then(|r| r.email.clone())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| FlowError::MissingInput(format!("email for {role}")))
}

/// Documents carrying the role are signed, the rest only viewed
fn signer_documents(group: &DocumentGroup, role: Option<&str>) -> Vec<SignerDocument> {
    let Some(role) = role else {
        return Vec::new();
    };
    group
        .documents
        .iter()
        .map(|doc| SignerDocument {
            id: doc.id.clone(),
            action: if doc.roles.iter().any(|r| r == role) {
                "sign".to_string()
            } else {
                "view".to_string()
            },
            role: role.to_string(),
        })
        .collect()
}

fn assign_emails(
    recipients: Vec<GroupRecipient>,
    spec: &GroupFromTemplateSpec,
    form: &Form,
) -> Vec<GroupRecipient> {
    recipients
        .into_iter()
        .map(|mut recipient| {
            if let Some(email) = email_for(
                &spec.recipients,
                &recipient.name,
                spec.role_match,
                spec.default_email.as_ref(),
                form,
            ) {
                recipient.email = Some(email);
            }
            recipient
        })
        .collect()
}
