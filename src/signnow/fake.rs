//! Recording in-memory [`SignApi`] used by pipeline and sample tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use hyper::body::Bytes;

use super::{
    ApiError, Document, DocumentGroup, Download, EditLinkOptions, EmailInvite, EmbeddedSigner,
    FieldValue, GroupEmailInvite, GroupInvite, GroupInviteStep, GroupRecipient, InviteRef,
    LinkOptions, SendingLinkOptions, SignApi,
};

/// Every call is appended to `calls` as `"<operation> <args>"`
#[derive(Default)]
pub struct FakeSignApi {
    clones: HashMap<String, String>,
    documents: HashMap<String, Document>,
    invites: Option<Vec<InviteRef>>,
    link: Option<String>,
    groups: HashMap<String, DocumentGroup>,
    recipients: HashMap<String, Vec<GroupRecipient>>,
    group_invite: Option<GroupInvite>,
    download: Option<Download>,
    fail_on: Option<&'static str>,
    calls: Mutex<Vec<String>>,
    prefills: Mutex<Vec<(String, Vec<FieldValue>)>>,
    signers: Mutex<Vec<EmbeddedSigner>>,
    updated_recipients: Mutex<Vec<GroupRecipient>>,
    steps: Mutex<Vec<GroupInviteStep>>,
    sending: Mutex<Vec<SendingLinkOptions>>,
    email_invites: Mutex<Vec<EmailInvite>>,
    group_email_invites: Mutex<Vec<GroupEmailInvite>>,
}

impl FakeSignApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clone(mut self, template_id: &str, document_id: &str) -> Self {
        self.clones
            .insert(template_id.to_string(), document_id.to_string());
        self
    }

    pub fn with_document(mut self, document_id: &str, document: Document) -> Self {
        self.documents.insert(document_id.to_string(), document);
        self
    }

    pub fn with_invites(mut self, invites: Vec<InviteRef>) -> Self {
        self.invites = Some(invites);
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn with_group(mut self, group: DocumentGroup) -> Self {
        self.groups.insert(group.id.clone(), group);
        self
    }

    pub fn with_recipients(mut self, group_id: &str, recipients: Vec<GroupRecipient>) -> Self {
        self.recipients.insert(group_id.to_string(), recipients);
        self
    }

    pub fn with_group_invite(mut self, invite: GroupInvite) -> Self {
        self.group_invite = Some(invite);
        self
    }

    pub fn with_download(mut self, filename: Option<&str>, content: &'static [u8]) -> Self {
        self.download = Some(Download {
            filename: filename.map(ToString::to_string),
            content: Bytes::from_static(content),
        });
        self
    }

    /// Make the named operation fail with a remote status error
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prefills(&self) -> Vec<(String, Vec<FieldValue>)> {
        self.prefills.lock().unwrap().clone()
    }

    pub fn signers(&self) -> Vec<EmbeddedSigner> {
        self.signers.lock().unwrap().clone()
    }

    pub fn updated_recipients(&self) -> Vec<GroupRecipient> {
        self.updated_recipients.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<GroupInviteStep> {
        self.steps.lock().unwrap().clone()
    }

    pub fn sending_options(&self) -> Vec<SendingLinkOptions> {
        self.sending.lock().unwrap().clone()
    }

    pub fn email_invites(&self) -> Vec<EmailInvite> {
        self.email_invites.lock().unwrap().clone()
    }

    pub fn group_email_invites(&self) -> Vec<GroupEmailInvite> {
        self.group_email_invites.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, args: &str) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation} {args}").trim_end().to_string());
        if self.fail_on == Some(operation) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{operation} failed"),
            });
        }
        Ok(())
    }

    fn link_or(&self, fallback: String) -> String {
        self.link.clone().unwrap_or(fallback)
    }

    fn download_or_default(&self) -> Download {
        self.download.clone().unwrap_or_else(|| Download {
            filename: None,
            content: Bytes::from_static(b"%PDF-fake"),
        })
    }
}

#[async_trait]
impl SignApi for FakeSignApi {
    async fn clone_template(&self, template_id: &str) -> Result<String, ApiError> {
        self.record("clone_template", template_id)?;
        Ok(self
            .clones
            .get(template_id)
            .cloned()
            .unwrap_or_else(|| format!("doc-{template_id}")))
    }

    async fn get_document(&self, document_id: &str) -> Result<Document, ApiError> {
        self.record("get_document", document_id)?;
        Ok(self
            .documents
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn prefill_fields(
        &self,
        document_id: &str,
        fields: &[FieldValue],
    ) -> Result<(), ApiError> {
        self.record("prefill_fields", document_id)?;
        self.prefills
            .lock()
            .unwrap()
            .push((document_id.to_string(), fields.to_vec()));
        Ok(())
    }

    async fn create_invite(
        &self,
        document_id: &str,
        signers: &[EmbeddedSigner],
    ) -> Result<Vec<InviteRef>, ApiError> {
        self.record("create_invite", document_id)?;
        self.signers.lock().unwrap().extend_from_slice(signers);
        Ok(self.invites.clone().unwrap_or_else(|| {
            signers
                .iter()
                .enumerate()
                .map(|(i, s)| InviteRef {
                    id: format!("inv-{}", i + 1),
                    email: s.email.clone(),
                })
                .collect()
        }))
    }

    async fn create_invite_link(
        &self,
        document_id: &str,
        invite_id: &str,
        _options: &LinkOptions,
    ) -> Result<String, ApiError> {
        self.record("create_invite_link", &format!("{document_id} {invite_id}"))?;
        Ok(self.link_or(format!("https://sign/{document_id}")))
    }

    async fn create_sending_link(
        &self,
        document_id: &str,
        options: &SendingLinkOptions,
    ) -> Result<String, ApiError> {
        self.record("create_sending_link", document_id)?;
        self.sending.lock().unwrap().push(options.clone());
        Ok(self.link_or(format!("https://send/{document_id}")))
    }

    async fn send_email_invite(
        &self,
        document_id: &str,
        invite: &EmailInvite,
    ) -> Result<(), ApiError> {
        self.record("send_email_invite", document_id)?;
        self.email_invites.lock().unwrap().push(invite.clone());
        Ok(())
    }

    async fn create_group(
        &self,
        name: &str,
        document_ids: &[String],
    ) -> Result<String, ApiError> {
        self.record("create_group", &format!("{name} [{}]", document_ids.join(",")))?;
        Ok("G1".to_string())
    }

    async fn create_group_from_template(
        &self,
        template_id: &str,
        _name: &str,
    ) -> Result<String, ApiError> {
        self.record("create_group_from_template", template_id)?;
        Ok(format!("group-{template_id}"))
    }

    async fn get_group(&self, group_id: &str) -> Result<DocumentGroup, ApiError> {
        self.record("get_group", group_id)?;
        Ok(self
            .groups
            .get(group_id)
            .cloned()
            .unwrap_or_else(|| DocumentGroup {
                id: group_id.to_string(),
                ..DocumentGroup::default()
            }))
    }

    async fn get_group_recipients(
        &self,
        group_id: &str,
    ) -> Result<Vec<GroupRecipient>, ApiError> {
        self.record("get_group_recipients", group_id)?;
        Ok(self.recipients.get(group_id).cloned().unwrap_or_default())
    }

    async fn update_group_recipients(
        &self,
        group_id: &str,
        recipients: &[GroupRecipient],
    ) -> Result<(), ApiError> {
        self.record("update_group_recipients", group_id)?;
        self.updated_recipients
            .lock()
            .unwrap()
            .extend_from_slice(recipients);
        Ok(())
    }

    async fn create_group_invite(
        &self,
        group_id: &str,
        steps: &[GroupInviteStep],
    ) -> Result<String, ApiError> {
        self.record("create_group_invite", group_id)?;
        self.steps.lock().unwrap().extend_from_slice(steps);
        Ok("GI1".to_string())
    }

    async fn send_group_email_invite(
        &self,
        group_id: &str,
        invite: &GroupEmailInvite,
    ) -> Result<(), ApiError> {
        self.record("send_group_email_invite", group_id)?;
        self.group_email_invites.lock().unwrap().push(invite.clone());
        Ok(())
    }

    async fn create_group_invite_link(
        &self,
        group_id: &str,
        invite_id: &str,
        email: &str,
        _options: &LinkOptions,
    ) -> Result<String, ApiError> {
        self.record(
            "create_group_invite_link",
            &format!("{group_id} {invite_id} {email}"),
        )?;
        Ok(self.link_or(format!("https://sign/group/{group_id}")))
    }

    async fn create_group_sending_link(
        &self,
        group_id: &str,
        options: &SendingLinkOptions,
    ) -> Result<String, ApiError> {
        self.record("create_group_sending_link", group_id)?;
        self.sending.lock().unwrap().push(options.clone());
        Ok(self.link_or(format!("https://send/group/{group_id}")))
    }

    async fn create_group_edit_link(
        &self,
        group_id: &str,
        _options: &EditLinkOptions,
    ) -> Result<String, ApiError> {
        self.record("create_group_edit_link", group_id)?;
        Ok(self.link_or(format!("https://edit/group/{group_id}")))
    }

    async fn get_group_invite(
        &self,
        group_id: &str,
        invite_id: &str,
    ) -> Result<GroupInvite, ApiError> {
        self.record("get_group_invite", &format!("{group_id} {invite_id}"))?;
        Ok(self.group_invite.clone().unwrap_or_default())
    }

    async fn download_document(&self, document_id: &str) -> Result<Download, ApiError> {
        self.record("download_document", document_id)?;
        Ok(self.download_or_default())
    }

    async fn download_group(&self, group_id: &str) -> Result<Download, ApiError> {
        self.record("download_group", group_id)?;
        Ok(self.download_or_default())
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        self.record("access_token", "")?;
        Ok("token-abc".to_string())
    }

    async fn limited_token(&self, scope: &str) -> Result<String, ApiError> {
        self.record("limited_token", scope)?;
        Ok("limited-token".to_string())
    }
}
