//! Remote e-signature API
//!
//! `SignApi` is the single seam between the sample pipeline and the remote
//! service. The production implementation is [`HttpSignApi`]; tests drive the
//! pipeline through a recording fake instead.

mod client;
mod error;
#[cfg(test)]
pub mod fake;
mod types;

use async_trait::async_trait;

pub use client::HttpSignApi;
pub use error::ApiError;
pub use types::{
    Document, DocumentGroup, Download, EditLinkOptions, EmailInvite, EmailRecipient,
    EmbeddedSigner, FieldInvite, FieldValue, GroupDocument, GroupEmailInvite, GroupEmailStep,
    GroupInvite, GroupInviteStep, GroupRecipient, GroupSigner, InviteAction, InviteEmail,
    InviteRef, LinkOptions, Role, SendingLinkOptions, SignerDocument,
};

/// Operations the samples consume from the remote service
#[async_trait]
pub trait SignApi: Send + Sync {
    /// Clone a template into a new document, returning the document id
    async fn clone_template(&self, template_id: &str) -> Result<String, ApiError>;

    async fn get_document(&self, document_id: &str) -> Result<Document, ApiError>;

    async fn prefill_fields(
        &self,
        document_id: &str,
        fields: &[FieldValue],
    ) -> Result<(), ApiError>;

    async fn create_invite(
        &self,
        document_id: &str,
        signers: &[EmbeddedSigner],
    ) -> Result<Vec<InviteRef>, ApiError>;

    async fn create_invite_link(
        &self,
        document_id: &str,
        invite_id: &str,
        options: &LinkOptions,
    ) -> Result<String, ApiError>;

    async fn create_sending_link(
        &self,
        document_id: &str,
        options: &SendingLinkOptions,
    ) -> Result<String, ApiError>;

    async fn send_email_invite(
        &self,
        document_id: &str,
        invite: &EmailInvite,
    ) -> Result<(), ApiError>;

    /// Bundle existing documents into a new group, returning the group id
    async fn create_group(&self, name: &str, document_ids: &[String])
        -> Result<String, ApiError>;

    async fn create_group_from_template(
        &self,
        template_id: &str,
        name: &str,
    ) -> Result<String, ApiError>;

    async fn get_group(&self, group_id: &str) -> Result<DocumentGroup, ApiError>;

    async fn get_group_recipients(&self, group_id: &str)
        -> Result<Vec<GroupRecipient>, ApiError>;

    async fn update_group_recipients(
        &self,
        group_id: &str,
        recipients: &[GroupRecipient],
    ) -> Result<(), ApiError>;

    /// Create an embedded group invite, returning the invite id
    async fn create_group_invite(
        &self,
        group_id: &str,
        steps: &[GroupInviteStep],
    ) -> Result<String, ApiError>;

    /// Have the remote service email the group's signers their invites
    async fn send_group_email_invite(
        &self,
        group_id: &str,
        invite: &GroupEmailInvite,
    ) -> Result<(), ApiError>;

    async fn create_group_invite_link(
        &self,
        group_id: &str,
        invite_id: &str,
        email: &str,
        options: &LinkOptions,
    ) -> Result<String, ApiError>;

    async fn create_group_sending_link(
        &self,
        group_id: &str,
        options: &SendingLinkOptions,
    ) -> Result<String, ApiError>;

    async fn create_group_edit_link(
        &self,
        group_id: &str,
        options: &EditLinkOptions,
    ) -> Result<String, ApiError>;

    async fn get_group_invite(
        &self,
        group_id: &str,
        invite_id: &str,
    ) -> Result<GroupInvite, ApiError>;

    async fn download_document(&self, document_id: &str) -> Result<Download, ApiError>;

    /// Download every document of a group merged into one PDF
    async fn download_group(&self, group_id: &str) -> Result<Download, ApiError>;

    /// Bearer token the client authenticates with
    async fn access_token(&self) -> Result<String, ApiError>;

    /// Issue a token restricted to `scope`
    async fn limited_token(&self, scope: &str) -> Result<String, ApiError>;
}
