use serde::Deserialize;

use super::{Created, FlowContext, RedirectSpec, DOCUMENT_ID};
use crate::pipeline::links::{append_redirect_uri, rewrite_access_token};
use crate::pipeline::prefill::{prefill_document, FieldBinding};
use crate::pipeline::roles::{find_role_id, RoleMatch};
use crate::pipeline::{FlowError, Form, ValueSource};
use crate::signnow::{
    EmailInvite, EmailRecipient, EmbeddedSigner, InviteRef, LinkOptions, SendingLinkOptions,
};

#[allow(clippy::missing_const_for_fn)]
fn default_role() -> String {
    "Recipient 1".to_string()
}

/// Clone, prefill, invite one embedded signer and hand back the signing link
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedInviteSpec {
    pub template_id: String,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub role_match: RoleMatch,
    pub signer: ValueSource,
    #[serde(default)]
    pub redirect: Option<RedirectSpec>,
}

/// Clone, prefill and open the embedded sending page for the document
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedSendingSpec {
    pub template_id: String,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
    #[serde(rename = "type", default = "default_sending_type")]
    pub kind: String,
    pub redirect: RedirectSpec,
    #[serde(default)]
    pub link_expiration: Option<u32>,
    /// Swap the returned link's token for the client's own bearer token
    #[serde(default)]
    pub token_rewrite: Option<TokenRewrite>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_sending_type() -> String {
    "document".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenRewrite {
    /// Value written to the link's `embedded` parameter
    #[serde(default = "default_embedded")]
    pub embedded: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_embedded() -> String {
    "0".to_string()
}

/// Clone, prefill and send the document to its signer by email
#[derive(Debug, Clone, Deserialize)]
pub struct EmailInviteSpec {
    pub template_id: String,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub role_match: RoleMatch,
    pub signer: ValueSource,
    #[serde(default = "default_role_label")]
    pub role_label: String,
    pub from: String,
    pub subject: String,
    pub message: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_role_label() -> String {
    "signer".to_string()
}

pub async fn embedded_invite(
    ctx: &FlowContext<'_>,
    spec: &EmbeddedInviteSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let email = spec.signer.require(form)?;

    let document_id = ctx.api.clone_template(&spec.template_id).await?;
    ctx.step(&format!("cloned {} into {document_id}", spec.template_id));

    let document = prefill_document(ctx.api, &document_id, &spec.fields, form).await?;
    let role_id = find_role_id(&document.roles, &spec.role, spec.role_match)?;

    let signer = EmbeddedSigner {
        email: email.clone(),
        role_id,
        order: 1,
    };
    let invites = ctx.api.create_invite(&document_id, &[signer]).await?;
    let invite_id = pick_invite(&invites, &email)?;
    ctx.step(&format!("created invite {invite_id}"));

    let options = LinkOptions::unauthenticated(ctx.link_expiration);
    let mut link = ctx
        .api
        .create_invite_link(&document_id, &invite_id, &options)
        .await?;
    if let Some(redirect) = &spec.redirect {
        let callback = ctx.redirect_url(redirect, DOCUMENT_ID, &document_id)?;
        link = append_redirect_uri(&link, &callback, redirect.encode);
    }

    Ok(Created {
        link: Some(link),
        document_id: Some(document_id),
        document_group_id: None,
    })
}

pub async fn embedded_sending(
    ctx: &FlowContext<'_>,
    spec: &EmbeddedSendingSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let document_id = ctx.api.clone_template(&spec.template_id).await?;
    ctx.step(&format!("cloned {} into {document_id}", spec.template_id));

    prefill_document(ctx.api, &document_id, &spec.fields, form).await?;

    let options = SendingLinkOptions {
        kind: spec.kind.clone(),
        redirect_uri: ctx.redirect_url(&spec.redirect, DOCUMENT_ID, &document_id)?,
        link_expiration: spec.link_expiration.unwrap_or(ctx.link_expiration),
        redirect_target: spec.redirect.target.clone(),
    };
    let mut link = ctx.api.create_sending_link(&document_id, &options).await?;

    if let Some(rewrite) = &spec.token_rewrite {
        let token = ctx.api.access_token().await?;
        link = rewrite_access_token(&link, &token, &rewrite.embedded)?;
    }

    Ok(Created {
        link: Some(link),
        document_id: Some(document_id),
        document_group_id: None,
    })
}

pub async fn email_invite(
    ctx: &FlowContext<'_>,
    spec: &EmailInviteSpec,
    form: &Form,
) -> Result<Created, FlowError> {
    let email = spec.signer.require(form)?;

    let document_id = ctx.api.clone_template(&spec.template_id).await?;
    ctx.step(&format!("cloned {} into {document_id}", spec.template_id));

    let document = prefill_document(ctx.api, &document_id, &spec.fields, form).await?;
    let role_id = find_role_id(&document.roles, &spec.role, spec.role_match)?;

    let invite = EmailInvite {
        to: vec![EmailRecipient {
            email,
            role_id,
            role: spec.role_label.clone(),
            order: 1,
            subject: spec.subject.clone(),
            message: spec.message.clone(),
        }],
        from: spec.from.clone(),
        subject: spec.subject.clone(),
        message: spec.message.clone(),
    };
    ctx.api.send_email_invite(&document_id, &invite).await?;

    Ok(Created {
        link: None,
        document_id: Some(document_id),
        document_group_id: None,
    })
}

/// Invite created for the given signer; email case is not significant
fn pick_invite(invites: &[InviteRef], email: &str) -> Result<String, FlowError> {
    invites
        .iter()
        .find(|invite| invite.email.eq_ignore_ascii_case(email))
        .map(|invite| invite.id.clone())
        .ok_or_else(|| FlowError::InviteNotFound(email.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::flows::{Flow, FlowOutput};
    use crate::signnow::fake::FakeSignApi;
    use crate::signnow::{ApiError, Document};

    fn ctx<'a>(api: &'a FakeSignApi, sample: &'a str) -> FlowContext<'a> {
        FlowContext {
            api,
            sample,
            public_url: "http://localhost:8080",
            link_expiration: 15,
        }
    }

    fn document(fields: &[&str]) -> Document {
        let fields: Vec<serde_json::Value> = fields
            .iter()
            .map(|n| serde_json::json!({"type": "text", "json_attributes": {"name": n}}))
            .collect();
        serde_json::from_value(serde_json::json!({
            "roles": [{"unique_id": "R1", "name": "Recipient 1"}],
            "fields": fields,
        }))
        .unwrap()
    }

    fn flow(src: &str) -> Flow {
        toml::from_str(src).unwrap()
    }

    async fn created(flow: &Flow, ctx: &FlowContext<'_>, form: &Form) -> Created {
        match flow.run(ctx, form).await.unwrap() {
            FlowOutput::Created(created) => created,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embedded_invite_threads_ids_in_order() {
        let api = FakeSignApi::new()
            .with_clone("T1", "D1")
            .with_document("D1", document(&["Name"]))
            .with_invites(vec![InviteRef {
                id: "I1".to_string(),
                email: "signer@example.com".to_string(),
            }])
            .with_link("https://sign/x");
        let flow = flow(
            r#"
            flow = "embedded-invite"
            template_id = "T1"
            signer = { value = "signer@example.com" }
            fields = [{ field = "Name", form = "full_name" }]
            redirect = { page = "download-container" }
            "#,
        );
        let form = Form::from_json(br#"{"full_name":"Jane Doe"}"#).unwrap();

        let created = created(&flow, &ctx(&api, "Demo"), &form).await;

        assert_eq!(
            api.calls(),
            vec![
                "clone_template T1",
                "get_document D1",
                "prefill_fields D1",
                "create_invite D1",
                "create_invite_link D1 I1",
            ]
        );
        assert_eq!(api.signers()[0].role_id, "R1");
        assert_eq!(created.document_id.as_deref(), Some("D1"));
        assert_eq!(
            created.link.as_deref(),
            Some(
                "https://sign/x&redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fsamples%2FDemo%3Fpage%3Ddownload-container%26document_id%3DD1"
            )
        );
    }

    #[tokio::test]
    async fn test_embedded_invite_missing_role_stops_before_invite() {
        let api = FakeSignApi::new().with_clone("T1", "D1");
        let flow = flow(
            r#"
            flow = "embedded-invite"
            template_id = "T1"
            role = "Signer"
            signer = { value = "signer@example.com" }
            "#,
        );

        let err = flow
            .run(&ctx(&api, "Demo"), &Form::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::RoleNotFound(ref r) if r == "Signer"));
        assert_eq!(api.calls(), vec!["clone_template T1", "get_document D1"]);
    }

    #[tokio::test]
    async fn test_embedded_invite_requires_signer_before_any_call() {
        let api = FakeSignApi::new();
        let flow = flow(
            r#"
            flow = "embedded-invite"
            template_id = "T1"
            signer = { form = "email" }
            "#,
        );

        let err = flow
            .run(&ctx(&api, "Demo"), &Form::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::MissingInput(ref k) if k == "email"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_aborts_remaining_steps() {
        let api = FakeSignApi::new()
            .with_clone("T1", "D1")
            .with_document("D1", document(&[]))
            .failing_on("create_invite");
        let flow = flow(
            r#"
            flow = "embedded-invite"
            template_id = "T1"
            signer = { value = "signer@example.com" }
            "#,
        );

        let err = flow
            .run(&ctx(&api, "Demo"), &Form::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Api(ApiError::Status { .. })));
        assert_eq!(api.calls().last().map(String::as_str), Some("create_invite D1"));
    }

    #[tokio::test]
    async fn test_embedded_sending_rewrites_token() {
        let api = FakeSignApi::new()
            .with_clone("T1", "D1")
            .with_document("D1", document(&["Name"]))
            .with_link("https://app.signnow.com/webapp/document/D1?access_token=remote&embedded=1");
        let flow = flow(
            r#"
            flow = "embedded-sending"
            template_id = "T1"
            link_expiration = 16
            redirect = { page = "download-container", target = "blank" }
            token_rewrite = {}
            fields = [{ field = "Name", form = "name" }]
            "#,
        );
        let form = Form::from_json(br#"{"name":"Jane"}"#).unwrap();

        let created = created(&flow, &ctx(&api, "Loan"), &form).await;

        assert_eq!(
            api.calls(),
            vec![
                "clone_template T1",
                "get_document D1",
                "prefill_fields D1",
                "create_sending_link D1",
                "access_token",
            ]
        );
        let options = &api.sending_options()[0];
        assert_eq!(options.kind, "document");
        assert_eq!(options.link_expiration, 16);
        assert_eq!(options.redirect_target, "blank");
        assert_eq!(
            options.redirect_uri,
            "http://localhost:8080/samples/Loan?page=download-container&document_id=D1"
        );
        let link = created.link.unwrap();
        assert!(link.contains("access_token=token-abc"));
        assert!(link.contains("embedded=0"));
    }

    #[tokio::test]
    async fn test_email_invite_sends_to_recipient_role() {
        let api = FakeSignApi::new()
            .with_clone("T1", "D1")
            .with_document("D1", document(&["Name"]));
        let flow = flow(
            r#"
            flow = "email-invite"
            template_id = "T1"
            signer = { form = "email" }
            from = "from@email.com"
            subject = "Subject"
            message = "Message"
            fields = [{ field = "Name", form = "name" }]
            "#,
        );
        let form = Form::from_json(br#"{"name":"Jane","email":"jane@example.com"}"#).unwrap();

        let created = created(&flow, &ctx(&api, "OneClick"), &form).await;

        assert_eq!(created.document_id.as_deref(), Some("D1"));
        assert_eq!(created.link, None);
        let invite = &api.email_invites()[0];
        assert_eq!(invite.to[0].email, "jane@example.com");
        assert_eq!(invite.to[0].role_id, "R1");
        assert_eq!(invite.to[0].role, "signer");
        assert_eq!(api.calls().last().map(String::as_str), Some("send_email_invite D1"));
    }

    #[test]
    fn test_pick_invite_matches_email_case_insensitively() {
        let invites = vec![
            InviteRef {
                id: "I1".to_string(),
                email: "a@example.com".to_string(),
            },
            InviteRef {
                id: "I2".to_string(),
                email: "B@Example.com".to_string(),
            },
        ];
        assert_eq!(pick_invite(&invites, "b@example.com").unwrap(), "I2");
        assert!(matches!(
            pick_invite(&invites, "c@example.com"),
            Err(FlowError::InviteNotFound(ref e)) if e == "c@example.com"
        ));
        assert!(matches!(
            pick_invite(&[], "c@example.com"),
            Err(FlowError::InviteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_embedded_invite_for_another_signer_stops_before_link() {
        let api = FakeSignApi::new()
            .with_clone("T1", "D1")
            .with_document("D1", document(&[]))
            .with_invites(vec![InviteRef {
                id: "I1".to_string(),
                email: "someone.else@example.com".to_string(),
            }]);
        let flow = flow(
            r#"
            flow = "embedded-invite"
            template_id = "T1"
            signer = { value = "signer@example.com" }
            "#,
        );

        let err = flow
            .run(&ctx(&api, "Demo"), &Form::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::InviteNotFound(ref e) if e == "signer@example.com"));
        assert_eq!(
            api.calls(),
            vec!["clone_template T1", "get_document D1", "create_invite D1"]
        );
    }
}
