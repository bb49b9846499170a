//! reqwest implementation of [`SignApi`]

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use super::error::{ApiError, ResponseExt};
use super::types::{
    Document, DocumentGroup, Download, EditLinkOptions, EmailInvite, EmbeddedSigner, FieldValue,
    GroupEmailInvite, GroupInvite, GroupInviteStep, GroupRecipient, InviteRef, LinkOptions,
    SendingLinkOptions,
};
use super::SignApi;
use crate::config::SignNowConfig;
use crate::logger;

/// Scope requested by the password grant for the process-wide token
const FULL_SCOPE: &str = "*";

#[derive(Deserialize)]
struct IdResponse {
    #[serde(default)]
    id: Option<String>,
}

impl IdResponse {
    /// A create call without an id in its response cannot be followed up
    fn into_id(self, operation: &'static str) -> Result<String, ApiError> {
        self.id
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingField {
                operation,
                field: "id",
            })
    }
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
struct LinkData {
    link: String,
}

#[derive(Deserialize)]
struct UrlData {
    url: String,
}

#[derive(Deserialize)]
struct UniqueIdData {
    unique_id: String,
}

#[derive(Deserialize)]
struct RecipientsData {
    recipients: Vec<GroupRecipient>,
}

#[derive(Deserialize)]
struct GroupInviteResponse {
    invite: GroupInvite,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct GroupInviteRequest<'a> {
    invite_steps: &'a [GroupInviteStep],
    sign_as_merged: bool,
}

#[derive(Serialize)]
struct GroupLinkRequest<'a> {
    email: &'a str,
    auth_method: &'a str,
    link_expiration: u32,
}

struct Credentials {
    basic_token: String,
    user: String,
    password: String,
}

pub struct HttpSignApi {
    base_url: String,
    client: reqwest::Client,
    credentials: Credentials,
    token: RwLock<Option<String>>,
}

impl HttpSignApi {
    pub fn new(config: &SignNowConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent(concat!("esign_samples/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.api_host.trim_end_matches('/').to_string(),
            client,
            credentials: Credentials {
                basic_token: config.basic_token.clone(),
                user: config.user.clone(),
                password: config.password.clone(),
            },
            token: RwLock::new(config.access_token.clone().filter(|t| !t.is_empty())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn request_token(&self, scope: &str) -> Result<String, ApiError> {
        let path = "/oauth2/token";
        let started = Instant::now();
        let result = self
            .client
            .post(self.url(path))
            .header(AUTHORIZATION, format!("Basic {}", self.credentials.basic_token))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.user.as_str()),
                ("password", self.credentials.password.as_str()),
                ("scope", scope),
            ])
            .send()
            .await;
        log_result("POST", path, &result, started);

        let response = result.map_api_error().await.map_err(|e| match e {
            ApiError::Status { message, .. } => ApiError::Auth(message),
            other => other,
        })?;
        let token: TokenResponse = decode(response, "oauth2/token").await?;
        Ok(token.access_token)
    }

    /// Cached bearer token, obtained through the password grant on first use
    async fn bearer(&self) -> Result<String, ApiError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // another request may have filled the slot while we waited
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.request_token(FULL_SCOPE).await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<Response, ApiError> {
        let token = self.bearer().await?;
        let started = Instant::now();
        let result = builder.bearer_auth(token).send().await;
        log_result(method, path, &result, started);
        result.map_api_error().await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.client.get(self.url(path)), "GET", path)
            .await?;
        decode(response, operation).await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body).await?;
        decode(response, operation).await
    }

    async fn send<B>(&self, method: Method, path: &str, body: &B) -> Result<Response, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let builder = self.client.request(method.clone(), self.url(path)).json(body);
        self.execute(builder, method.as_str(), path).await
    }
}

#[async_trait]
impl SignApi for HttpSignApi {
    async fn clone_template(&self, template_id: &str) -> Result<String, ApiError> {
        let path = format!("/template/{template_id}/copy");
        let created: IdResponse = self
            .send_json(Method::POST, "clone_template", &path, &json!({}))
            .await?;
        created.into_id("clone_template")
    }

    async fn get_document(&self, document_id: &str) -> Result<Document, ApiError> {
        self.get_json("get_document", &format!("/document/{document_id}"))
            .await
    }

    async fn prefill_fields(
        &self,
        document_id: &str,
        fields: &[FieldValue],
    ) -> Result<(), ApiError> {
        let path = format!("/v2/documents/{document_id}/prefill-texts");
        self.send(Method::PUT, &path, &json!({ "fields": fields }))
            .await?;
        Ok(())
    }

    async fn create_invite(
        &self,
        document_id: &str,
        signers: &[EmbeddedSigner],
    ) -> Result<Vec<InviteRef>, ApiError> {
        let path = format!("/v2/documents/{document_id}/embedded-invites");
        let created: Data<Vec<InviteRef>> = self
            .send_json(Method::POST, "create_invite", &path, &json!({ "invites": signers }))
            .await?;
        Ok(created.data)
    }

    async fn create_invite_link(
        &self,
        document_id: &str,
        invite_id: &str,
        options: &LinkOptions,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/documents/{document_id}/embedded-invites/{invite_id}/link");
        let link: Data<LinkData> = self
            .send_json(Method::POST, "create_invite_link", &path, options)
            .await?;
        Ok(link.data.link)
    }

    async fn create_sending_link(
        &self,
        document_id: &str,
        options: &SendingLinkOptions,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/documents/{document_id}/embedded-sending");
        let link: Data<UrlData> = self
            .send_json(Method::POST, "create_sending_link", &path, options)
            .await?;
        Ok(link.data.url)
    }

    async fn send_email_invite(
        &self,
        document_id: &str,
        invite: &EmailInvite,
    ) -> Result<(), ApiError> {
        let path = format!("/document/{document_id}/invite");
        self.send(Method::POST, &path, invite).await?;
        Ok(())
    }

    async fn create_group(
        &self,
        name: &str,
        document_ids: &[String],
    ) -> Result<String, ApiError> {
        let body = json!({ "document_ids": document_ids, "group_name": name });
        let created: IdResponse = self
            .send_json(Method::POST, "create_group", "/documentgroup", &body)
            .await?;
        created.into_id("create_group")
    }

    async fn create_group_from_template(
        &self,
        template_id: &str,
        name: &str,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/document-group-templates/{template_id}/document-group");
        let created: Data<UniqueIdData> = self
            .send_json(
                Method::POST,
                "create_group_from_template",
                &path,
                &json!({ "group_name": name }),
            )
            .await?;
        Ok(created.data.unique_id)
    }

    async fn get_group(&self, group_id: &str) -> Result<DocumentGroup, ApiError> {
        self.get_json("get_group", &format!("/documentgroup/{group_id}"))
            .await
    }

    async fn get_group_recipients(
        &self,
        group_id: &str,
    ) -> Result<Vec<GroupRecipient>, ApiError> {
        let path = format!("/v2/document-groups/{group_id}/recipients");
        let recipients: Data<RecipientsData> =
            self.get_json("get_group_recipients", &path).await?;
        Ok(recipients.data.recipients)
    }

    async fn update_group_recipients(
        &self,
        group_id: &str,
        recipients: &[GroupRecipient],
    ) -> Result<(), ApiError> {
        let path = format!("/v2/document-groups/{group_id}/recipients");
        self.send(Method::PUT, &path, &json!({ "recipients": recipients }))
            .await?;
        Ok(())
    }

    async fn create_group_invite(
        &self,
        group_id: &str,
        steps: &[GroupInviteStep],
    ) -> Result<String, ApiError> {
        let path = format!("/v2/document-groups/{group_id}/embedded-invites");
        let body = GroupInviteRequest {
            invite_steps: steps,
            sign_as_merged: true,
        };
        let created: Data<IdResponse> = self
            .send_json(Method::POST, "create_group_invite", &path, &body)
            .await?;
        created.data.into_id("create_group_invite")
    }

    async fn send_group_email_invite(
        &self,
        group_id: &str,
        invite: &GroupEmailInvite,
    ) -> Result<(), ApiError> {
        let path = format!("/documentgroup/{group_id}/groupinvite");
        self.send(Method::POST, &path, invite).await?;
        Ok(())
    }

    async fn create_group_invite_link(
        &self,
        group_id: &str,
        invite_id: &str,
        email: &str,
        options: &LinkOptions,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/document-groups/{group_id}/embedded-invites/{invite_id}/link");
        let body = GroupLinkRequest {
            email,
            auth_method: &options.auth_method,
            link_expiration: options.link_expiration,
        };
        let link: Data<LinkData> = self
            .send_json(Method::POST, "create_group_invite_link", &path, &body)
            .await?;
        Ok(link.data.link)
    }

    async fn create_group_sending_link(
        &self,
        group_id: &str,
        options: &SendingLinkOptions,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/document-groups/{group_id}/embedded-sending");
        let link: Data<UrlData> = self
            .send_json(Method::POST, "create_group_sending_link", &path, options)
            .await?;
        Ok(link.data.url)
    }

    async fn create_group_edit_link(
        &self,
        group_id: &str,
        options: &EditLinkOptions,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/document-groups/{group_id}/embedded-editor");
        let link: Data<UrlData> = self
            .send_json(Method::POST, "create_group_edit_link", &path, options)
            .await?;
        Ok(link.data.url)
    }

    async fn get_group_invite(
        &self,
        group_id: &str,
        invite_id: &str,
    ) -> Result<GroupInvite, ApiError> {
        let path = format!("/documentgroup/{group_id}/groupinvite/{invite_id}");
        let response: GroupInviteResponse = self.get_json("get_group_invite", &path).await?;
        Ok(response.invite)
    }

    async fn download_document(&self, document_id: &str) -> Result<Download, ApiError> {
        let path = format!("/document/{document_id}/download");
        let builder = self
            .client
            .get(self.url(&path))
            .query(&[("type", "collapsed")]);
        let response = self.execute(builder, "GET", &path).await?;
        read_download(response, "download_document").await
    }

    async fn download_group(&self, group_id: &str) -> Result<Download, ApiError> {
        let path = format!("/documentgroup/{group_id}/downloadall");
        let body = json!({ "type": "merged", "with_history": "no", "document_order": [] });
        let response = self.send(Method::POST, &path, &body).await?;
        read_download(response, "download_group").await
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        self.bearer().await
    }

    async fn limited_token(&self, scope: &str) -> Result<String, ApiError> {
        self.request_token(scope).await
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    operation: &'static str,
) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|e| ApiError::Decode {
        operation,
        message: e.to_string(),
    })
}

async fn read_download(response: Response, operation: &'static str) -> Result<Download, ApiError> {
    let filename = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition);
    let content = response.bytes().await.map_err(|e| ApiError::Decode {
        operation,
        message: e.to_string(),
    })?;
    Ok(Download { filename, content })
}

fn log_result(
    method: &str,
    path: &str,
    result: &Result<Response, reqwest::Error>,
    started: Instant,
) {
    match result {
        Ok(response) => {
            logger::log_api_call(method, path, response.status().as_u16(), started.elapsed());
        }
        Err(e) => logger::log_error(&format!("[SignNow] {method} {path} failed: {e}")),
    }
}

/// Extract the file name from a `Content-Disposition` header value
fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn api_for(server: &mockito::Server, access_token: Option<&str>) -> HttpSignApi {
        let config = SignNowConfig {
            api_host: server.url(),
            basic_token: "YmFzaWM=".to_string(),
            user: "user@example.com".to_string(),
            password: "secret".to_string(),
            access_token: access_token.map(ToString::to_string),
            request_timeout: 5,
        };
        HttpSignApi::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_password_grant_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/oauth2/token")
            .match_header("authorization", "Basic YmFzaWM=")
            .match_body(Matcher::UrlEncoded(
                "grant_type".to_string(),
                "password".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok","token_type":"bearer"}"#)
            .expect(1)
            .create_async()
            .await;
        let doc_mock = server
            .mock("GET", "/document/D1")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"D1","roles":[{"unique_id":"R1","name":"Recipient 1"}]}"#)
            .expect(2)
            .create_async()
            .await;

        let api = api_for(&server, None);
        let first = api.get_document("D1").await.unwrap();
        let second = api.get_document("D1").await.unwrap();

        assert_eq!(first.roles[0].unique_id, "R1");
        assert_eq!(second.roles.len(), 1);
        token_mock.assert_async().await;
        doc_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/template/T1/copy")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errors":[{"code":65582,"message":"Invalid template id"}]}"#)
            .create_async()
            .await;

        let api = api_for(&server, Some("preissued"));
        let err = api.clone_template("T1").await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(err.to_string(), "Invalid template id");
    }

    #[tokio::test]
    async fn test_clone_without_id_is_missing_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/template/T1/copy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"copy"}"#)
            .create_async()
            .await;

        let api = api_for(&server, Some("preissued"));
        let err = api.clone_template("T1").await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::MissingField {
                operation: "clone_template",
                field: "id"
            }
        ));
        assert_eq!(
            err.to_string(),
            "response from clone_template is missing id"
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials_map_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let api = api_for(&server, None);
        let err = api.access_token().await.unwrap_err();

        assert!(matches!(err, ApiError::Auth(ref m) if m == "invalid_client"));
    }

    #[tokio::test]
    async fn test_create_invite_threads_signers_and_reads_ids() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/documents/D1/embedded-invites")
            .match_header("authorization", "Bearer preissued")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "invites": [{"email": "a@example.com", "role_id": "R1", "order": 1}]
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":"I1","email":"a@example.com","role_id":"R1","order":1}]}"#)
            .create_async()
            .await;

        let api = api_for(&server, Some("preissued"));
        let signer = EmbeddedSigner {
            email: "a@example.com".to_string(),
            role_id: "R1".to_string(),
            order: 1,
        };
        let invites = api.create_invite("D1", &[signer]).await.unwrap();

        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].id, "I1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_group_email_invite_posts_steps() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/documentgroup/G1/groupinvite")
            .match_header("authorization", "Bearer preissued")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "invite_steps": [{"order": 1, "invite_actions": [{"document_id": "D1"}]}],
                "sign_as_merged": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"GI1","pending_invite_link":null}"#)
            .create_async()
            .await;

        let api = api_for(&server, Some("preissued"));
        let invite = GroupEmailInvite {
            invite_steps: vec![crate::signnow::GroupEmailStep {
                order: 1,
                invite_emails: Vec::new(),
                invite_actions: vec![crate::signnow::InviteAction {
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
        api.send_group_email_invite("G1", &invite).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_reads_filename_from_disposition() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/document/D1/download".to_string()))
            .match_query(Matcher::UrlEncoded(
                "type".to_string(),
                "collapsed".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_header("content-disposition", "attachment; filename=\"signed.pdf\"")
            .with_body("%PDF-1.7")
            .create_async()
            .await;

        let api = api_for(&server, Some("preissued"));
        let download = api.download_document("D1").await.unwrap();

        assert_eq!(download.filename.as_deref(), Some("signed.pdf"));
        assert_eq!(&download.content[..], b"%PDF-1.7");
    }

    #[test]
    fn test_filename_from_disposition_variants() {
        assert_eq!(
            filename_from_disposition("attachment; filename=report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(filename_from_disposition("attachment"), None);
        assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
    }
}
