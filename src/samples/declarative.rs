//! Catalog-driven sample handler

use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::{json, Map, Value};

use super::catalog::{Action, GetMode, ResponseShape, SampleSpec};
use super::{pages, Sample, SampleContext, SampleResponse};
use crate::pipeline::flows::{DOCUMENT_GROUP_ID, DOCUMENT_ID};
use crate::pipeline::{Created, FlowContext, FlowError, FlowOutput, Form};

pub struct DeclarativeSample {
    spec: SampleSpec,
}

impl DeclarativeSample {
    pub const fn new(spec: SampleSpec) -> Self {
        Self { spec }
    }

    /// Posted action, falling back to the default action for unknown names
    fn action(&self, requested: Option<&str>) -> Option<&Action> {
        requested
            .and_then(|name| self.spec.actions.get(name))
            .or_else(|| {
                self.spec
                    .default_action
                    .as_ref()
                    .and_then(|name| self.spec.actions.get(name))
            })
    }

    async fn run(
        &self,
        ctx: &SampleContext<'_>,
        action: &Action,
        form: &Form,
    ) -> Result<FlowOutput, FlowError> {
        let flow_ctx = FlowContext {
            api: ctx.api,
            sample: &self.spec.name,
            public_url: ctx.public_url,
            link_expiration: ctx.link_expiration,
        };
        action.flow.run(&flow_ctx, form).await
    }

    async fn page(&self, ctx: &SampleContext<'_>) -> Result<SampleResponse, FlowError> {
        let html = pages::load(ctx.static_dir, &self.spec.name, &self.spec.page).await?;
        Ok(SampleResponse::Html(html))
    }

    fn invalid_action(&self, requested: Option<&str>) -> SampleResponse {
        let available: Vec<&str> = self.spec.actions.keys().map(String::as_str).collect();
        SampleResponse::Json(
            StatusCode::BAD_REQUEST,
            json!({
                "success": false,
                "message": format!("Invalid action: {}", requested.unwrap_or_default()),
                "available_actions": available,
            }),
        )
    }
}

fn missing_inputs(action: &Action, form: &Form) -> Option<SampleResponse> {
    let missing: Vec<&str> = action
        .required
        .iter()
        .map(String::as_str)
        .filter(|key| form.get(key).is_none())
        .collect();
    if missing.is_empty() {
        return None;
    }

    let message = action
        .required_message
        .clone()
        .unwrap_or_else(|| format!("Missing required fields: {}", missing.join(", ")));
    Some(SampleResponse::Json(
        StatusCode::BAD_REQUEST,
        json!({ "success": false, "message": message }),
    ))
}

/// The `page` marker selects a static page; a missing marker reads as `""`.
fn is_static_page(static_pages: &[String], query: &Form) -> bool {
    let marker = query.get("page").unwrap_or_default();
    static_pages.iter().any(|page| *page == marker)
}

fn created_body(shape: &ResponseShape, created: Created) -> Value {
    let mut body: Map<String, Value> = shape.extra.clone();
    if let Some(link) = created.link {
        body.insert(shape.link_key.clone(), Value::String(link));
    }
    if shape.include_ids {
        if let Some(id) = created.document_id {
            body.insert(DOCUMENT_ID.to_string(), Value::String(id));
        }
        if let Some(id) = created.document_group_id {
            body.insert(DOCUMENT_GROUP_ID.to_string(), Value::String(id));
        }
    }
    Value::Object(body)
}

#[async_trait]
impl Sample for DeclarativeSample {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn get_runs_flow(&self, query: &Form) -> bool {
        match &self.spec.get {
            GetMode::Redirect { static_pages, .. } => !is_static_page(static_pages, query),
            GetMode::Page => false,
        }
    }

    async fn handle_get(
        &self,
        ctx: &SampleContext<'_>,
        query: Form,
    ) -> Result<SampleResponse, FlowError> {
        let GetMode::Redirect {
            static_pages,
            action,
        } = &self.spec.get
        else {
            return self.page(ctx).await;
        };

        if is_static_page(static_pages, &query) {
            return self.page(ctx).await;
        }

        let Some(action) = self.spec.actions.get(action) else {
            return Ok(self.invalid_action(Some(action)));
        };
        match self.run(ctx, action, &query).await? {
            FlowOutput::Created(Created {
                link: Some(link), ..
            }) => Ok(SampleResponse::Redirect(link)),
            _ => Err(FlowError::InvalidLink(format!(
                "{} produced no link to redirect to",
                action.flow.name()
            ))),
        }
    }

    async fn handle_post(
        &self,
        ctx: &SampleContext<'_>,
        form: Form,
    ) -> Result<SampleResponse, FlowError> {
        let requested = form.action();
        let Some(action) = self.action(requested.as_deref()) else {
            return Ok(self.invalid_action(requested.as_deref()));
        };
        if let Some(rejection) = missing_inputs(action, &form) {
            return Ok(rejection);
        }

        Ok(match self.run(ctx, action, &form).await? {
            FlowOutput::Created(created) => {
                SampleResponse::Json(StatusCode::OK, created_body(&action.respond, created))
            }
            FlowOutput::Statuses(report) => {
                SampleResponse::Json(StatusCode::OK, serde_json::to_value(report)?)
            }
            FlowOutput::Download(download) => SampleResponse::Pdf(download),
        })
    }
}
