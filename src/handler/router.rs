//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, body limits,
//! route matching, sample dispatch and access logging.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use crate::pipeline::{FlowError, Form};
use crate::samples::{is_valid_name, SampleResponse};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, StatusCode, Version};
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

const HEALTH_PATH: &str = "/healthz";
const SAMPLE_PAGE_PREFIX: &str = "/samples/";
const SAMPLE_API_PREFIX: &str = "/api/samples/";
const DEFAULT_PDF_NAME: &str = "document.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    Preflight,
    /// `GET /` has no page of its own
    Root,
    SamplePage(&'a str),
    SampleAction(&'a str),
    Asset(&'a str),
    NotFound,
    MethodNotAllowed,
}

/// Match a request line to a route; sample names are checked but not looked up
pub fn resolve<'a>(method: &Method, path: &'a str) -> Route<'a> {
    let sample = |prefix: &str, found: fn(&'a str) -> Route<'a>| {
        path.strip_prefix(prefix)
            .filter(|name| is_valid_name(name))
            .map_or(Route::NotFound, found)
    };

    match *method {
        Method::OPTIONS => Route::Preflight,
        Method::GET | Method::HEAD => match path {
            HEALTH_PATH => Route::Health,
            "/" => Route::Root,
            p if p.starts_with(SAMPLE_PAGE_PREFIX) => sample(SAMPLE_PAGE_PREFIX, Route::SamplePage),
            p => Route::Asset(p),
        },
        Method::POST if path.starts_with(SAMPLE_API_PREFIX) => {
            sample(SAMPLE_API_PREFIX, Route::SampleAction)
        }
        Method::POST => Route::NotFound,
        _ => Route::MethodNotAllowed,
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);

    let path = req.uri().path().to_string();
    let route = resolve(req.method(), &path);
    if let Route::SamplePage(name) | Route::SampleAction(name) = route {
        entry.sample = Some(name.to_string());
    }

    let mut response = dispatch(route, req, &state).await;
    let http_config = &state.config.http;
    http::apply_common_headers(&mut response, &http_config.server_name, http_config.enable_cors);

    if state.cached_access_log.load(Ordering::Relaxed) {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

async fn dispatch<B>(route: Route<'_>, req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let is_head = *req.method() == Method::HEAD;
    let static_dir = &state.config.samples.static_dir;

    match route {
        Route::Health => http::build_health_response("ok"),
        Route::Preflight => http::build_options_response(state.config.http.enable_cors),
        Route::MethodNotAllowed => {
            logger::log_warning(&format!("Method not allowed: {}", req.method()));
            http::build_405_response()
        }
        Route::Root | Route::NotFound => static_files::not_found(static_dir, is_head).await,
        Route::Asset(path) => static_files::serve_asset(static_dir, path, is_head).await,
        Route::SamplePage(name) => {
            let Some(sample) = state.samples.get(name) else {
                return static_files::not_found(static_dir, is_head).await;
            };
            let query = Form::from_query(req.uri().query().unwrap_or_default());
            if is_head && sample.get_runs_flow(&query) {
                return http::build_html_response(StatusCode::OK, String::new(), true);
            }
            match sample.handle_get(&state.sample_context(), query).await {
                Ok(response) => into_http(response, is_head),
                Err(e) => {
                    logger::log_sample_error(name, &e);
                    http::build_500_page(&e.to_string(), is_head)
                }
            }
        }
        Route::SampleAction(name) => {
            let Some(sample) = state.samples.get(name) else {
                return static_files::not_found(static_dir, false).await;
            };
            let form = match read_form(req, state.config.http.max_body_size).await {
                Ok(form) => form,
                Err(response) => return response,
            };
            match sample.handle_post(&state.sample_context(), form).await {
                Ok(response) => into_http(response, false),
                Err(e) => {
                    logger::log_sample_error(name, &e);
                    http::build_error_json(&e.to_string())
                }
            }
        }
    }
}

/// Collect a JSON body within the configured size limit
async fn read_form<B>(req: Request<B>, max_body_size: u64) -> Result<Form, HttpResponse>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(size) = content_length(&req) {
        if size > max_body_size {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            return Err(http::build_413_response());
        }
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(http::build_413_response());
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return Err(http::build_json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": format!("unable to read request body: {e}") }),
            ));
        }
    };

    Form::from_json(&body).map_err(|e: FlowError| {
        http::build_json_response(StatusCode::BAD_REQUEST, &json!({ "error": e.to_string() }))
    })
}

fn content_length<B>(req: &Request<B>) -> Option<u64> {
    let value = req.headers().get("content-length")?;
    match value.to_str().ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(size) => Some(size),
        None => {
            logger::log_warning("Invalid Content-Length value, skipping size check");
            None
        }
    }
}

fn into_http(response: SampleResponse, is_head: bool) -> HttpResponse {
    match response {
        SampleResponse::Html(html) => http::build_html_response(StatusCode::OK, html, is_head),
        SampleResponse::Redirect(target) => http::build_redirect_response(&target),
        SampleResponse::Json(status, body) => http::build_json_response(status, &body),
        SampleResponse::Pdf(download) => http::build_pdf_response(
            download.filename.as_deref().unwrap_or(DEFAULT_PDF_NAME),
            download.content,
            is_head,
        ),
    }
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}
