//! HTTP protocol layer module
//!
//! Response builders and MIME lookup, independent of the samples.

pub mod mime;
pub mod response;

pub use response::{
    apply_common_headers, build_404_response, build_405_response, build_413_response,
    build_500_page, build_asset_response, build_error_json, build_health_response,
    build_html_response, build_json_response, build_options_response, build_pdf_response,
    build_redirect_response, HttpResponse,
};
