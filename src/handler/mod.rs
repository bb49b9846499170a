//! Request handler module
//!
//! Routes requests to the samples, the shared error page and static assets.

pub mod router;
pub mod static_files;

pub use router::handle_request;
