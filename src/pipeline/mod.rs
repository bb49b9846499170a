//! Generic sample pipeline
//!
//! Building blocks shared by every sample: form access, conditional prefill,
//! role matching, link construction, status aggregation and the flows that
//! sequence remote calls out of them.

mod error;
pub mod flows;
mod form;
pub mod links;
pub mod prefill;
pub mod roles;
pub mod status;

pub use error::FlowError;
pub use flows::{Created, Flow, FlowContext, FlowOutput};
pub use form::{Form, ValueSource};
