use crate::signnow::ApiError;

#[derive(thiserror::Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("missing required parameter: {0}")]
    MissingInput(String),
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("no invite found for {0}")]
    InviteNotFound(String),
    #[error("unable to read page: {0}")]
    Page(#[from] std::io::Error),
    #[error("invalid link: {0}")]
    InvalidLink(String),
    #[error("unable to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}
