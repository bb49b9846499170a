use super::{FlowContext, StatusReport, DOCUMENT_GROUP_ID, DOCUMENT_ID};
use crate::pipeline::status::{document_statuses, group_statuses, StatusKey, NOT_INVITED};
use crate::pipeline::{FlowError, Form};
use crate::signnow::Download;

const DOCUMENT_FILENAME: &str = "document.pdf";
const GROUP_FILENAME: &str = "document_group.pdf";

pub async fn document_status(
    ctx: &FlowContext<'_>,
    form: &Form,
) -> Result<StatusReport, FlowError> {
    let document_id = form.require(DOCUMENT_ID)?;
    let document = ctx.api.get_document(&document_id).await?;
    Ok(StatusReport::Documents(document_statuses(
        &document.field_invites,
    )))
}

pub async fn group_status(
    ctx: &FlowContext<'_>,
    key: StatusKey,
    form: &Form,
) -> Result<StatusReport, FlowError> {
    let group_id = form.require(DOCUMENT_GROUP_ID)?;
    let group = ctx.api.get_group(&group_id).await?;
    let invite = match group.active_invite() {
        Some(invite_id) => Some(ctx.api.get_group_invite(&group_id, invite_id).await?),
        None => None,
    };
    let recipients = ctx.api.get_group_recipients(&group_id).await?;

    Ok(StatusReport::Signers(group_statuses(
        &recipients,
        invite.as_ref(),
        key,
    )))
}

/// Overall status of the group invite
pub async fn group_invite_summary(
    ctx: &FlowContext<'_>,
    form: &Form,
) -> Result<StatusReport, FlowError> {
    let group_id = form.require(DOCUMENT_GROUP_ID)?;
    let group = ctx.api.get_group(&group_id).await?;
    let status = match group.active_invite() {
        Some(invite_id) => ctx.api.get_group_invite(&group_id, invite_id).await?.status,
        None => NOT_INVITED.to_string(),
    };
    Ok(StatusReport::Invite { status })
}

pub async fn download_document(
    ctx: &FlowContext<'_>,
    filename: Option<&str>,
    form: &Form,
) -> Result<Download, FlowError> {
    let document_id = form.require(DOCUMENT_ID)?;
    let download = ctx.api.download_document(&document_id).await?;
    Ok(named(download, filename, DOCUMENT_FILENAME))
}

pub async fn download_group(
    ctx: &FlowContext<'_>,
    filename: Option<&str>,
    form: &Form,
) -> Result<Download, FlowError> {
    let group_id = form.require(DOCUMENT_GROUP_ID)?;
    let download = ctx.api.download_group(&group_id).await?;
    Ok(named(download, filename, GROUP_FILENAME))
}

/// Configured name first, then the remote name, then the fallback
fn named(mut download: Download, filename: Option<&str>, fallback: &str) -> Download {
    download.filename = filename
        .map(ToString::to_string)
        .or(download.filename)
        .or_else(|| Some(fallback.to_string()));
    download
}
