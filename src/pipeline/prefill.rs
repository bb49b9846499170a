//! Conditional field prefill
//!
//! Values are only submitted for fields the target document really carries;
//! a binding whose field is absent, or whose value is missing from the form,
//! is skipped without error.

use std::collections::HashSet;

use futures::future::try_join_all;
use serde::{Deserialize, Deserializer};

use super::{FlowError, Form, ValueSource};
use crate::signnow::{Document, DocumentGroup, FieldValue, SignApi};

/// Field name (or ordered candidate names) bound to a value source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldBinding {
    #[serde(rename = "field", deserialize_with = "one_or_many")]
    pub names: Vec<String>,
    #[serde(flatten)]
    pub source: ValueSource,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// Pick the values to submit. For each binding the first candidate name that
/// exists on the document wins.
pub fn select<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    bindings: &[FieldBinding],
    form: &Form,
) -> Vec<FieldValue> {
    let existing: HashSet<&str> = existing.into_iter().collect();
    bindings
        .iter()
        .filter_map(|binding| {
            let name = binding
                .names
                .iter()
                .find(|name| existing.contains(name.as_str()))?;
            let value = binding.source.resolve(form)?;
            Some(FieldValue::new(name.clone(), value))
        })
        .collect()
}

/// Fetch the document, then prefill whatever bindings apply to it.
/// Returns the fetched document so callers can reuse its roles.
pub async fn prefill_document(
    api: &dyn SignApi,
    document_id: &str,
    bindings: &[FieldBinding],
    form: &Form,
) -> Result<Document, FlowError> {
    let document = api.get_document(document_id).await?;
    if bindings.is_empty() {
        return Ok(document);
    }

    let fields = select(document.field_names(), bindings, form);
    if !fields.is_empty() {
        api.prefill_fields(document_id, &fields).await?;
    }
    Ok(document)
}

/// Prefill several independent documents concurrently
pub async fn prefill_documents(
    api: &dyn SignApi,
    document_ids: &[String],
    bindings: &[FieldBinding],
    form: &Form,
) -> Result<Vec<Document>, FlowError> {
    try_join_all(
        document_ids
            .iter()
            .map(|id| prefill_document(api, id, bindings, form)),
    )
    .await
}

pub async fn prefill_group(
    api: &dyn SignApi,
    group_id: &str,
    bindings: &[FieldBinding],
    form: &Form,
) -> Result<DocumentGroup, FlowError> {
    let group = api.get_group(group_id).await?;
    let ids: Vec<String> = group.documents.iter().map(|d| d.id.clone()).collect();
    prefill_documents(api, &ids, bindings, form).await?;
    Ok(group)
}
