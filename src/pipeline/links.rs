//! Callback and signing link construction

use url::form_urlencoded::byte_serialize;
use url::Url;

use super::FlowError;

/// `{public_url}/samples/{sample}?page=..&k=v` on this application
pub fn callback_url(
    public_url: &str,
    sample: &str,
    page: Option<&str>,
    params: &[(&str, &str)],
) -> Result<String, FlowError> {
    let base = format!("{}/samples/{sample}", public_url.trim_end_matches('/'));
    let mut url = Url::parse(&base).map_err(|e| FlowError::InvalidLink(format!("{base}: {e}")))?;

    if page.is_some() || !params.is_empty() {
        let mut query = url.query_pairs_mut();
        if let Some(page) = page {
            query.append_pair("page", page);
        }
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Append `&redirect_uri=` to a remote signing link.
///
/// The remote link always carries a query already, so `&` is used unconditionally.
pub fn append_redirect_uri(link: &str, redirect: &str, encode: bool) -> String {
    if encode {
        let encoded: String = byte_serialize(redirect.as_bytes()).collect();
        format!("{link}&redirect_uri={encoded}")
    } else {
        format!("{link}&redirect_uri={redirect}")
    }
}

/// Replace `access_token` and `embedded` on a remote link.
///
/// An `access_token` inside a nested `redirect_uri` is replaced as well; the
/// nested link gains no token when it had none.
pub fn rewrite_access_token(link: &str, token: &str, embedded: &str) -> Result<String, FlowError> {
    let mut url = Url::parse(link).map_err(|e| FlowError::InvalidLink(format!("{link}: {e}")))?;
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    set_pair(&mut pairs, "access_token", token);
    set_pair(&mut pairs, "embedded", embedded);

    if let Some((_, redirect)) = pairs.iter_mut().find(|(k, _)| k == "redirect_uri") {
        if let Some(nested) = replace_nested_token(redirect, token) {
            *redirect = nested;
        }
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.into())
}

/// Signing page URL authenticated by a limited token
pub fn signing_url(
    base: &str,
    group_id: &str,
    token: &str,
    redirect: &str,
) -> Result<String, FlowError> {
    let mut url = Url::parse(base).map_err(|e| FlowError::InvalidLink(format!("{base}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("document_group_id", group_id)
        .append_pair("access_token", token)
        .append_pair("sign", "1")
        .append_pair("embedded", "1")
        .append_pair("redirect_uri", redirect);
    Ok(url.into())
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }
}

fn replace_nested_token(redirect: &str, token: &str) -> Option<String> {
    let mut nested = Url::parse(redirect).ok()?;
    if !nested.query_pairs().any(|(k, _)| k == "access_token") {
        return None;
    }
    let pairs: Vec<(String, String)> = nested
        .query_pairs()
        .into_owned()
        .map(|(k, v)| {
            if k == "access_token" {
                (k, token.to_string())
            } else {
                (k, v)
            }
        })
        .collect();
    nested.query_pairs_mut().clear().extend_pairs(pairs);
    Some(nested.into())
}
