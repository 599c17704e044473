//! Shared request plumbing for conditional operations.
//!
//! App Configuration write and read operations can be made conditional on a
//! setting's etag. [`MatchConditions`] selects which precondition header is
//! sent; [`if_match`] and [`if_none_match`] render the header values.

/// How an etag should be matched when making a conditional request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchConditions {
    /// No precondition; the operation always applies.
    #[default]
    Unconditionally,
    /// Apply only if the resource's etag still matches (`If-Match`).
    IfNotModified,
    /// Apply only if the resource's etag no longer matches (`If-None-Match`).
    IfModified,
    /// Apply only if the resource exists (`If-Match: *`).
    IfPresent,
    /// Apply only if the resource does not exist (`If-None-Match: *`).
    IfMissing,
}

/// Quote an etag for use in a precondition header. `*` stays unquoted, and
/// already-quoted etags pass through unchanged.
fn quote_etag(etag: &str) -> String {
    if etag == "*" || (etag.starts_with('"') && etag.ends_with('"') && etag.len() >= 2) {
        etag.to_string()
    } else {
        format!("\"{etag}\"")
    }
}

/// Render the `If-Match` header value for the given etag and condition, or
/// `None` when the condition does not call for one.
pub fn if_match(etag: Option<&str>, condition: MatchConditions) -> Option<String> {
    match condition {
        MatchConditions::IfNotModified => etag.map(quote_etag),
        MatchConditions::IfPresent => Some("*".to_string()),
        _ => None,
    }
}

/// Render the `If-None-Match` header value for the given etag and condition,
/// or `None` when the condition does not call for one.
pub fn if_none_match(etag: Option<&str>, condition: MatchConditions) -> Option<String> {
    match condition {
        MatchConditions::IfModified => etag.map(quote_etag),
        MatchConditions::IfMissing => Some("*".to_string()),
        _ => None,
    }
}
