//! Shared types for App Configuration operations.

use azure_appconfig_core::error::{AppConfigError, AppConfigResult};
use azure_appconfig_core::models::MatchConditions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

/// Label filter value matching settings that carry no label.
///
/// Passing `NO_LABEL` to a list filter selects only unlabeled settings,
/// whereas omitting the filter matches every label.
pub const NO_LABEL: &str = "\0";

// ---------------------------------------------------------------------------
// Configuration setting
// ---------------------------------------------------------------------------

/// A key-value stored in an App Configuration store.
///
/// A setting is identified by its `key` and `label` pair. The remaining
/// fields (`etag`, `last_modified`, `read_only`) are assigned by the service
/// and ignored on writes.
///
/// ```rust
/// use azure_appconfig::models::ConfigurationSetting;
///
/// let setting = ConfigurationSetting::builder("app/greeting")
///     .label("production")
///     .value("hello")
///     .content_type("text/plain")
///     .build()
///     .expect("valid setting");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigurationSetting {
    /// The key of the setting.
    pub key: String,

    /// The label of the setting, or `None` for an unlabeled setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// The value of the setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Content type hint for the value, e.g. `application/json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Tags attached to the setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,

    /// Entity tag identifying this version of the setting. Service-assigned.
    #[serde(skip_serializing)]
    pub etag: Option<String>,

    /// When the setting was last written. Service-assigned.
    #[serde(skip_serializing)]
    pub last_modified: Option<DateTime<Utc>>,

    /// Whether the setting is locked against writes. Service-assigned; use
    /// the lock operations to change it.
    #[serde(skip_serializing, rename = "locked", default)]
    pub read_only: bool,
}

/// Builder for [`ConfigurationSetting`].
#[derive(Debug, Default)]
pub struct ConfigurationSettingBuilder {
    key: String,
    label: Option<String>,
    value: Option<String>,
    content_type: Option<String>,
    tags: Option<HashMap<String, String>>,
}

impl ConfigurationSetting {
    /// Create a builder for a setting with the given key.
    pub fn builder(key: impl Into<String>) -> ConfigurationSettingBuilder {
        ConfigurationSettingBuilder {
            key: key.into(),
            ..ConfigurationSettingBuilder::default()
        }
    }
}

impl ConfigurationSettingBuilder {
    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the tags.
    pub fn tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Build the setting, returning an error if the key is invalid.
    ///
    /// The service reserves `.` and `..` as keys and `%` inside keys.
    pub fn build(self) -> AppConfigResult<ConfigurationSetting> {
        if self.key.is_empty() {
            return Err(AppConfigError::Builder("key cannot be empty".into()));
        }
        if self.key == "." || self.key == ".." || self.key.contains('%') {
            return Err(AppConfigError::Builder(format!(
                "key {:?} is reserved by the service",
                self.key
            )));
        }

        Ok(ConfigurationSetting {
            key: self.key,
            label: self.label,
            value: self.value,
            content_type: self.content_type,
            tags: self.tags,
            etag: None,
            last_modified: None,
            read_only: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Field selection
// ---------------------------------------------------------------------------

/// Fields of a [`ConfigurationSetting`] that list and get operations can
/// project with `$select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingFields {
    Key,
    Label,
    Value,
    ContentType,
    Etag,
    LastModified,
    Tags,
    ReadOnly,
}

impl SettingFields {
    /// The wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Label => "label",
            Self::Value => "value",
            Self::ContentType => "content_type",
            Self::Etag => "etag",
            Self::LastModified => "last_modified",
            Self::Tags => "tags",
            Self::ReadOnly => "locked",
        }
    }
}

/// Render a `$select` value from a field list, or `None` when empty.
pub(crate) fn select_value(fields: &[SettingFields]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    Some(
        fields
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(","),
    )
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

/// Percent-encode a key for use as a path segment. Unreserved characters
/// pass through; everything else, including `/`, is encoded so keys like
/// `app/greeting` address a single setting.
pub(crate) fn encode_path_segment(segment: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push('%');
                encoded.push(HEX[(byte >> 4) as usize] as char);
                encoded.push(HEX[(byte & 0x0f) as usize] as char);
            }
        }
    }
    encoded
}

/// Format a timestamp for the `Accept-Datetime` header (RFC 1123).
pub(crate) fn format_http_date(datetime: DateTime<Utc>) -> String {
    datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Refine a precondition failure using the condition the request was sent
/// with. The service answers every failed precondition with 412 and every
/// write to a locked setting with 409; what the failure means depends on
/// what the caller asked for.
pub(crate) fn map_condition_error(
    err: AppConfigError,
    condition: MatchConditions,
) -> AppConfigError {
    match (err.status(), condition) {
        (Some(412), MatchConditions::IfNotModified) => AppConfigError::ResourceModified,
        (Some(412), MatchConditions::IfModified) => AppConfigError::ResourceNotModified,
        (Some(412), MatchConditions::IfPresent) => AppConfigError::ResourceNotFound,
        (Some(412), MatchConditions::IfMissing) => AppConfigError::ResourceExists,
        (Some(409), _) => AppConfigError::ResourceReadOnly,
        _ => err,
    }
}
