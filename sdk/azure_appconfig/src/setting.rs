//! Configuration setting operations.
//!
//! This module provides functions to create, retrieve, update, delete, and
//! list the key-values of an App Configuration store. A setting is addressed
//! by its key and label pair; write operations can be made conditional on
//! the setting's etag via [`MatchConditions`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_appconfig_core::client::ConfigClient;
//! use azure_appconfig_core::models::MatchConditions;
//! use azure_appconfig::models::ConfigurationSetting;
//! use azure_appconfig::setting::{self, GetSettingOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConfigClient::from_connection_string(
//!     "Endpoint=https://my-store.azconfig.io;Id=abc;Secret=c2VjcmV0",
//! )?;
//!
//! // Create or update a setting
//! let new_setting = ConfigurationSetting::builder("app/greeting")
//!     .label("production")
//!     .value("hello")
//!     .build()?;
//! let stored = setting::set(&client, &new_setting, MatchConditions::Unconditionally).await?;
//!
//! // Read it back
//! let options = GetSettingOptions::new().label("production");
//! let fetched = setting::get(&client, "app/greeting", &options).await?;
//! println!("{:?}", fetched);
//! # Ok(())
//! # }
//! ```

use azure_appconfig_core::client::ConfigClient;
use azure_appconfig_core::error::{AppConfigError, AppConfigResult};
use azure_appconfig_core::models::{if_match, if_none_match, MatchConditions};
use azure_appconfig_core::paging::Pageable;
use chrono::{DateTime, Utc};
use url::form_urlencoded;

use crate::models::{
    encode_path_segment, format_http_date, map_condition_error, select_value,
    ConfigurationSetting, SettingFields,
};

// ---------------------------------------------------------------------------
// Options types
// ---------------------------------------------------------------------------

/// Options for [`get`].
#[derive(Debug, Clone, Default)]
pub struct GetSettingOptions {
    pub(crate) label: Option<String>,
    pub(crate) accept_datetime: Option<DateTime<Utc>>,
    pub(crate) etag: Option<String>,
    pub(crate) condition: MatchConditions,
    pub(crate) fields: Vec<SettingFields>,
}

impl GetSettingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the setting with this label. Omit for an unlabeled setting.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Read the setting as it was at this point in time.
    pub fn accept_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.accept_datetime = Some(datetime);
        self
    }

    /// Make the read conditional on the given etag. With
    /// [`MatchConditions::IfModified`], [`get`] returns `Ok(None)` when the
    /// setting is unchanged.
    pub fn condition(mut self, etag: impl Into<String>, condition: MatchConditions) -> Self {
        self.etag = Some(etag.into());
        self.condition = condition;
        self
    }

    /// Project only the given fields.
    pub fn fields(mut self, fields: Vec<SettingFields>) -> Self {
        self.fields = fields;
        self
    }
}

/// Options for [`delete`].
#[derive(Debug, Clone, Default)]
pub struct DeleteSettingOptions {
    pub(crate) label: Option<String>,
    pub(crate) etag: Option<String>,
    pub(crate) condition: MatchConditions,
}

impl DeleteSettingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete the setting with this label. Omit for an unlabeled setting.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Delete only if the setting's etag still matches
    /// ([`MatchConditions::IfNotModified`]).
    pub fn condition(mut self, etag: impl Into<String>, condition: MatchConditions) -> Self {
        self.etag = Some(etag.into());
        self.condition = condition;
        self
    }
}

/// Options for [`list`].
#[derive(Debug, Clone, Default)]
pub struct ListSettingsOptions {
    pub(crate) key_filter: Option<String>,
    pub(crate) label_filter: Option<String>,
    pub(crate) accept_datetime: Option<DateTime<Utc>>,
    pub(crate) fields: Vec<SettingFields>,
}

impl ListSettingsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by key. `*` is a wildcard, `,` separates alternatives.
    pub fn key_filter(mut self, filter: impl Into<String>) -> Self {
        self.key_filter = Some(filter.into());
        self
    }

    /// Filter by label. `*` is a wildcard; pass
    /// [`NO_LABEL`](crate::models::NO_LABEL) to match only unlabeled
    /// settings.
    pub fn label_filter(mut self, filter: impl Into<String>) -> Self {
        self.label_filter = Some(filter.into());
        self
    }

    /// List settings as they were at this point in time.
    pub fn accept_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.accept_datetime = Some(datetime);
        self
    }

    /// Project only the given fields.
    pub fn fields(mut self, fields: Vec<SettingFields>) -> Self {
        self.fields = fields;
        self
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Build the `kv/{key}` path with an optional label query parameter.
pub(crate) fn setting_path(key: &str, label: Option<&str>) -> String {
    let path = format!("kv/{}", encode_path_segment(key));
    match label {
        Some(label) => {
            let query: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("label", label)
                .finish();
            format!("{path}?{query}")
        }
        None => path,
    }
}

/// Render precondition headers for a conditional request.
pub(crate) fn condition_headers(
    etag: Option<&str>,
    condition: MatchConditions,
) -> Vec<(&'static str, String)> {
    let mut headers = Vec::new();
    if let Some(value) = if_match(etag, condition) {
        headers.push(("If-Match", value));
    }
    if let Some(value) = if_none_match(etag, condition) {
        headers.push(("If-None-Match", value));
    }
    headers
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

/// Get a configuration setting by key and label.
///
/// Returns `Ok(None)` when the read is conditional on an etag with
/// [`MatchConditions::IfModified`] and the setting has not changed.
///
/// # Errors
///
/// Returns [`AppConfigError::ResourceNotFound`] when no setting exists with
/// the given key and label.
#[tracing::instrument(
    name = "appconfig::settings::get",
    skip(client, options),
    fields(key = %key, label = options.label.as_deref().unwrap_or(""))
)]
pub async fn get(
    client: &ConfigClient,
    key: &str,
    options: &GetSettingOptions,
) -> AppConfigResult<Option<ConfigurationSetting>> {
    tracing::debug!("getting configuration setting");

    let mut path = setting_path(key, options.label.as_deref());
    if let Some(select) = select_value(&options.fields) {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("$select", &select)
            .finish();
        path.push(if path.contains('?') { '&' } else { '?' });
        path.push_str(&query);
    }

    let mut headers = condition_headers(options.etag.as_deref(), options.condition);
    if let Some(datetime) = options.accept_datetime {
        headers.push(("Accept-Datetime", format_http_date(datetime)));
    }

    match client.get(&path, &headers).await {
        Ok(response) => {
            let setting = response.json::<ConfigurationSetting>().await?;
            Ok(Some(setting))
        }
        Err(AppConfigError::ResourceNotModified) => Ok(None),
        Err(err) => Err(map_condition_error(err, options.condition)),
    }
}

/// Create a configuration setting, failing if one already exists with the
/// same key and label.
///
/// # Errors
///
/// Returns [`AppConfigError::ResourceExists`] when the key and label pair
/// is already present.
#[tracing::instrument(
    name = "appconfig::settings::add",
    skip(client, setting),
    fields(key = %setting.key, label = setting.label.as_deref().unwrap_or(""))
)]
pub async fn add(
    client: &ConfigClient,
    setting: &ConfigurationSetting,
) -> AppConfigResult<ConfigurationSetting> {
    tracing::debug!("adding configuration setting");

    let path = setting_path(&setting.key, setting.label.as_deref());
    let headers = condition_headers(None, MatchConditions::IfMissing);

    let response = client
        .put_json(&path, setting, &headers)
        .await
        .map_err(|err| map_condition_error(err, MatchConditions::IfMissing))?;
    let stored = response.json::<ConfigurationSetting>().await?;

    tracing::debug!(etag = stored.etag.as_deref().unwrap_or(""), "setting added");
    Ok(stored)
}

/// Create or overwrite a configuration setting.
///
/// With [`MatchConditions::IfNotModified`] the write only applies when the
/// setting's etag still matches `setting.etag`, which makes read-modify-write
/// cycles safe against concurrent writers.
///
/// # Errors
///
/// Returns [`AppConfigError::ResourceModified`] when a precondition on the
/// etag fails, and [`AppConfigError::ResourceReadOnly`] when the setting is
/// locked.
#[tracing::instrument(
    name = "appconfig::settings::set",
    skip(client, setting),
    fields(key = %setting.key, label = setting.label.as_deref().unwrap_or(""))
)]
pub async fn set(
    client: &ConfigClient,
    setting: &ConfigurationSetting,
    condition: MatchConditions,
) -> AppConfigResult<ConfigurationSetting> {
    tracing::debug!("setting configuration setting");

    let path = setting_path(&setting.key, setting.label.as_deref());
    let headers = condition_headers(setting.etag.as_deref(), condition);

    let response = client
        .put_json(&path, setting, &headers)
        .await
        .map_err(|err| map_condition_error(err, condition))?;
    let stored = response.json::<ConfigurationSetting>().await?;

    tracing::debug!(etag = stored.etag.as_deref().unwrap_or(""), "setting stored");
    Ok(stored)
}

/// Delete a configuration setting.
///
/// Returns the deleted setting, or `Ok(None)` when no setting existed with
/// the given key and label.
///
/// # Errors
///
/// Returns [`AppConfigError::ResourceModified`] when a precondition on the
/// etag fails, and [`AppConfigError::ResourceReadOnly`] when the setting is
/// locked.
#[tracing::instrument(
    name = "appconfig::settings::delete",
    skip(client, options),
    fields(key = %key, label = options.label.as_deref().unwrap_or(""))
)]
pub async fn delete(
    client: &ConfigClient,
    key: &str,
    options: &DeleteSettingOptions,
) -> AppConfigResult<Option<ConfigurationSetting>> {
    tracing::debug!("deleting configuration setting");

    let path = setting_path(key, options.label.as_deref());
    let headers = condition_headers(options.etag.as_deref(), options.condition);

    let response = client
        .delete(&path, &headers)
        .await
        .map_err(|err| map_condition_error(err, options.condition))?;

    // The service answers 204 when there was nothing to delete.
    if response.status().as_u16() == 204 {
        tracing::debug!("setting did not exist");
        return Ok(None);
    }
    let deleted = response.json::<ConfigurationSetting>().await?;

    tracing::debug!("setting deleted");
    Ok(Some(deleted))
}

/// List configuration settings, optionally filtered by key and label.
///
/// Returns a lazy [`Pageable`]; no request is made until the stream is
/// polled.
///
/// ```rust,no_run
/// # use azure_appconfig_core::client::ConfigClient;
/// # use azure_appconfig::setting::{self, ListSettingsOptions};
/// # use futures::stream::TryStreamExt;
/// # async fn example(client: &ConfigClient) -> azure_appconfig_core::error::AppConfigResult<()> {
/// let options = ListSettingsOptions::new().key_filter("app/*");
/// let mut settings = std::pin::pin!(setting::list(client, &options).into_stream());
/// while let Some(setting) = settings.try_next().await? {
///     println!("{}", setting.key);
/// }
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(name = "appconfig::settings::list", skip(client, options))]
pub fn list(
    client: &ConfigClient,
    options: &ListSettingsOptions,
) -> Pageable<ConfigurationSetting> {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(key_filter) = &options.key_filter {
        query.append_pair("key", key_filter);
    }
    if let Some(label_filter) = &options.label_filter {
        query.append_pair("label", label_filter);
    }
    if let Some(select) = select_value(&options.fields) {
        query.append_pair("$select", &select);
    }
    let query = query.finish();

    let path = if query.is_empty() {
        "kv".to_string()
    } else {
        format!("kv?{query}")
    };

    let mut headers = Vec::new();
    if let Some(datetime) = options.accept_datetime {
        headers.push(("Accept-Datetime", format_http_date(datetime)));
    }

    Pageable::new(client.clone(), path, headers)
}
