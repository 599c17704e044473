//! Read-only locks for configuration settings.
//!
//! A locked setting rejects writes and deletes with
//! [`AppConfigError::ResourceReadOnly`](azure_appconfig_core::error::AppConfigError::ResourceReadOnly) until the lock is cleared.

use azure_appconfig_core::client::ConfigClient;
use azure_appconfig_core::error::AppConfigResult;
use azure_appconfig_core::models::MatchConditions;

use crate::models::{encode_path_segment, map_condition_error, ConfigurationSetting};
use crate::setting::condition_headers;
use url::form_urlencoded;

/// Options for [`set_read_only`] and [`clear_read_only`].
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyOptions {
    pub(crate) label: Option<String>,
    pub(crate) etag: Option<String>,
    pub(crate) condition: MatchConditions,
}

impl ReadOnlyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock or unlock the setting with this label. Omit for an unlabeled
    /// setting.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Apply only if the setting's etag still matches
    /// ([`MatchConditions::IfNotModified`]).
    pub fn condition(mut self, etag: impl Into<String>, condition: MatchConditions) -> Self {
        self.etag = Some(etag.into());
        self.condition = condition;
        self
    }
}

fn lock_path(key: &str, label: Option<&str>) -> String {
    let path = format!("locks/{}", encode_path_segment(key));
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

/// Lock a configuration setting against writes and deletes.
///
/// Returns the updated setting with `read_only` set.
///
/// # Errors
///
/// Returns [`AppConfigError::ResourceNotFound`](azure_appconfig_core::error::AppConfigError::ResourceNotFound) when no setting exists with
/// the given key and label, and [`AppConfigError::ResourceModified`](azure_appconfig_core::error::AppConfigError::ResourceModified) when a
/// precondition on the etag fails.
#[tracing::instrument(
    name = "appconfig::locks::set_read_only",
    skip(client, options),
    fields(key = %key, label = options.label.as_deref().unwrap_or(""))
)]
pub async fn set_read_only(
    client: &ConfigClient,
    key: &str,
    options: &ReadOnlyOptions,
) -> AppConfigResult<ConfigurationSetting> {
    tracing::debug!("locking configuration setting");

    let path = lock_path(key, options.label.as_deref());
    let headers = condition_headers(options.etag.as_deref(), options.condition);

    let response = client
        .put(&path, &headers)
        .await
        .map_err(|err| map_condition_error(err, options.condition))?;
    let locked = response.json::<ConfigurationSetting>().await?;

    tracing::debug!("setting locked");
    Ok(locked)
}

/// Clear the read-only lock on a configuration setting.
///
/// Returns the updated setting with `read_only` cleared.
///
/// # Errors
///
/// Returns [`AppConfigError::ResourceNotFound`](azure_appconfig_core::error::AppConfigError::ResourceNotFound) when no setting exists with
/// the given key and label, and [`AppConfigError::ResourceModified`](azure_appconfig_core::error::AppConfigError::ResourceModified) when a
/// precondition on the etag fails.
#[tracing::instrument(
    name = "appconfig::locks::clear_read_only",
    skip(client, options),
    fields(key = %key, label = options.label.as_deref().unwrap_or(""))
)]
pub async fn clear_read_only(
    client: &ConfigClient,
    key: &str,
    options: &ReadOnlyOptions,
) -> AppConfigResult<ConfigurationSetting> {
    tracing::debug!("unlocking configuration setting");

    let path = lock_path(key, options.label.as_deref());
    let headers = condition_headers(options.etag.as_deref(), options.condition);

    let response = client
        .delete(&path, &headers)
        .await
        .map_err(|err| map_condition_error(err, options.condition))?;
    let unlocked = response.json::<ConfigurationSetting>().await?;

    tracing::debug!("setting unlocked");
    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_appconfig_core::error::AppConfigError;
    use crate::test_utils::setup_mock_client;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locked_body(locked: bool) -> serde_json::Value {
        serde_json::json!({
            "key": "app",
            "label": "production",
            "value": "hello",
            "etag": "etag1",
            "locked": locked
        })
    }

    #[test]
    fn lock_path_encodes_key_and_label() {
        assert_eq!(lock_path("app", None), "locks/app");
        assert_eq!(
            lock_path("app/greeting", Some("production")),
            "locks/app%2Fgreeting?label=production"
        );
    }

    #[tokio::test]
    async fn set_read_only_puts_lock() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/locks/app"))
            .and(query_param("label", "production"))
            .respond_with(ResponseTemplate::new(200).set_body_json(locked_body(true)))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let options = ReadOnlyOptions::new().label("production");
        let setting = set_read_only(&client, "app", &options)
            .await
            .expect("should lock");

        assert!(setting.read_only);
    }

    #[tokio::test]
    async fn clear_read_only_deletes_lock() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/locks/app"))
            .and(query_param("label", "production"))
            .respond_with(ResponseTemplate::new(200).set_body_json(locked_body(false)))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let options = ReadOnlyOptions::new().label("production");
        let setting = clear_read_only(&client, "app", &options)
            .await
            .expect("should unlock");

        assert!(!setting.read_only);
    }

    #[tokio::test]
    async fn lock_missing_setting_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/locks/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let err = set_read_only(&client, "missing", &ReadOnlyOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppConfigError::ResourceNotFound));
    }

    #[tokio::test]
    async fn lock_with_stale_etag_is_resource_modified() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/locks/app"))
            .and(header("If-Match", "\"stale\""))
            .respond_with(ResponseTemplate::new(412).set_body_string("Precondition Failed"))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let options = ReadOnlyOptions::new().condition("stale", MatchConditions::IfNotModified);
        let err = set_read_only(&client, "app", &options).await.unwrap_err();
        assert!(matches!(err, AppConfigError::ResourceModified));
    }
}
