//! Revision history for configuration settings.
//!
//! Every write to a setting creates a new revision. The store retains
//! revisions for a retention period and serves them newest-first.

use azure_appconfig_core::client::ConfigClient;
use azure_appconfig_core::paging::Pageable;
use chrono::{DateTime, Utc};
use url::form_urlencoded;

use crate::models::{format_http_date, select_value, ConfigurationSetting, SettingFields};

/// Options for [`list`].
#[derive(Debug, Clone, Default)]
pub struct ListRevisionsOptions {
    pub(crate) key_filter: Option<String>,
    pub(crate) label_filter: Option<String>,
    pub(crate) accept_datetime: Option<DateTime<Utc>>,
    pub(crate) fields: Vec<SettingFields>,
}

impl ListRevisionsOptions {
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

    /// List revisions as they were at this point in time.
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

/// List the revision history of the store's settings, newest first,
/// optionally filtered by key and label.
///
/// Returns a lazy [`Pageable`]; no request is made until the stream is
/// polled.
#[tracing::instrument(name = "appconfig::revisions::list", skip(client, options))]
pub fn list(
    client: &ConfigClient,
    options: &ListRevisionsOptions,
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
        "revisions".to_string()
    } else {
        format!("revisions?{query}")
    };

    let mut headers = Vec::new();
    if let Some(datetime) = options.accept_datetime {
        headers.push(("Accept-Datetime", format_http_date(datetime)));
    }

    Pageable::new(client.clone(), path, headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_mock_client;
    use futures::stream::TryStreamExt;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_revisions_for_a_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/revisions"))
            .and(query_param("key", "app/greeting"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"key": "app/greeting", "value": "v2", "etag": "e2"},
                    {"key": "app/greeting", "value": "v1", "etag": "e1"}
                ]
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let options = ListRevisionsOptions::new().key_filter("app/greeting");
        let revisions: Vec<ConfigurationSetting> = list(&client, &options)
            .into_stream()
            .try_collect()
            .await
            .expect("should list");

        let values: Vec<&str> = revisions
            .iter()
            .filter_map(|r| r.value.as_deref())
            .collect();
        assert_eq!(values, vec!["v2", "v1"]);
    }

    #[tokio::test]
    async fn follows_continuation_links() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/revisions"))
            .and(query_param("api-version", "2023-10-01"))
            .and(query_param_is_missing("after"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"key": "app", "value": "v2", "etag": "e2"}],
                "@nextLink": "/revisions?after=x&api-version=2023-10-01"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/revisions"))
            .and(query_param("after", "x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"key": "app", "value": "v1", "etag": "e1"}]
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let revisions: Vec<ConfigurationSetting> = list(&client, &ListRevisionsOptions::new())
            .into_stream()
            .try_collect()
            .await
            .expect("should list");

        assert_eq!(revisions.len(), 2);
    }

    #[tokio::test]
    async fn sends_select_projection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/revisions"))
            .and(query_param("$select", "key,etag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"key": "app", "etag": "e1"}]
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server);
        let options =
            ListRevisionsOptions::new().fields(vec![SettingFields::Key, SettingFields::Etag]);
        let revisions: Vec<ConfigurationSetting> = list(&client, &options)
            .into_stream()
            .try_collect()
            .await
            .expect("should list");

        assert_eq!(revisions[0].value, None);
        assert_eq!(revisions[0].etag.as_deref(), Some("e1"));
    }
}
