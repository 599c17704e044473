use crate::error::{AppConfigError, AppConfigResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Credential types supported by the App Configuration SDK.
#[derive(Clone)]
pub enum AppConfigCredential {
    /// HMAC-SHA256 access key from a store connection string.
    ///
    /// Each request is signed over its method, path, date, host, and body
    /// hash, so no token acquisition round-trip is needed.
    AccessKey { id: String, secret: SecretString },

    /// A pre-acquired Microsoft Entra ID access token, sent as
    /// `Authorization: Bearer <token>`.
    Bearer(SecretString),
}

impl AppConfigCredential {
    /// Create a credential from the environment.
    ///
    /// Checks `AZURE_APPCONFIG_CONNECTION_STRING` first and falls back to a
    /// bearer token in `AZURE_APPCONFIG_TOKEN`.
    pub fn from_env() -> AppConfigResult<Self> {
        if let Ok(conn) = std::env::var("AZURE_APPCONFIG_CONNECTION_STRING") {
            if !conn.is_empty() {
                let (_, credential) = parse_connection_string(&conn)?;
                return Ok(credential);
            }
        }
        match std::env::var("AZURE_APPCONFIG_TOKEN") {
            Ok(token) if !token.is_empty() => Ok(Self::bearer(token)),
            _ => Err(AppConfigError::MissingConfig(
                "credential is required. Set AZURE_APPCONFIG_CONNECTION_STRING or \
                 AZURE_APPCONFIG_TOKEN, or pass a credential to the builder."
                    .into(),
            )),
        }
    }

    /// Create an access key credential from its id and base64 secret.
    pub fn access_key(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::AccessKey {
            id: id.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Create a bearer token credential.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(SecretString::from(token.into()))
    }

    /// Produce the authentication headers for one request attempt.
    ///
    /// Access key signatures cover the current timestamp, so this must be
    /// called freshly for every attempt, including retries.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
    ) -> AppConfigResult<Vec<(&'static str, String)>> {
        match self {
            Self::Bearer(token) => Ok(vec![(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            )]),
            Self::AccessKey { .. } => {
                let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
                self.sign_at(method, url, body, &date)
            }
        }
    }

    /// Sign with an explicit `x-ms-date` value. Split out so signing is
    /// deterministic under test.
    fn sign_at(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        date: &str,
    ) -> AppConfigResult<Vec<(&'static str, String)>> {
        let Self::AccessKey { id, secret } = self else {
            return self.sign(method, url, body);
        };

        let host = url
            .host_str()
            .ok_or_else(|| AppConfigError::InvalidEndpoint("endpoint has no host".into()))?;
        // The signed host includes a non-default port.
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let content_hash = BASE64.encode(Sha256::digest(body));
        let to_sign = format!("{method}\n{path_and_query}\n{date};{host};{content_hash}");

        let key = BASE64.decode(secret.expose_secret()).map_err(|_| {
            AppConfigError::InvalidConnectionString("secret is not valid base64".into())
        })?;
        let mut mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| AppConfigError::Auth(format!("failed to initialize HMAC: {e}")))?;
        mac.update(to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(vec![
            ("x-ms-date", date.to_string()),
            ("x-ms-content-sha256", content_hash),
            (
                "Authorization",
                format!(
                    "HMAC-SHA256 Credential={id}&SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature={signature}"
                ),
            ),
        ])
    }
}

impl std::fmt::Debug for AppConfigCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessKey { id, .. } => write!(f, "AppConfigCredential::AccessKey({id}, ****)"),
            Self::Bearer(_) => write!(f, "AppConfigCredential::Bearer(****)"),
        }
    }
}

/// Parse an App Configuration connection string
/// (`Endpoint=https://...;Id=...;Secret=...`, segments in any order) into
/// the store endpoint and an access key credential.
pub fn parse_connection_string(
    connection_string: &str,
) -> AppConfigResult<(Url, AppConfigCredential)> {
    let mut endpoint = None;
    let mut id = None;
    let mut secret = None;

    for segment in connection_string.split(';').filter(|s| !s.is_empty()) {
        let Some((name, value)) = segment.split_once('=') else {
            return Err(AppConfigError::InvalidConnectionString(
                "malformed segment".into(),
            ));
        };
        match name {
            "Endpoint" => endpoint = Some(value.to_string()),
            "Id" => id = Some(value.to_string()),
            "Secret" => secret = Some(value.to_string()),
            other => {
                return Err(AppConfigError::InvalidConnectionString(format!(
                    "unexpected segment '{other}'"
                )))
            }
        }
    }

    let endpoint = endpoint
        .ok_or_else(|| AppConfigError::InvalidConnectionString("missing Endpoint".into()))?;
    let id = id.ok_or_else(|| AppConfigError::InvalidConnectionString("missing Id".into()))?;
    let secret =
        secret.ok_or_else(|| AppConfigError::InvalidConnectionString("missing Secret".into()))?;

    // Fail early on a secret the signer could never use.
    if BASE64.decode(&secret).is_err() {
        return Err(AppConfigError::InvalidConnectionString(
            "secret is not valid base64".into(),
        ));
    }

    let endpoint = Url::parse(&endpoint)
        .map_err(|e| AppConfigError::InvalidEndpoint(format!("invalid endpoint URL: {e}")))?;

    Ok((endpoint, AppConfigCredential::access_key(id, secret)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64 of b"test-secret-key"
    const TEST_SECRET: &str = "dGVzdC1zZWNyZXQta2V5";

    fn test_url(path_and_query: &str) -> Url {
        Url::parse("https://my-store.azconfig.io")
            .unwrap()
            .join(path_and_query)
            .unwrap()
    }

    #[test]
    fn parses_connection_string() {
        let conn = format!("Endpoint=https://my-store.azconfig.io;Id=abc-123;Secret={TEST_SECRET}");
        let (endpoint, credential) = parse_connection_string(&conn).expect("should parse");

        assert_eq!(endpoint.as_str(), "https://my-store.azconfig.io/");
        match credential {
            AppConfigCredential::AccessKey { id, .. } => assert_eq!(id, "abc-123"),
            other => panic!("expected AccessKey, got {:?}", other),
        }
    }

    #[test]
    fn parses_reordered_segments() {
        let conn = format!("Secret={TEST_SECRET};Endpoint=https://s.azconfig.io;Id=abc");
        let (endpoint, _) = parse_connection_string(&conn).expect("should parse");
        assert_eq!(endpoint.as_str(), "https://s.azconfig.io/");
    }

    #[test]
    fn rejects_missing_segments() {
        for conn in [
            "Id=abc;Secret=dGVzdA==",
            "Endpoint=https://s.azconfig.io;Secret=dGVzdA==",
            "Endpoint=https://s.azconfig.io;Id=abc",
        ] {
            let err = parse_connection_string(conn).unwrap_err();
            assert!(
                matches!(err, AppConfigError::InvalidConnectionString(_)),
                "expected InvalidConnectionString for {conn}, got {err:?}"
            );
        }
    }

    #[test]
    fn rejects_unknown_segment() {
        let err = parse_connection_string("Endpoint=https://s.azconfig.io;Id=a;Secret=dGVzdA==;Extra=1")
            .unwrap_err();
        assert!(matches!(err, AppConfigError::InvalidConnectionString(_)));
    }

    #[test]
    fn rejects_non_base64_secret() {
        let err = parse_connection_string("Endpoint=https://s.azconfig.io;Id=a;Secret=not base64!")
            .unwrap_err();
        assert!(matches!(err, AppConfigError::InvalidConnectionString(_)));
    }

    #[test]
    fn secret_with_padding_survives_split() {
        // Base64 padding contains '=' characters; split_once must keep them.
        let conn = "Endpoint=https://s.azconfig.io;Id=a;Secret=dGVzdA==";
        assert!(parse_connection_string(conn).is_ok());
    }

    #[test]
    fn bearer_produces_authorization_header() {
        let credential = AppConfigCredential::bearer("my-token");
        let headers = credential
            .sign("GET", &test_url("/kv/key1"), b"")
            .expect("should sign");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0], ("Authorization", "Bearer my-token".to_string()));
    }

    #[test]
    fn access_key_produces_signed_headers() {
        let credential = AppConfigCredential::access_key("abc-123", TEST_SECRET);
        let headers = credential
            .sign("GET", &test_url("/kv/key1?label=prod"), b"")
            .expect("should sign");

        let names: Vec<&str> = headers.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["x-ms-date", "x-ms-content-sha256", "Authorization"]);

        let auth = &headers[2].1;
        assert!(auth.starts_with("HMAC-SHA256 Credential=abc-123&"));
        assert!(auth.contains("SignedHeaders=x-ms-date;host;x-ms-content-sha256"));
        assert!(auth.contains("&Signature="));
    }

    #[test]
    fn signature_is_deterministic_for_fixed_date() {
        let credential = AppConfigCredential::access_key("abc-123", TEST_SECRET);
        let url = test_url("/kv/key1");
        let date = "Fri, 11 May 2029 18:48:36 GMT";

        let first = credential.sign_at("GET", &url, b"", date).unwrap();
        let second = credential.sign_at("GET", &url, b"", date).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn signature_covers_the_body() {
        let credential = AppConfigCredential::access_key("abc-123", TEST_SECRET);
        let url = test_url("/kv/key1");
        let date = "Fri, 11 May 2029 18:48:36 GMT";

        let empty = credential.sign_at("PUT", &url, b"", date).unwrap();
        let with_body = credential.sign_at("PUT", &url, b"{}", date).unwrap();
        assert_ne!(empty[1], with_body[1], "content hash should differ");
        assert_ne!(empty[2], with_body[2], "signature should differ");
    }

    #[test]
    fn signature_covers_the_query() {
        let credential = AppConfigCredential::access_key("abc-123", TEST_SECRET);
        let date = "Fri, 11 May 2029 18:48:36 GMT";

        let plain = credential
            .sign_at("GET", &test_url("/kv/key1"), b"", date)
            .unwrap();
        let with_query = credential
            .sign_at("GET", &test_url("/kv/key1?label=prod"), b"", date)
            .unwrap();
        assert_ne!(plain[2], with_query[2]);
    }

    #[test]
    fn signed_host_includes_non_default_port() {
        let credential = AppConfigCredential::access_key("abc-123", TEST_SECRET);
        let date = "Fri, 11 May 2029 18:48:36 GMT";
        let url = Url::parse("http://127.0.0.1:8080/kv/key1").unwrap();

        // Only checks it signs; the port assertion lives in the string-to-sign,
        // which differs from the default-port case.
        let with_port = credential.sign_at("GET", &url, b"", date).unwrap();
        let no_port = credential
            .sign_at("GET", &Url::parse("http://127.0.0.1/kv/key1").unwrap(), b"", date)
            .unwrap();
        assert_ne!(with_port[2], no_port[2]);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let access = AppConfigCredential::access_key("abc", TEST_SECRET);
        let bearer = AppConfigCredential::bearer("token-value");

        let access_dbg = format!("{:?}", access);
        let bearer_dbg = format!("{:?}", bearer);

        assert!(!access_dbg.contains(TEST_SECRET));
        assert!(!bearer_dbg.contains("token-value"));
        assert!(access_dbg.contains("****"));
        assert!(bearer_dbg.contains("****"));
    }
}
