//! AWS Backup client
//!
//! Combines credentials, region and the signed HTTP client, and knows how to
//! build AWS Backup REST URLs.

use super::http::{AwsError, AwsHttpClient};
use aws_credential_types::Credentials;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Signing name of the AWS Backup service
pub const SERVICE: &str = "backup";

/// Transport settings for [`BackupClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Override for `https://backup.{region}.amazonaws.com`
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

/// Regional endpoint of AWS Backup
pub fn default_endpoint(region: &str) -> String {
    let suffix = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };
    format!("https://backup.{}.{}", region, suffix)
}

/// Encode query pairs RFC 3986 style, sorted by key then value.
///
/// This is the canonical SigV4 query form, so the URL that is sent is the one
/// that gets signed.
pub fn canonical_query<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k.as_ref()).into_owned(),
                urlencoding::encode(v.as_ref()).into_owned(),
            )
        })
        .collect();
    encoded.sort();

    encoded
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Read-only client for one region
#[derive(Clone)]
pub struct BackupClient {
    credentials: Credentials,
    http: AwsHttpClient,
    region: String,
    endpoint: Url,
}

impl BackupClient {
    pub fn new(
        credentials: Credentials,
        region: &str,
        options: &ClientOptions,
    ) -> Result<Self, AwsError> {
        let endpoint = options
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(region));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| AwsError::Transport(format!("invalid endpoint {}: {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(AwsError::Transport(format!(
                "invalid endpoint {}: not a base URL",
                endpoint
            )));
        }

        let http = AwsHttpClient::new(
            options.timeout,
            options.max_attempts,
            options.retry_base_delay,
        )?;

        tracing::debug!("Backup client for {} at {}", region, endpoint);

        Ok(Self {
            credentials,
            http,
            region: region.to_string(),
            endpoint,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Build a request URL from raw path segments and query pairs.
    ///
    /// Segments are percent-encoded here; the query is written in canonical
    /// SigV4 order so the signature covers exactly what is sent.
    pub fn url(&self, segments: &[&str], trailing_slash: bool, query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&canonical_query(query)));
        }
        url
    }

    /// Make a signed GET request to AWS Backup
    pub async fn get(&self, url: &Url) -> Result<Value, AwsError> {
        self.http
            .get(url, &self.credentials, &self.region, SERVICE)
            .await
    }
}
