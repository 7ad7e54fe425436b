//! HTTP utilities for AWS JSON REST API calls

use super::sigv4;
use aws_credential_types::Credentials;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Error codes AWS uses for rejected or missing credentials
const AUTH_ERROR_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "AccessDeniedException",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "MissingAuthenticationTokenException",
    "IncompleteSignature",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "AuthFailure",
];

const THROTTLING_ERROR_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "ServiceUnavailableException",
];

/// Failure of a single AWS API call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AwsError {
    #[error("authorization failed ({status}): {code}: {message}")]
    Auth {
        status: u16,
        code: String,
        message: String,
    },

    #[error("API request failed: {status} {}", code.as_deref().unwrap_or("UnknownError"))]
    Api {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

impl AwsError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Throttling, server-side and transport failures may succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 429
                    || *status >= 500
                    || code
                        .as_deref()
                        .is_some_and(|c| THROTTLING_ERROR_CODES.contains(&c))
            }
            Self::Transport(_) => true,
            Self::Auth { .. } | Self::Decode(_) | Self::Signing(_) => false,
        }
    }
}

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Turn a non-success response into an [`AwsError`].
///
/// The error code comes from the `x-amzn-ErrorType` header when present,
/// otherwise from the body's `__type` (namespace stripped) or `code` field.
pub fn classify_error(status: StatusCode, error_type_header: Option<&str>, body: &str) -> AwsError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |names: &[&str]| -> Option<String> {
        let obj = parsed.as_ref()?;
        names
            .iter()
            .find_map(|name| obj.get(*name).and_then(|v| v.as_str()))
            .map(str::to_string)
    };

    let code = error_type_header
        .and_then(|h| h.split(':').next())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .or_else(|| {
            field(&["__type"]).map(|t| t.rsplit('#').next().unwrap_or_default().to_string())
        })
        .or_else(|| field(&["code", "Code"]))
        .filter(|c| !c.is_empty());
    let message = field(&["message", "Message"]);

    let is_auth = status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || code
            .as_deref()
            .is_some_and(|c| AUTH_ERROR_CODES.contains(&c));

    if is_auth {
        AwsError::Auth {
            status: status.as_u16(),
            code: code.unwrap_or_else(|| "AccessDenied".to_string()),
            message: message.unwrap_or_default(),
        }
    } else {
        AwsError::Api {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

/// Signed HTTP client for AWS JSON APIs with retry
#[derive(Clone)]
pub struct AwsHttpClient {
    client: Client,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl AwsHttpClient {
    /// Create a new HTTP client
    pub fn new(
        timeout: Duration,
        max_attempts: u32,
        retry_base_delay: Duration,
    ) -> Result<Self, AwsError> {
        let client = Client::builder()
            .user_agent(format!("aws-backup-report/{}", crate::VERSION))
            .timeout(timeout)
            .build()
            .map_err(|e| AwsError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            retry_base_delay,
        })
    }

    /// Make a signed GET request, retrying throttling and server errors
    pub async fn get(
        &self,
        url: &Url,
        credentials: &Credentials,
        region: &str,
        service: &str,
    ) -> Result<Value, AwsError> {
        let mut attempt = 1;
        loop {
            match self.get_once(url, credentials, region, service).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.retry_base_delay * (1u32 << (attempt - 1).min(6));
                    tracing::warn!(
                        "GET {} failed (attempt {}/{}): {}; retrying in {:?}",
                        url.path(),
                        attempt,
                        self.max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once(
        &self,
        url: &Url,
        credentials: &Credentials,
        region: &str,
        service: &str,
    ) -> Result<Value, AwsError> {
        tracing::debug!("GET {}", url);

        // Signed per attempt so retries carry a fresh timestamp
        let signed =
            sigv4::sign_request("GET", url, credentials, region, service, SystemTime::now())?;

        let mut request = self.client.get(url.clone());
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AwsError::Transport(e.to_string()))?;

        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-ErrorType")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| AwsError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(classify_error(status, error_type.as_deref(), &body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| AwsError::Decode(format!("response is not JSON: {}", e)))
    }
}

/// Format an AWS API error for display
/// Security: Maps to generic messages instead of echoing raw API details
pub fn format_aws_error(error: &AwsError) -> String {
    match error {
        AwsError::Auth { code, .. } if code.contains("Expired") => {
            "Credentials have expired. Refresh your session and try again.".to_string()
        }
        AwsError::Auth { status: 401, .. } => {
            "Authentication failed. Check your AWS access key and secret.".to_string()
        }
        AwsError::Auth { .. } => {
            "Permission denied. Check your IAM permissions for AWS Backup.".to_string()
        }
        AwsError::Api { status: 404, .. } => "Resource not found.".to_string(),
        AwsError::Api { status: 429, .. } => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        AwsError::Api { status: 400, .. } => {
            "Invalid request. Check your parameters.".to_string()
        }
        AwsError::Api { status, .. } if *status >= 500 => {
            "AWS Backup temporarily unavailable. Please try again.".to_string()
        }
        AwsError::Api { .. } => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        AwsError::Transport(_) => {
            "Could not reach AWS Backup. Check your network connection.".to_string()
        }
        AwsError::Decode(_) => "AWS Backup returned an unexpected response.".to_string(),
        AwsError::Signing(_) => {
            "Could not sign the request. Check your AWS credentials.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.starts_with(&"x".repeat(200)));
        assert!(out.contains("500 bytes total"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }

    #[test]
    fn test_classify_forbidden_is_auth() {
        let err = classify_error(
            StatusCode::FORBIDDEN,
            None,
            r#"{"__type":"com.amazon.coral#AccessDeniedException","Message":"no"}"#,
        );
        assert_eq!(
            err,
            AwsError::Auth {
                status: 403,
                code: "AccessDeniedException".into(),
                message: "no".into()
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_auth_code_on_400() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            Some("UnrecognizedClientException:http://internal.amazon.com/"),
            "{}",
        );
        assert!(err.is_auth());
    }

    #[test]
    fn test_classify_throttling_is_retryable() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            None,
            r#"{"code":"ThrottlingException","message":"Rate exceeded"}"#,
        );
        assert!(!err.is_auth());
        assert!(err.is_retryable());

        let err = classify_error(StatusCode::SERVICE_UNAVAILABLE, None, "not json");
        assert!(err.is_retryable());

        let err = classify_error(StatusCode::NOT_FOUND, None, "");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_format_aws_error_hides_details() {
        let err = AwsError::Api {
            status: 500,
            code: Some("InternalFailure".into()),
            message: Some("stack trace with secrets".into()),
        };
        let shown = format_aws_error(&err);
        assert!(!shown.contains("secrets"));
        assert!(shown.contains("temporarily unavailable"));
    }

    #[test]
    fn test_format_aws_error_covers_auth_variants() {
        let expired = AwsError::Auth {
            status: 400,
            code: "ExpiredTokenException".into(),
            message: "The security token included in the request is expired".into(),
        };
        assert!(format_aws_error(&expired).contains("expired"));

        let denied = AwsError::Auth {
            status: 403,
            code: "AccessDeniedException".into(),
            message: "User arn:aws:iam::123456789012:user/ops is not authorized".into(),
        };
        let shown = format_aws_error(&denied);
        assert!(shown.contains("IAM permissions"));
        assert!(!shown.contains("123456789012"));
    }

    #[test]
    fn test_signing_error_is_not_retried() {
        let err = AwsError::Signing("missing region".into());
        assert!(!err.is_retryable());
        assert!(!err.is_auth());
        assert!(format_aws_error(&err).contains("sign"));
    }
}
