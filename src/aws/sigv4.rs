//! AWS Signature Version 4 request signing
//!
//! Header-based signing of bodiless requests on top of `aws-sigv4`.

use super::http::AwsError;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use std::time::SystemTime;
use url::Url;

/// Sign a request with an empty payload at `time`.
///
/// Returns the headers to attach: `x-amz-date`, `authorization` and, for
/// temporary credentials, `x-amz-security-token`.
pub fn sign_request(
    method: &str,
    url: &Url,
    credentials: &Credentials,
    region: &str,
    service: &str,
    time: SystemTime,
) -> Result<Vec<(String, String)>, AwsError> {
    let identity = credentials.clone().into();
    let params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(service)
        .time(time)
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| AwsError::Signing(e.to_string()))?
        .into();

    let request = SignableRequest::new(
        method,
        url.as_str(),
        std::iter::empty(),
        SignableBody::Bytes(&[]),
    )
    .map_err(|e| AwsError::Signing(e.to_string()))?;

    let (instructions, _signature) = sign(request, &params)
        .map_err(|e| AwsError::Signing(e.to_string()))?
        .into_parts();

    Ok(instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> SystemTime {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().into()
    }

    #[test]
    fn test_sign_vanilla_get() {
        let credentials = Credentials::new("AKIDEXAMPLE", SECRET, None, None, "test");
        let url = Url::parse("https://example.amazonaws.com/").unwrap();

        let headers = sign_request(
            "GET",
            &url,
            &credentials,
            "us-east-1",
            "service",
            at(2015, 8, 30, 12, 36),
        )
        .unwrap();

        assert_eq!(header(&headers, "x-amz-date"), Some("20150830T123600Z"));
        assert_eq!(
            header(&headers, "authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
                 SignedHeaders=host;x-amz-date, \
                 Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
            )
        );
        assert!(header(&headers, "x-amz-security-token").is_none());
    }

    #[test]
    fn test_session_token_is_sent() {
        let credentials = Credentials::new("AKID", SECRET, Some("session".into()), None, "test");
        let url = Url::parse(
            "https://backup.us-east-1.amazonaws.com/backup-jobs/?createdAfter=2024-01-01T00%3A00%3A00Z",
        )
        .unwrap();

        let headers = sign_request(
            "GET",
            &url,
            &credentials,
            "us-east-1",
            "backup",
            at(2024, 1, 1, 0, 0),
        )
        .unwrap();

        assert_eq!(header(&headers, "x-amz-security-token"), Some("session"));
        let authorization = header(&headers, "authorization").unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20240101/us-east-1/backup/aws4_request"
        ));
    }
}
