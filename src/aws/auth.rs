//! AWS credential and region resolution
//!
//! Credentials and the fallback region come from the standard AWS provider
//! chain: environment variables, the shared config and credentials files
//! (static keys, assumed roles, SSO and `credential_process`), then
//! container and instance roles.

use crate::error::{ReportError, ReportResult};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use std::error::Error as StdError;

/// Load the shared AWS configuration for a run.
///
/// An explicit region overrides the region provider chain; the credential
/// chain still resolves through `profile` (or `AWS_PROFILE`).
pub async fn load_sdk_config(profile: Option<&str>, region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Region the provider chain settled on, if it is well formed
pub fn sdk_region(config: &SdkConfig) -> Option<String> {
    let region = config.region()?.to_string();
    if validate_region(&region) {
        Some(region)
    } else {
        tracing::warn!("Ignoring malformed region '{}' from the AWS config chain", region);
        None
    }
}

/// Resolve credentials once for the whole run
pub async fn resolve_credentials(config: &SdkConfig) -> ReportResult<Credentials> {
    let provider = config.credentials_provider().ok_or_else(|| {
        ReportError::Credentials("no AWS credential provider is configured".to_string())
    })?;

    let credentials = provider
        .provide_credentials()
        .await
        .map_err(|e| ReportError::Credentials(error_chain(&e)))?;

    tracing::debug!(
        "Resolved AWS credentials for access key {}",
        credentials.access_key_id()
    );
    Ok(credentials)
}

/// Flatten an error and its sources into one line
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Check the shape of a region identifier such as `us-east-1` or `us-gov-west-1`.
///
/// Two lowercase letters, one or more lowercase words, then a number.
pub fn validate_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    let (first, rest) = (parts[0], &parts[1..]);
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return false,
    };

    first.len() == 2
        && first.chars().all(|c| c.is_ascii_lowercase())
        && middle
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
        && !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
}

/// Regions with an AWS Backup endpoint
pub fn list_regions() -> Vec<&'static str> {
    vec![
        // Americas
        "us-east-1",
        "us-east-2",
        "us-west-1",
        "us-west-2",
        "ca-central-1",
        "ca-west-1",
        "mx-central-1",
        "sa-east-1",
        // Europe
        "eu-central-1",
        "eu-central-2",
        "eu-west-1",
        "eu-west-2",
        "eu-west-3",
        "eu-north-1",
        "eu-south-1",
        "eu-south-2",
        // Asia Pacific
        "ap-east-1",
        "ap-south-1",
        "ap-south-2",
        "ap-northeast-1",
        "ap-northeast-2",
        "ap-northeast-3",
        "ap-southeast-1",
        "ap-southeast-2",
        "ap-southeast-3",
        "ap-southeast-4",
        "ap-southeast-5",
        "ap-southeast-7",
        // Middle East & Africa
        "me-south-1",
        "me-central-1",
        "il-central-1",
        "af-south-1",
        // China & GovCloud
        "cn-north-1",
        "cn-northwest-1",
        "us-gov-east-1",
        "us-gov-west-1",
    ]
}

pub fn is_known_region(region: &str) -> bool {
    list_regions().contains(&region)
}

/// Reject malformed regions; accept well-formed unknown ones with a warning
pub fn check_region(region: &str) -> ReportResult<()> {
    if !validate_region(region) {
        return Err(ReportError::InvalidRegion(region.to_string()));
    }
    if !is_known_region(region) {
        tracing::warn!(
            "Region {} is not in the known region list; continuing anyway",
            region
        );
    }
    Ok(())
}

/// Interpret an answer to the numbered region menu.
///
/// Accepts a 1-based index into `regions` or one of the listed names.
pub fn parse_region_choice(input: &str, regions: &[&str]) -> Option<String> {
    let input = input.trim();
    if let Ok(index) = input.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| regions.get(i))
            .map(|r| r.to_string());
    }
    regions
        .iter()
        .find(|r| **r == input)
        .map(|r| r.to_string())
}
