//! AWS API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - credential and region resolution through the AWS provider chain
//! - [`sigv4`] - Signature Version 4 request signing via `aws-sigv4`
//! - [`http`] - signed HTTP client, error classification and retry
//! - [`client`] - AWS Backup client and URL building
//!
//! # Example
//!
//! ```ignore
//! use aws_backup_report::aws::{auth, BackupClient, ClientOptions};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let sdk_config = auth::load_sdk_config(None, Some("us-east-1")).await;
//!     let creds = auth::resolve_credentials(&sdk_config).await?;
//!     let client = BackupClient::new(creds, "us-east-1", &ClientOptions::default())?;
//!     let plans = client.get(&client.url(&["backup", "plans"], true, &[])).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod sigv4;

pub use aws_credential_types::Credentials;
pub use client::{BackupClient, ClientOptions};
pub use http::{format_aws_error, AwsError};
