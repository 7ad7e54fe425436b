//! Data model
//!
//! - [`raw`] - records as the AWS Backup API returns them, every field optional
//! - [`report`] - the normalized report handed to renderers
//! - [`status`] - closed status enumerations with an explicit unknown bucket

pub mod raw;
pub mod report;
pub mod status;

pub use raw::*;
pub use report::*;
pub use status::{JobStatus, LastBackupSource, RecoveryPointStatus};
