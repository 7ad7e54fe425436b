//! AWS Backup inventory and reporting
//!
//! Fetches AWS Backup plans, selections, jobs, recovery points and protected
//! resources for one region, reconciles them into a single [`BackupReport`],
//! and renders that report as JSON and as an Excel workbook.
//!
//! # Module Structure
//!
//! - [`aws`] - credentials, SigV4 signing and the Backup REST client
//! - [`fetcher`] - paginated, concurrent collection of raw records
//! - [`model`] - raw API record shapes and the report model
//! - [`aggregate`] - normalization and aggregation engine
//! - [`render`] - JSON and spreadsheet renderers
//!
//! # Example
//!
//! ```ignore
//! use aws_backup_report::{aggregate, fetcher, render};
//!
//! async fn example(client: &aws_backup_report::aws::BackupClient) -> anyhow::Result<()> {
//!     let inventory = fetcher::fetch_inventory(client, &Default::default()).await?;
//!     let report = aggregate(&inventory, "eu-west-1")?;
//!     render::write_reports(&report, "report.json".as_ref(), "analysis.xlsx".as_ref())?;
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod aws;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod render;

/// Version injected at compile time via AWS_BACKUP_REPORT_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AWS_BACKUP_REPORT_VERSION") {
    Some(v) => v,
    None => "dev",
};

pub use aggregate::{aggregate, aggregate_with_clock};
pub use error::{ReportError, ReportResult};
pub use model::{BackupReport, Collection, RawInventory};
