//! Backup data fetcher
//!
//! - [`collections`] - which REST call feeds which collection
//! - [`paginate`] - NextToken loop and item extraction
//! - [`inventory`] - concurrent fetch of the full [`RawInventory`](crate::model::RawInventory)

pub mod collections;
pub mod inventory;
pub mod paginate;

pub use collections::Listing;
pub use inventory::{fetch_inventory, FetchOptions, DEFAULT_LOOKBACK_DAYS};
pub use paginate::{extract_items, fetch_all, fetch_page, Page};
