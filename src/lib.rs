//! costaudit - Hierarchical rollups and day-over-day deltas for cloud billing
//!
//! This library provides functionality to:
//! - Filter billing records by owner, service, account, region and cost
//! - Group records into trees keyed by an ordered list of categories
//! - Attach reconciled totals to every node of those trees
//! - Merge each period's totals into an append-only running history
//! - Compute per-key deltas and render them as a text report
//!
//! Fetching billing exports and rendering charts or emails are left to the
//! caller; the library takes parsed [`Record`]s and hands back trees,
//! histories and reports.
//!
//! # Examples
//!
//! ```no_run
//! use costaudit::{
//!     config::AuditConfig,
//!     rollup::Rollup,
//!     store::HistoryStore,
//!     Record,
//! };
//! use chrono::NaiveDate;
//!
//! fn main() -> costaudit::Result<()> {
//!     let plan = AuditConfig::from_path("audit.json")?.validate()?;
//!     let rollup = Rollup::new(plan)?;
//!     let store = HistoryStore::new("costs.json");
//!
//!     // Records come from the billing export
//!     let records: Vec<Record> = Vec::new();
//!     let period = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
//!
//!     let outcome = rollup.run(&records, period, &store.load()?)?;
//!     store.save(&outcome.history)?;
//!     print!("{}", outcome.deltas);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod delta;
pub mod grouping;
pub mod history;
pub mod report;
pub mod rollup;
pub mod snapshot;
pub mod store;
pub mod totals;

// Re-export the core crate
pub use costaudit_core::{category, error, filters, types};

// Re-export commonly used types
pub use costaudit_core::{
    AuditError, Attribute, Category, FilterConstraints, KeyPath, NodeShape, OwnerTag, Record, RecordId, Result,
    NO_OWNER,
};
pub use delta::{Delta, DeltaKind};
pub use history::History;
pub use rollup::{Rollup, RollupOutcome, RollupPlan};
pub use totals::TotalsNode;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
