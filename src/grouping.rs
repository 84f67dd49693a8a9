//! Grouping engine
//!
//! Recursively partitions a flat record set into a tree keyed by an ordered
//! list of [`Category`] values: the first category splits the records at the
//! top level, the next one splits each of those buckets, and so on until the
//! categories run out and the remaining records form a leaf bucket.
//!
//! Every level is split over the category's whole domain, not just the
//! values present in the bucket being split. If `alice` used EC2 and `bob`
//! used S3, grouping by `[owner, service]` gives `alice` an empty `S3`
//! bucket, so reports can show "no activity" instead of silently omitting
//! the group. [`TotalsNode::prune_empty`](crate::totals::TotalsNode::prune_empty)
//! removes such buckets when they are not wanted.
//!
//! # Examples
//!
//! ```
//! use costaudit::grouping::group;
//! use costaudit::{Attribute, Category, OwnerTag, Record};
//! use chrono::NaiveDate;
//!
//! let records = vec![Record {
//!     record_id: None,
//!     owner: OwnerTag::from_raw(Some("alice")),
//!     service: "EC2".to_string(),
//!     account: "platform-dev".to_string(),
//!     region: String::new(),
//!     period_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
//!     cost: 10.0,
//! }];
//!
//! let by_service = Category::new(Attribute::Service).with_values(["EC2", "S3"]);
//! let tree = group(&records, &[by_service])?;
//! assert_eq!(tree.child("EC2").unwrap().record_count(), 1);
//! assert_eq!(tree.child("S3").unwrap().record_count(), 0);
//! # Ok::<(), costaudit::AuditError>(())
//! ```

use costaudit_core::category::ensure_distinct;
use costaudit_core::error::Result;
use costaudit_core::types::{Attribute, NodeShape, Record};
use costaudit_core::Category;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Records partitioned by category values, before totals are attached
#[derive(Debug, Clone, PartialEq)]
pub enum RecordTree {
    /// Leaf bucket holding the records that matched every level above it
    Bucket(Vec<Record>),
    /// One child per value of `attribute`
    Split {
        /// Attribute this level is keyed by
        attribute: Attribute,
        /// Child subtrees keyed by attribute value
        children: BTreeMap<String, RecordTree>,
    },
}

impl RecordTree {
    /// Leaf or internal
    pub fn shape(&self) -> NodeShape {
        match self {
            Self::Bucket(_) => NodeShape::Leaf,
            Self::Split { .. } => NodeShape::Internal,
        }
    }

    /// Child subtree for a category value
    pub fn child(&self, value: &str) -> Option<&RecordTree> {
        match self {
            Self::Bucket(_) => None,
            Self::Split { children, .. } => children.get(value),
        }
    }

    /// Number of records anywhere beneath this node
    pub fn record_count(&self) -> usize {
        match self {
            Self::Bucket(records) => records.len(),
            Self::Split { children, .. } => children.values().map(RecordTree::record_count).sum(),
        }
    }

    /// Whether no record ended up beneath this node
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Group records by an ordered list of categories
///
/// # Errors
///
/// Returns a configuration error if a category is repeated, and
/// [`AuditError::MalformedRecord`](costaudit_core::AuditError::MalformedRecord)
/// for the first record whose cost is unusable. Nothing is grouped when an
/// error is returned.
pub fn group(records: &[Record], categories: &[Category]) -> Result<RecordTree> {
    group_where(records, categories, |_| true)
}

/// Group only the records accepted by `predicate`
///
/// Category domains are derived from the accepted records, so this yields
/// the same tree as filtering first and grouping the filtered copy.
pub fn group_where<F>(records: &[Record], categories: &[Category], predicate: F) -> Result<RecordTree>
where
    F: Fn(&Record) -> bool,
{
    ensure_distinct(categories)?;

    let mut selected = Vec::with_capacity(records.len());
    for record in records {
        record.validate()?;
        if predicate(record) {
            selected.push(record);
        }
    }

    debug!(
        "Grouping {} of {} records by [{}]",
        selected.len(),
        records.len(),
        categories
            .iter()
            .map(|c| c.attribute.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let domains: Vec<BTreeSet<String>> = categories
        .iter()
        .map(|category| category.domain(selected.iter().copied()))
        .collect();

    Ok(partition(selected, categories, &domains))
}

fn partition(bucket: Vec<&Record>, categories: &[Category], domains: &[BTreeSet<String>]) -> RecordTree {
    let Some((category, rest)) = categories.split_first() else {
        return RecordTree::Bucket(bucket.into_iter().cloned().collect());
    };
    let domain = &domains[0];

    let mut parts: BTreeMap<&str, Vec<&Record>> = domain
        .iter()
        .map(|value| (value.as_str(), Vec::new()))
        .collect();

    let mut outside_domain = 0usize;
    for record in bucket {
        match parts.get_mut(record.attribute(category.attribute)) {
            Some(part) => part.push(record),
            None => outside_domain += 1,
        }
    }

    if outside_domain > 0 {
        warn!(
            "{} records have a {} outside the declared value set and were left out",
            outside_domain, category.attribute
        );
    }

    let children = parts
        .into_iter()
        .map(|(value, part)| (value.to_string(), partition(part, rest, &domains[1..])))
        .collect();

    RecordTree::Split {
        attribute: category.attribute,
        children,
    }
}
