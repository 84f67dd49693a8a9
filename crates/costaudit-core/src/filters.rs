//! Filtering module for billing records
//!
//! This module provides the predicate filter applied to record sets before
//! (or while) grouping them: attribute-value membership and cost bounds.
//!
//! # Examples
//!
//! ```
//! use costaudit_core::filters::FilterConstraints;
//!
//! // Only EC2 and S3 costs above one cent in the dev account
//! let filter = FilterConstraints::new()
//!     .with_services(["AmazonEC2", "AmazonS3"])
//!     .with_accounts(["platform-dev"])
//!     .with_min_cost(0.01);
//! assert!(filter.validate().is_ok());
//! ```

use crate::error::{AuditError, Result};
use crate::types::{Attribute, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filter configuration for billing records
///
/// All constraints are optional and ANDed together. An unset constraint, or
/// a membership set that is empty, does not restrict its dimension. Cost
/// bounds are exclusive: a record passes `min_cost` when its cost is strictly
/// greater, and `max_cost` when strictly smaller.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConstraints {
    /// Owners to keep
    #[serde(default)]
    pub owners: Option<BTreeSet<String>>,
    /// Services to keep
    #[serde(default)]
    pub services: Option<BTreeSet<String>>,
    /// Accounts to keep
    #[serde(default)]
    pub accounts: Option<BTreeSet<String>>,
    /// Regions to keep
    #[serde(default)]
    pub regions: Option<BTreeSet<String>>,
    /// Exclusive lower cost bound
    #[serde(default)]
    pub min_cost: Option<f64>,
    /// Exclusive upper cost bound
    #[serde(default)]
    pub max_cost: Option<f64>,
}

fn value_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl FilterConstraints {
    /// Create a new filter with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these owners
    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owners = Some(value_set(owners));
        self
    }

    /// Keep only these services
    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = Some(value_set(services));
        self
    }

    /// Keep only these accounts
    pub fn with_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accounts = Some(value_set(accounts));
        self
    }

    /// Keep only these regions
    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Some(value_set(regions));
        self
    }

    /// Set the exclusive lower cost bound
    pub fn with_min_cost(mut self, min_cost: f64) -> Self {
        self.min_cost = Some(min_cost);
        self
    }

    /// Set the exclusive upper cost bound
    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    /// Whether no constraint is set at all
    pub fn is_unrestricted(&self) -> bool {
        Attribute::ALL
            .iter()
            .all(|attribute| self.allowed(*attribute).is_none())
            && self.min_cost.is_none()
            && self.max_cost.is_none()
    }

    /// Check the cost bounds
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Config`] when a bound is negative or not finite,
    /// or when `min_cost` is not below `max_cost`.
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("min_cost", self.min_cost), ("max_cost", self.max_cost)] {
            if let Some(value) = bound {
                if !value.is_finite() || value < 0.0 {
                    return Err(AuditError::Config(format!(
                        "{name} must be a non-negative number, got {value}"
                    )));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_cost, self.max_cost) {
            if min >= max {
                return Err(AuditError::Config(format!(
                    "min_cost ({min}) must be lower than max_cost ({max})"
                )));
            }
        }

        Ok(())
    }

    /// The membership set constraining an attribute, if any
    pub fn allowed(&self, attribute: Attribute) -> Option<&BTreeSet<String>> {
        let set = match attribute {
            Attribute::Owner => &self.owners,
            Attribute::Service => &self.services,
            Attribute::Account => &self.accounts,
            Attribute::Region => &self.regions,
        };
        set.as_ref().filter(|values| !values.is_empty())
    }

    /// Check if a record passes the filter
    pub fn matches(&self, record: &Record) -> bool {
        for attribute in Attribute::ALL {
            if let Some(allowed) = self.allowed(attribute) {
                if !allowed.contains(record.attribute(attribute)) {
                    return false;
                }
            }
        }

        if let Some(min) = self.min_cost {
            if record.cost <= min {
                return false;
            }
        }

        if let Some(max) = self.max_cost {
            if record.cost >= max {
                return false;
            }
        }

        true
    }

    /// Borrowing iterator over the records that pass the filter
    pub fn filter_records<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        records.iter().filter(move |record| self.matches(record))
    }

    /// Copy out the records that pass the filter
    ///
    /// The input is left untouched; an empty result is not an error.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        self.filter_records(records).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerTag;
    use chrono::NaiveDate;

    fn record(owner: &str, service: &str, region: &str, cost: f64) -> Record {
        Record {
            record_id: None,
            owner: OwnerTag::from_raw(Some(owner)),
            service: service.to_string(),
            account: "platform-dev".to_string(),
            region: region.to_string(),
            period_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            cost,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("alice", "AmazonEC2", "us-west-2a", 10.0),
            record("bob", "AmazonS3", "", 0.004),
            record("alice", "AmazonS3", "us-east-1b", 2.5),
            record("carol", "AmazonEC2", "us-west-2a", 40.0),
        ]
    }

    #[test]
    fn test_unrestricted_filter_is_identity() {
        let filter = FilterConstraints::new();
        assert!(filter.is_unrestricted());
        assert_eq!(filter.apply(&sample()), sample());
    }

    #[test]
    fn test_owner_and_service_filter() {
        let filter = FilterConstraints::new()
            .with_owners(["alice"])
            .with_services(["AmazonS3"]);
        let kept = filter.apply(&sample());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cost, 2.5);
    }

    #[test]
    fn test_region_filter_matches_unlabelled() {
        let filter = FilterConstraints::new().with_regions([""]);
        let kept = filter.apply(&sample());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].owner.as_str(), "bob");
    }

    #[test]
    fn test_cost_bounds_are_exclusive() {
        let filter = FilterConstraints::new().with_min_cost(2.5).with_max_cost(40.0);
        let kept = filter.apply(&sample());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cost, 10.0);
    }

    #[test]
    fn test_empty_set_does_not_constrain() {
        let filter = FilterConstraints::new().with_owners(Vec::<String>::new());
        assert_eq!(filter.apply(&sample()).len(), 4);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let filter = FilterConstraints::new().with_accounts(["ucsc-cgp-production"]);
        assert!(filter.apply(&sample()).is_empty());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(FilterConstraints::new().with_min_cost(0.0).validate().is_ok());
        assert!(FilterConstraints::new().with_min_cost(-1.0).validate().is_err());
        assert!(FilterConstraints::new().with_max_cost(f64::NAN).validate().is_err());
        assert!(
            FilterConstraints::new()
                .with_min_cost(5.0)
                .with_max_cost(5.0)
                .validate()
                .is_err()
        );
    }
}
