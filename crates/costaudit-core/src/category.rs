//! Grouping categories
//!
//! A [`Category`] names a record attribute to partition by and, optionally,
//! the exact set of values to partition into.

use crate::error::{AuditError, Result};
use crate::types::{Attribute, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A grouping dimension
///
/// Without an explicit value set the domain of the category is every
/// distinct value of the attribute observed in the input. With one, the
/// declared values are the domain: each gets a bucket even when no record
/// carries it, and records holding any other value are left out.
///
/// # Examples
/// ```
/// use costaudit_core::category::Category;
/// use costaudit_core::types::Attribute;
///
/// let services = Category::new(Attribute::Service).with_values(["AmazonEC2", "AmazonS3"]);
/// assert!(services.is_declared());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Attribute to partition by
    pub attribute: Attribute,
    /// Explicit value set, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeSet<String>>,
}

impl Category {
    /// Create a category whose domain is derived from the data
    pub fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            values: None,
        }
    }

    /// Declare the value set explicitly
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Whether the value set was declared rather than derived
    pub fn is_declared(&self) -> bool {
        self.values.is_some()
    }

    /// Parse an ordered list of attribute names into categories
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Config`] for unknown attribute names or when the
    /// same attribute appears twice.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Category>> {
        let categories = names
            .iter()
            .map(|name| name.as_ref().parse().map(Category::new))
            .collect::<Result<Vec<_>>>()?;
        ensure_distinct(&categories)?;
        Ok(categories)
    }

    /// The values this category partitions into for the given records
    pub fn domain<'a, I>(&self, records: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        match &self.values {
            Some(values) => values.clone(),
            None => records
                .into_iter()
                .map(|record| record.attribute(self.attribute).to_string())
                .collect(),
        }
    }
}

/// Check that no attribute is used twice in one ordered category list
pub fn ensure_distinct(categories: &[Category]) -> Result<()> {
    let mut seen = HashSet::new();
    for category in categories {
        if !seen.insert(category.attribute) {
            return Err(AuditError::Config(format!(
                "category '{}' is listed more than once",
                category.attribute
            )));
        }
    }
    Ok(())
}
