//! JSON configuration
//!
//! The configuration names the record filter and the views to roll up. It is
//! deserialized as-is and only checked by [`AuditConfig::validate`], which
//! turns it into a [`RollupPlan`]. Attribute names are resolved there, so a
//! typo in a category surfaces as [`AuditError::Config`] before any record is
//! touched.
//!
//! ```json
//! {
//!   "filters": { "accounts": ["platform-dev"], "min_cost": 0.0 },
//!   "views": [
//!     { "name": "By Person", "categories": ["owner", "service"] },
//!     { "name": "By Region",
//!       "categories": [{ "attribute": "AvailabilityZone", "values": ["us-west-2a", ""] }] }
//!   ]
//! }
//! ```

use crate::rollup::{BY_PERSON, BY_SERVICE, RollupPlan, View};
use costaudit_core::error::{AuditError, Result};
use costaudit_core::filters::FilterConstraints;
use costaudit_core::types::Attribute;
use costaudit_core::Category;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record filter applied before grouping
    pub filters: FilterConstraints,
    /// Views to roll up, in report order
    pub views: Vec<ViewSettings>,
    /// Drop subtrees without records
    pub prune_empty: bool,
}

/// One view as written in the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    /// Heading and first key path segment of the view
    pub name: String,
    /// Grouping order, outermost first
    pub categories: Vec<CategorySetting>,
}

/// A category given either by attribute name or with explicit values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategorySetting {
    /// Attribute name only; values come from the data
    Name(String),
    /// Attribute name with an optional declared value set
    Detailed {
        /// Attribute name or export column
        attribute: String,
        /// Declared values; must not be empty when present
        #[serde(default)]
        values: Option<Vec<String>>,
    },
}

impl CategorySetting {
    fn resolve(&self) -> Result<Category> {
        match self {
            Self::Name(name) => Ok(Category::new(name.parse::<Attribute>()?)),
            Self::Detailed { attribute, values } => {
                let category = Category::new(attribute.parse::<Attribute>()?);
                match values {
                    Some(values) if values.is_empty() => Err(AuditError::Config(format!(
                        "category '{}' declares an empty value set",
                        category.attribute
                    ))),
                    Some(values) => Ok(category.with_values(values.iter().cloned())),
                    None => Ok(category),
                }
            }
        }
    }
}

impl ViewSettings {
    fn new(name: &str, attributes: [Attribute; 2]) -> Self {
        Self {
            name: name.to_string(),
            categories: attributes
                .iter()
                .map(|attribute| CategorySetting::Name(attribute.name().to_string()))
                .collect(),
        }
    }

    fn resolve(&self) -> Result<View> {
        let categories = self
            .categories
            .iter()
            .map(CategorySetting::resolve)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| match e {
                AuditError::Config(reason) => AuditError::Config(format!("view '{}': {reason}", self.name)),
                other => other,
            })?;
        View::new(self.name.clone(), categories)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            filters: FilterConstraints::default(),
            views: vec![
                ViewSettings::new(BY_PERSON, [Attribute::Owner, Attribute::Service]),
                ViewSettings::new(BY_SERVICE, [Attribute::Service, Attribute::Owner]),
            ],
            prune_empty: true,
        }
    }
}

impl AuditConfig {
    /// Parse a configuration document
    ///
    /// Malformed JSON and wrongly typed values (such as a non-numeric
    /// `min_cost`) are reported as [`AuditError::Config`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AuditError::Config(format!("invalid configuration: {e}")))
    }

    /// Read and parse a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Resolve attribute names and check every constraint
    ///
    /// # Errors
    ///
    /// [`AuditError::Config`] for unknown attributes, repeated categories
    /// within a view, empty or duplicated view names, and invalid cost bounds.
    pub fn validate(&self) -> Result<RollupPlan> {
        let views = self
            .views
            .iter()
            .map(ViewSettings::resolve)
            .collect::<Result<Vec<_>>>()?;

        let plan = RollupPlan {
            filter: self.filters.clone(),
            views,
            prune_empty: self.prune_empty,
        };
        plan.validate()?;
        Ok(plan)
    }
}
