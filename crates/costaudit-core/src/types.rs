//! Core domain types for costaudit
//!
//! This module contains the fundamental types used throughout the costaudit
//! crates: billing records, the owner tag normalisation, record attributes
//! and the key paths that address nodes of a grouped total tree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::error::{AuditError, Result};

/// Owner assigned to line items without a usable owner tag
pub const NO_OWNER: &str = "No Owner";

/// Prefix of instance ids that sometimes end up in the owner tag
const MACHINE_OWNER_PREFIX: &str = "i-";

/// Strongly-typed line item id wrapper
///
/// Carried through the pipeline for traceability only; records have no
/// identity beyond field equality.
///
/// # Examples
/// ```
/// use costaudit_core::types::RecordId;
///
/// let id = RecordId::new("900000000000123456");
/// assert_eq!(id.as_str(), "900000000000123456");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new RecordId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalised owner of a billing line item
///
/// Owner tags are free-form. An absent or empty tag, or a tag that is really
/// a machine-generated instance id (`i-0a2754aa8ff2e3f71`), is mapped to the
/// [`NO_OWNER`] sentinel so those costs are reported together.
///
/// # Examples
/// ```
/// use costaudit_core::types::{OwnerTag, NO_OWNER};
///
/// assert_eq!(OwnerTag::from_raw(Some("alice")).as_str(), "alice");
/// assert_eq!(OwnerTag::from_raw(Some("")).as_str(), NO_OWNER);
/// assert_eq!(OwnerTag::from_raw(Some("i-0a2754aa8ff2e3f71")).as_str(), NO_OWNER);
/// assert_eq!(OwnerTag::from_raw(None).as_str(), NO_OWNER);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerTag(String);

impl OwnerTag {
    /// Normalise a raw owner tag
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(tag) if !tag.is_empty() && !tag.starts_with(MACHINE_OWNER_PREFIX) => {
                Self(tag.to_string())
            }
            _ => Self::unowned(),
        }
    }

    /// The sentinel owner
    pub fn unowned() -> Self {
        Self(NO_OWNER.to_string())
    }

    /// Whether this is the sentinel owner
    pub fn is_unowned(&self) -> bool {
        self.0 == NO_OWNER
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A categorical attribute of a [`Record`] that can be grouped or filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// Normalised owner tag
    Owner,
    /// Billed service (product code)
    Service,
    /// Linked account name
    Account,
    /// Region or availability zone; empty means unlabelled
    Region,
}

impl Attribute {
    /// All groupable attributes
    pub const ALL: [Attribute; 4] = [
        Attribute::Owner,
        Attribute::Service,
        Attribute::Account,
        Attribute::Region,
    ];

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Service => "service",
            Self::Account => "account",
            Self::Region => "region",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Attribute {
    type Err = AuditError;

    /// Accepts the short names as well as the cost allocation export columns.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "owner" | "Owner" | "user:Owner" => Ok(Self::Owner),
            "service" | "Service" | "ProductCode" => Ok(Self::Service),
            "account" | "Account" | "LinkedAccountName" => Ok(Self::Account),
            "region" | "Region" | "AvailabilityZone" => Ok(Self::Region),
            other => Err(AuditError::Config(format!(
                "unknown record attribute '{other}'. Expected one of: owner, service, account, region"
            ))),
        }
    }
}

/// A single billing line item
///
/// Records are produced by an ingestion collaborator (a billing API client or
/// a CSV reader) and are never mutated afterwards.
///
/// # Examples
/// ```
/// use costaudit_core::types::{Attribute, OwnerTag, Record};
/// use chrono::NaiveDate;
///
/// let record = Record {
///     record_id: None,
///     owner: OwnerTag::from_raw(Some("alice")),
///     service: "AmazonEC2".to_string(),
///     account: "platform-dev".to_string(),
///     region: "us-west-2a".to_string(),
///     period_date: NaiveDate::from_ymd_opt(2019, 1, 15).unwrap(),
///     cost: 12.5,
/// };
///
/// assert_eq!(record.attribute(Attribute::Service), "AmazonEC2");
/// assert!(record.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Optional line item id, for traceability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    /// Normalised owner
    pub owner: OwnerTag,
    /// Billed service
    pub service: String,
    /// Linked account name
    pub account: String,
    /// Region; empty when unlabelled
    #[serde(default)]
    pub region: String,
    /// Day the cost was incurred
    pub period_date: NaiveDate,
    /// Cost in USD
    pub cost: f64,
}

impl Record {
    /// Value of a categorical attribute
    pub fn attribute(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Owner => self.owner.as_str(),
            Attribute::Service => &self.service,
            Attribute::Account => &self.account,
            Attribute::Region => &self.region,
        }
    }

    /// Check the record's type constraints
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::MalformedRecord`] when the cost is not a finite,
    /// non-negative number.
    pub fn validate(&self) -> Result<()> {
        if !self.cost.is_finite() {
            return Err(self.malformed(format!("cost {} is not a finite number", self.cost)));
        }
        if self.cost < 0.0 {
            return Err(self.malformed(format!("cost {} is negative", self.cost)));
        }
        Ok(())
    }

    fn malformed(&self, reason: String) -> AuditError {
        AuditError::MalformedRecord {
            record: self.describe(),
            reason,
        }
    }

    /// Short human readable identification for error messages
    pub fn describe(&self) -> String {
        match &self.record_id {
            Some(id) => id.to_string(),
            None => format!("{}/{}@{}", self.owner, self.service, self.period_date),
        }
    }
}

/// Whether a grouped node is a leaf bucket or an internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    /// Bottom level: a bucket of records
    Leaf,
    /// A node with children keyed by the next category's values
    Internal,
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Address of a node in a grouped tree or a series in the history
///
/// A sequence of category values, usually prefixed with a view name such as
/// `"By Person"`. Paths are short, so the segments live inline.
///
/// # Examples
/// ```
/// use costaudit_core::types::KeyPath;
///
/// let path = KeyPath::from_segments(["By Person", "alice"]).child("AmazonEC2");
/// assert_eq!(path.depth(), 3);
/// assert_eq!(path.last(), Some("AmazonEC2"));
/// assert_eq!(path.to_string(), "By Person / alice / AmazonEC2");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath(SmallVec<[String; 4]>);

impl KeyPath {
    /// The empty (root) path
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from its segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// A new path with one more segment
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.0.push(segment.into());
        path
    }

    /// The path with its last segment removed
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        let mut path = self.clone();
        path.0.pop();
        Some(path)
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Final segment
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// First segment
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Iterate over the segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether `self` starts with all segments of `prefix`
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cost: f64) -> Record {
        Record {
            record_id: None,
            owner: OwnerTag::from_raw(Some("bob")),
            service: "AmazonS3".to_string(),
            account: "toil-dev".to_string(),
            region: String::new(),
            period_date: NaiveDate::from_ymd_opt(2019, 1, 2).unwrap(),
            cost,
        }
    }

    #[test]
    fn test_owner_normalisation() {
        assert_eq!(OwnerTag::from_raw(Some("  carol ")).as_str(), "carol");
        assert!(OwnerTag::from_raw(Some("   ")).is_unowned());
        assert!(OwnerTag::from_raw(Some("i-0abc")).is_unowned());
        // Only the instance-id prefix is treated as machine generated
        assert_eq!(OwnerTag::from_raw(Some("ian")).as_str(), "ian");
    }

    #[test]
    fn test_attribute_from_str() {
        assert_eq!("owner".parse::<Attribute>().unwrap(), Attribute::Owner);
        assert_eq!("ProductCode".parse::<Attribute>().unwrap(), Attribute::Service);
        assert_eq!(
            "LinkedAccountName".parse::<Attribute>().unwrap(),
            Attribute::Account
        );
        assert_eq!(
            "AvailabilityZone".parse::<Attribute>().unwrap(),
            Attribute::Region
        );
        assert!(matches!(
            "colour".parse::<Attribute>(),
            Err(AuditError::Config(_))
        ));
    }

    #[test]
    fn test_record_validation() {
        assert!(record(0.0).validate().is_ok());
        assert!(record(3.25).validate().is_ok());

        let err = record(-1.0).validate().unwrap_err();
        assert!(matches!(err, AuditError::MalformedRecord { .. }));

        let err = record(f64::NAN).validate().unwrap_err();
        assert!(err.to_string().contains("bob/AmazonS3@2019-01-02"));
    }

    #[test]
    fn test_record_describe_prefers_id() {
        let mut r = record(1.0);
        r.record_id = Some(RecordId::new("42"));
        assert_eq!(r.describe(), "42");
    }

    #[test]
    fn test_key_path_navigation() {
        let path = KeyPath::root().child("By Service").child("AmazonS3");
        assert_eq!(path.first(), Some("By Service"));
        assert_eq!(path.parent().unwrap(), KeyPath::from_segments(["By Service"]));
        assert!(path.starts_with(&KeyPath::from_segments(["By Service"])));
        assert!(!path.starts_with(&KeyPath::from_segments(["By Person"])));
        assert!(KeyPath::root().parent().is_none());
    }

    #[test]
    fn test_key_path_serializes_as_list() {
        let path = KeyPath::from_segments(["By Person", "alice"]);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["By Person","alice"]"#);
        let back: KeyPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
