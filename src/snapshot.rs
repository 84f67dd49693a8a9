//! Per-period snapshots of grouped totals
//!
//! A [`PeriodSnapshot`] is the flattened form of one observation: every node
//! of one or more totals trees, addressed by its [`KeyPath`] and mounted
//! under a view name such as `"By Person"`. This is what the history merger
//! consumes.

use crate::totals::TotalsNode;
use chrono::NaiveDate;
use costaudit_core::error::{AuditError, Result};
use costaudit_core::types::{KeyPath, NodeShape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Total of one node for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Whether the node was a leaf or an internal node
    pub shape: NodeShape,
    /// The node's total for the period
    pub total: f64,
}

/// All node totals observed for one period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSnapshot {
    period: NaiveDate,
    entries: BTreeMap<KeyPath, SnapshotEntry>,
}

impl PeriodSnapshot {
    /// Create an empty snapshot for a period
    pub fn new(period: NaiveDate) -> Self {
        Self {
            period,
            entries: BTreeMap::new(),
        }
    }

    /// Mount a totals tree under a view name
    ///
    /// The tree root is recorded at `[view]`, its children at
    /// `[view, value]` and so on.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Config`] if the view name is empty or already
    /// mounted in this snapshot, and [`AuditError::NonFiniteTotal`] if a node
    /// total overflowed. Nothing is mounted when an error is returned.
    pub fn add_tree(&mut self, view: &str, tree: &TotalsNode) -> Result<()> {
        if view.is_empty() {
            return Err(AuditError::Config("view name must not be empty".to_string()));
        }
        let mount = KeyPath::from_segments([view]);
        if self.entries.contains_key(&mount) {
            return Err(AuditError::Config(format!(
                "view '{view}' is mounted twice in the snapshot for {}",
                self.period
            )));
        }

        let mut mounted = Vec::new();
        for (relative, node) in tree.walk() {
            let path = relative
                .segments()
                .fold(mount.clone(), |path, segment| path.child(segment));
            check_finite(&path, node.total())?;
            mounted.push((
                path,
                SnapshotEntry {
                    shape: node.shape(),
                    total: node.total(),
                },
            ));
        }
        self.entries.extend(mounted);
        Ok(())
    }

    /// Builder form of [`add_tree`](Self::add_tree)
    pub fn with_tree(mut self, view: &str, tree: &TotalsNode) -> Result<Self> {
        self.add_tree(view, tree)?;
        Ok(self)
    }

    /// Record a single node total directly
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::NonFiniteTotal`] for NaN or infinite totals.
    pub fn insert(&mut self, path: KeyPath, shape: NodeShape, total: f64) -> Result<()> {
        check_finite(&path, total)?;
        self.entries.insert(path, SnapshotEntry { shape, total });
        Ok(())
    }

    /// Period this snapshot observes
    pub fn period(&self) -> NaiveDate {
        self.period
    }

    /// Entry for a key path
    pub fn get(&self, path: &KeyPath) -> Option<&SnapshotEntry> {
        self.entries.get(path)
    }

    /// All entries in key path order
    pub fn entries(&self) -> impl Iterator<Item = (&KeyPath, &SnapshotEntry)> {
        self.entries.iter()
    }

    /// Number of key paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reject totals that JSON cannot carry
pub(crate) fn check_finite(path: &KeyPath, total: f64) -> Result<()> {
    if total.is_finite() {
        Ok(())
    } else {
        Err(AuditError::NonFiniteTotal {
            path: path.clone(),
            total,
        })
    }
}
