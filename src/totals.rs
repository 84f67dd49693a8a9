//! Totals calculator
//!
//! Turns a [`RecordTree`] into a [`TotalsNode`] tree where every node carries
//! its summed cost. Leaves sum the costs of their records, internal nodes sum
//! the totals of their children, so the reconciliation invariant
//! (`node.total == sum(child.total)`) holds by construction.
//!
//! Totals are always derived from the leaf records, never from a previously
//! stored total, which makes [`TotalsNode::recompute`] idempotent.
//!
//! Wide levels (many sibling subtrees) are summed in parallel with rayon.
//! Siblings are independent and their totals are folded in key order
//! afterwards, so the result does not depend on scheduling.

use crate::grouping::RecordTree;
use costaudit_core::types::{Attribute, KeyPath, NodeShape, Record};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Minimum number of siblings before a level is summed in parallel
const PARALLEL_CHILDREN_THRESHOLD: usize = 16;

/// A grouped node with its total attached
///
/// The total is private and only ever set from the records beneath the node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsNode {
    total: f64,
    #[serde(flatten)]
    body: NodeBody,
}

/// Payload of a [`TotalsNode`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum NodeBody {
    /// Bucket of records at the bottom of the tree
    Leaf {
        /// Records in this bucket
        records: Vec<Record>,
    },
    /// Children keyed by the values of `attribute`
    Internal {
        /// Attribute this level is keyed by
        attribute: Attribute,
        /// Child nodes keyed by attribute value
        children: BTreeMap<String, TotalsNode>,
    },
}

/// Attach totals to every node of a grouped tree
pub fn compute_totals(tree: &RecordTree) -> TotalsNode {
    match tree {
        RecordTree::Bucket(records) => TotalsNode::leaf(records.clone()),
        RecordTree::Split {
            attribute,
            children,
        } => {
            let children: BTreeMap<String, TotalsNode> = if children.len() >= PARALLEL_CHILDREN_THRESHOLD {
                children
                    .par_iter()
                    .map(|(value, child)| (value.clone(), compute_totals(child)))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .collect()
            } else {
                children
                    .iter()
                    .map(|(value, child)| (value.clone(), compute_totals(child)))
                    .collect()
            };
            TotalsNode::internal(*attribute, children)
        }
    }
}

fn sum_costs(records: &[Record]) -> f64 {
    records.iter().fold(0.0, |acc, record| acc + record.cost)
}

fn sum_children(children: &BTreeMap<String, TotalsNode>) -> f64 {
    children.values().fold(0.0, |acc, child| acc + child.total)
}

impl TotalsNode {
    fn leaf(records: Vec<Record>) -> Self {
        Self {
            total: sum_costs(&records),
            body: NodeBody::Leaf { records },
        }
    }

    fn internal(attribute: Attribute, children: BTreeMap<String, TotalsNode>) -> Self {
        Self {
            total: sum_children(&children),
            body: NodeBody::Internal {
                attribute,
                children,
            },
        }
    }

    /// Summed cost of everything beneath this node
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Leaf or internal
    pub fn shape(&self) -> NodeShape {
        match self.body {
            NodeBody::Leaf { .. } => NodeShape::Leaf,
            NodeBody::Internal { .. } => NodeShape::Internal,
        }
    }

    /// Node payload
    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    /// Attribute the children are keyed by, for internal nodes
    pub fn attribute(&self) -> Option<Attribute> {
        match &self.body {
            NodeBody::Leaf { .. } => None,
            NodeBody::Internal { attribute, .. } => Some(*attribute),
        }
    }

    /// Children of an internal node
    pub fn children(&self) -> Option<&BTreeMap<String, TotalsNode>> {
        match &self.body {
            NodeBody::Leaf { .. } => None,
            NodeBody::Internal { children, .. } => Some(children),
        }
    }

    /// Child for a category value
    pub fn child(&self, value: &str) -> Option<&TotalsNode> {
        self.children().and_then(|children| children.get(value))
    }

    /// Descendant addressed by a path relative to this node
    pub fn get(&self, path: &KeyPath) -> Option<&TotalsNode> {
        path.segments().try_fold(self, |node, segment| node.child(segment))
    }

    /// Records of a leaf bucket; empty for internal nodes
    pub fn records(&self) -> &[Record] {
        match &self.body {
            NodeBody::Leaf { records } => records,
            NodeBody::Internal { .. } => &[],
        }
    }

    /// Number of records anywhere beneath this node
    pub fn record_count(&self) -> usize {
        match &self.body {
            NodeBody::Leaf { records } => records.len(),
            NodeBody::Internal { children, .. } => children.values().map(TotalsNode::record_count).sum(),
        }
    }

    /// Whether no record sits beneath this node
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Re-derive every total from the leaf records
    pub fn recompute(&mut self) {
        match &mut self.body {
            NodeBody::Leaf { records } => self.total = sum_costs(records),
            NodeBody::Internal { children, .. } => {
                for child in children.values_mut() {
                    child.recompute();
                }
                self.total = sum_children(children);
            }
        }
    }

    /// Whether every total matches what its records and children add up to
    pub fn is_reconciled(&self) -> bool {
        match &self.body {
            NodeBody::Leaf { records } => self.total == sum_costs(records),
            NodeBody::Internal { children, .. } => {
                children.values().all(TotalsNode::is_reconciled) && self.total == sum_children(children)
            }
        }
    }

    /// Remove every subtree that holds no records
    ///
    /// Returns how many subtrees were removed. Removed subtrees all total
    /// zero, so no total changes.
    pub fn prune_empty(&mut self) -> usize {
        let NodeBody::Internal { children, .. } = &mut self.body else {
            return 0;
        };

        let mut removed = 0;
        children.retain(|_, child| {
            let keep = !child.is_empty();
            if !keep {
                removed += 1;
            }
            keep
        });
        for child in children.values_mut() {
            removed += child.prune_empty();
        }

        if removed > 0 {
            debug!("Pruned {} empty subtrees", removed);
        }
        removed
    }

    /// Every node in pre-order, with its path relative to this node
    ///
    /// The first item is this node itself at the empty path.
    pub fn walk(&self) -> Vec<(KeyPath, &TotalsNode)> {
        let mut nodes = Vec::new();
        self.walk_into(KeyPath::root(), &mut nodes);
        nodes
    }

    fn walk_into<'a>(&'a self, path: KeyPath, nodes: &mut Vec<(KeyPath, &'a TotalsNode)>) {
        if let NodeBody::Internal { children, .. } = &self.body {
            nodes.push((path.clone(), self));
            for (value, child) in children {
                child.walk_into(path.child(value.as_str()), nodes);
            }
        } else {
            nodes.push((path, self));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group;
    use chrono::NaiveDate;
    use costaudit_core::types::OwnerTag;
    use costaudit_core::Category;

    fn record(owner: &str, service: &str, cost: f64) -> Record {
        Record {
            record_id: None,
            owner: OwnerTag::from_raw(Some(owner)),
            service: service.to_string(),
            account: "platform-dev".to_string(),
            region: String::new(),
            period_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            cost,
        }
    }

    fn sample_tree() -> TotalsNode {
        let records = vec![
            record("alice", "EC2", 10.0),
            record("alice", "EC2", 2.5),
            record("bob", "S3", 5.0),
        ];
        let categories = Category::parse_list(&["owner", "service"]).unwrap();
        compute_totals(&group(&records, &categories).unwrap())
    }

    #[test]
    fn test_totals_reconcile() {
        let tree = sample_tree();
        assert_eq!(tree.total(), 17.5);
        assert_eq!(tree.child("alice").unwrap().total(), 12.5);
        assert_eq!(tree.child("bob").unwrap().total(), 5.0);
        assert!(tree.is_reconciled());
    }

    #[test]
    fn test_empty_group_reports_zero() {
        let tree = sample_tree();
        let empty = tree.get(&KeyPath::from_segments(["alice", "S3"])).unwrap();
        assert_eq!(empty.total(), 0.0);
        assert_eq!(empty.shape(), NodeShape::Leaf);
        assert!(empty.records().is_empty());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let tree = sample_tree();
        let mut again = tree.clone();
        again.recompute();
        again.recompute();
        assert_eq!(again, tree);
    }

    #[test]
    fn test_prune_empty_keeps_totals() {
        let mut tree = sample_tree();
        let before = tree.total();
        assert_eq!(tree.prune_empty(), 2);
        assert_eq!(tree.total(), before);
        assert!(tree.child("alice").unwrap().child("S3").is_none());
        assert!(tree.child("bob").unwrap().child("EC2").is_none());
        assert!(tree.is_reconciled());
    }

    #[test]
    fn test_walk_is_preorder() {
        let mut tree = sample_tree();
        tree.prune_empty();
        let paths: Vec<String> = tree.walk().into_iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["", "alice", "alice / EC2", "bob", "bob / S3"]);
    }

    #[test]
    fn test_wide_level_matches_sequential_sum() {
        let records: Vec<Record> = (0..40)
            .map(|i| record(&format!("user-{i:02}"), "EC2", 0.1 * i as f64))
            .collect();
        let categories = Category::parse_list(&["owner"]).unwrap();
        let tree = compute_totals(&group(&records, &categories).unwrap());

        let expected: f64 = tree.children().unwrap().values().map(|c| c.total()).sum();
        assert_eq!(tree.total(), expected);
        assert_eq!(tree.children().unwrap().len(), 40);
    }

    #[test]
    fn test_serializes_with_shape_tag() {
        let tree = sample_tree();
        let json = serde_json::to_value(tree.child("bob").unwrap()).unwrap();
        assert_eq!(json["shape"], "internal");
        assert_eq!(json["attribute"], "service");
        assert_eq!(json["children"]["S3"]["total"], 5.0);
    }
}
