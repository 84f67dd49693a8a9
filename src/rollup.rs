//! End-to-end rollup of one billing period
//!
//! A [`Rollup`] runs the whole pipeline for one period's records:
//!
//! ```text
//! records -> filter -> group (per view) -> totals -> snapshot -> merge -> deltas
//! ```
//!
//! Nothing is persisted here. The caller loads the history, hands it in,
//! and saves the returned one (see [`HistoryStore`](crate::store::HistoryStore)).

use crate::grouping::group_where;
use crate::history::{History, merge};
use crate::report::DeltaReport;
use crate::snapshot::PeriodSnapshot;
use crate::totals::{TotalsNode, compute_totals};
use chrono::NaiveDate;
use costaudit_core::category::ensure_distinct;
use costaudit_core::error::{AuditError, Result};
use costaudit_core::filters::FilterConstraints;
use costaudit_core::types::{Attribute, Record};
use costaudit_core::Category;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Name of the owner-first view
pub const BY_PERSON: &str = "By Person";
/// Name of the service-first view
pub const BY_SERVICE: &str = "By Service";

/// A named breakdown: an ordered list of grouping categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    name: String,
    categories: Vec<Category>,
}

impl View {
    /// Create a view
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Config`] if the name is empty or an attribute
    /// appears twice in `categories`.
    pub fn new(name: impl Into<String>, categories: Vec<Category>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuditError::Config("view name must not be empty".to_string()));
        }
        ensure_distinct(&categories)?;
        Ok(Self { name, categories })
    }

    /// Owner, then service
    pub fn by_person() -> Self {
        Self {
            name: BY_PERSON.to_string(),
            categories: vec![Category::new(Attribute::Owner), Category::new(Attribute::Service)],
        }
    }

    /// Service, then owner
    pub fn by_service() -> Self {
        Self {
            name: BY_SERVICE.to_string(),
            categories: vec![Category::new(Attribute::Service), Category::new(Attribute::Owner)],
        }
    }

    /// View name, used as the first key path segment
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grouping categories, outermost first
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

/// A validated description of what to roll up and how
#[derive(Debug, Clone, PartialEq)]
pub struct RollupPlan {
    /// Records failing this filter are left out of every view
    pub filter: FilterConstraints,
    /// Views to roll up, each mounted under its own name
    pub views: Vec<View>,
    /// Drop subtrees without records before snapshotting
    pub prune_empty: bool,
}

impl Default for RollupPlan {
    fn default() -> Self {
        Self {
            filter: FilterConstraints::default(),
            views: vec![View::by_person(), View::by_service()],
            prune_empty: true,
        }
    }
}

impl RollupPlan {
    /// Replace the record filter
    pub fn with_filter(mut self, filter: FilterConstraints) -> Self {
        self.filter = filter;
        self
    }

    /// Replace the views
    pub fn with_views(mut self, views: Vec<View>) -> Self {
        self.views = views;
        self
    }

    /// Keep or drop empty subtrees
    pub fn with_prune_empty(mut self, prune_empty: bool) -> Self {
        self.prune_empty = prune_empty;
        self
    }

    /// Check the filter bounds and that view names are present and unique
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;

        if self.views.is_empty() {
            return Err(AuditError::Config("at least one view is required".to_string()));
        }

        let mut names = HashSet::new();
        for view in &self.views {
            if !names.insert(view.name()) {
                return Err(AuditError::Config(format!(
                    "view '{}' is defined more than once",
                    view.name()
                )));
            }
        }
        Ok(())
    }
}

/// Result of rolling up one period
#[derive(Debug, Clone)]
pub struct RollupOutcome {
    /// History with the period merged in
    pub history: History,
    /// This period's totals tree per view name
    pub trees: BTreeMap<String, TotalsNode>,
    /// Latest values and deltas for every key path
    pub deltas: DeltaReport,
}

/// Runs the rollup pipeline for a plan
#[derive(Debug, Clone)]
pub struct Rollup {
    plan: RollupPlan,
}

impl Rollup {
    /// Validate a plan and wrap it
    pub fn new(plan: RollupPlan) -> Result<Self> {
        plan.validate()?;
        Ok(Self { plan })
    }

    /// The validated plan
    pub fn plan(&self) -> &RollupPlan {
        &self.plan
    }

    /// Filter, group and total the records for one view
    pub fn group_view(&self, records: &[Record], view: &View) -> Result<TotalsNode> {
        let filter = &self.plan.filter;
        let tree = group_where(records, view.categories(), |record| filter.matches(record))?;
        let mut totals = compute_totals(&tree);
        if self.plan.prune_empty {
            totals.prune_empty();
        }
        debug!("View '{}' totals {:.2}", view.name(), totals.total());
        Ok(totals)
    }

    /// Totals tree for every view, keyed by view name
    pub fn group_period(&self, records: &[Record]) -> Result<BTreeMap<String, TotalsNode>> {
        self.plan
            .views
            .iter()
            .map(|view| Ok((view.name().to_string(), self.group_view(records, view)?)))
            .collect()
    }

    /// Flatten per-view trees into one snapshot
    pub fn snapshot(&self, period: NaiveDate, trees: &BTreeMap<String, TotalsNode>) -> Result<PeriodSnapshot> {
        let mut snapshot = PeriodSnapshot::new(period);
        for (view, tree) in trees {
            snapshot.add_tree(view, tree)?;
        }
        Ok(snapshot)
    }

    /// Roll up one period's records into the history
    ///
    /// The given history is not modified; on error nothing has changed.
    pub fn run(&self, records: &[Record], period: NaiveDate, history: &History) -> Result<RollupOutcome> {
        info!(
            "Rolling up {} records for {} across {} views",
            records.len(),
            period,
            self.plan.views.len()
        );

        let trees = self.group_period(records)?;
        let snapshot = self.snapshot(period, &trees)?;
        let history = merge(history, &snapshot)?;
        let deltas = DeltaReport::from_history(&history);

        Ok(RollupOutcome {
            history,
            trees,
            deltas,
        })
    }
}
