//! Plain-text delta report
//!
//! One row per key path in the history, carrying the latest value and its
//! change since the previous observation. The `Display` form is the daily
//! report text:
//!
//! ```text
//! By Person: $17.50 up $2.50 from yesterday
//!     alice: $12.50 up $2.50 from yesterday
//!         EC2: $12.50 up $2.50 from yesterday
//!     bob: no activity
//!         S3: no activity
//! ```
//!
//! (indentation is one tab per level).

use crate::delta::Delta;
use crate::history::History;
use costaudit_core::types::KeyPath;
use serde::Serialize;
use std::fmt;

/// Label printed for an empty category value
pub const UNLABELLED: &str = "Not Labelled";

/// One line of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Key path of the series
    pub path: KeyPath,
    /// Latest value and its change
    pub delta: Delta,
    /// Whether the path has an entry for the most recent period
    pub active: bool,
}

impl ReportRow {
    /// Last path segment, with empty values shown as "Not Labelled"
    pub fn label(&self) -> &str {
        match self.path.last() {
            Some("") | None => UNLABELLED,
            Some(label) => label,
        }
    }
}

/// Delta rows for every key path, ordered by path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeltaReport {
    rows: Vec<ReportRow>,
}

impl DeltaReport {
    /// Build the report from the current history
    pub fn from_history(history: &History) -> Self {
        let latest = history.latest_period();
        let rows = history
            .iter()
            .map(|(path, series)| ReportRow {
                path: path.clone(),
                delta: series.delta(),
                active: Some(series.latest().period) == latest,
            })
            .collect();
        Self { rows }
    }

    /// All rows in key path order
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Row for a key path
    pub fn row(&self, path: &KeyPath) -> Option<&ReportRow> {
        self.rows
            .binary_search_by(|row| row.path.cmp(path))
            .ok()
            .map(|index| &self.rows[index])
    }

    /// Whether the history had no series
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for DeltaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first_view = true;
        for row in &self.rows {
            let depth = row.path.depth();
            if depth == 0 {
                continue;
            }
            if depth == 1 {
                if !first_view {
                    writeln!(f)?;
                }
                first_view = false;
            }

            for _ in 1..depth {
                write!(f, "\t")?;
            }
            if row.active {
                writeln!(f, "{}: {}", row.label(), row.delta)?;
            } else {
                writeln!(f, "{}: no activity", row.label())?;
            }
        }
        Ok(())
    }
}
