//! Running history of period totals
//!
//! The [`History`] holds one append-only [`TimeSeries`] per key path. Each
//! call to [`merge`] folds one [`PeriodSnapshot`] into a copy of the history:
//!
//! - a key path seen for the first time starts a new series with one entry;
//! - a known key path gets the new period's total appended;
//! - key paths missing from the snapshot are left alone, so a series shorter
//!   than the number of recorded periods means "no activity" for the periods
//!   it lacks.
//!
//! Existing entries are never modified. A period can be merged only once,
//! and only after every period already recorded. All checks run before
//! anything is written, and the input history is never mutated, so a failed
//! merge leaves the caller's history exactly as it was.
//!
//! # Examples
//!
//! ```
//! use costaudit::history::{merge, History};
//! use costaudit::snapshot::PeriodSnapshot;
//! use costaudit::{KeyPath, NodeShape};
//! use chrono::NaiveDate;
//!
//! let path = KeyPath::from_segments(["By Person", "alice", "EC2"]);
//!
//! let mut day1 = PeriodSnapshot::new(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
//! day1.insert(path.clone(), NodeShape::Leaf, 10.0)?;
//! let mut day2 = PeriodSnapshot::new(NaiveDate::from_ymd_opt(2019, 1, 2).unwrap());
//! day2.insert(path.clone(), NodeShape::Leaf, 12.5)?;
//!
//! let history = merge(&History::new(), &day1)?;
//! let history = merge(&history, &day2)?;
//! assert_eq!(history.series(&path).unwrap().values(), vec![10.0, 12.5]);
//! # Ok::<(), costaudit::AuditError>(())
//! ```

use crate::delta::{Delta, DeltaKind};
use crate::snapshot::{PeriodSnapshot, check_finite};
use chrono::NaiveDate;
use costaudit_core::error::{AuditError, Result};
use costaudit_core::types::{KeyPath, NodeShape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One entry of a running series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Period the total was observed for
    pub period: NaiveDate,
    /// Total for that period
    pub total: f64,
}

/// Append-only, period-ordered totals for one key path
///
/// A series is never empty: it is created with its first entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    shape: NodeShape,
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    fn start(shape: NodeShape, point: SeriesPoint) -> Self {
        Self {
            shape,
            points: vec![point],
        }
    }

    /// Shape the key path had when it was first recorded
    pub fn shape(&self) -> NodeShape {
        self.shape
    }

    /// All entries, oldest first
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// The totals alone, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.total).collect()
    }

    /// Most recent entry
    pub fn latest(&self) -> &SeriesPoint {
        // Series are created with one point and only ever grow
        &self.points[self.points.len() - 1]
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no entries
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Change between the two most recent entries
    pub fn delta(&self) -> Delta {
        match self.points.as_slice() {
            [.., previous, latest] => Delta::between(previous.total, latest.total),
            _ => {
                let latest = self.latest().total;
                Delta {
                    latest,
                    delta: latest,
                    kind: DeltaKind::FirstObservation,
                }
            }
        }
    }

    /// Whether this series' entries are a prefix of `other`'s
    pub fn is_prefix_of(&self, other: &TimeSeries) -> bool {
        self.shape == other.shape && other.points.starts_with(&self.points)
    }
}

/// The durable state across runs: one series per key path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "HistoryDocument", try_from = "HistoryDocument")]
pub struct History {
    periods: Vec<NaiveDate>,
    series: BTreeMap<KeyPath, TimeSeries>,
}

impl History {
    /// An empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no period has been merged yet
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Periods merged so far, oldest first
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Most recent merged period
    pub fn latest_period(&self) -> Option<NaiveDate> {
        self.periods.last().copied()
    }

    /// Whether a period has already been merged
    pub fn contains_period(&self, period: NaiveDate) -> bool {
        self.periods.binary_search(&period).is_ok()
    }

    /// Series for a key path
    pub fn series(&self, path: &KeyPath) -> Option<&TimeSeries> {
        self.series.get(path)
    }

    /// All series in key path order
    pub fn iter(&self) -> impl Iterator<Item = (&KeyPath, &TimeSeries)> {
        self.series.iter()
    }

    /// Series whose key path starts with `prefix`
    pub fn under<'a>(&'a self, prefix: &'a KeyPath) -> impl Iterator<Item = (&'a KeyPath, &'a TimeSeries)> + 'a {
        self.series
            .range(prefix.clone()..)
            .take_while(move |(path, _)| path.starts_with(prefix))
    }

    /// Number of key paths tracked
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Discard every series and recorded period
    pub fn clean(&mut self) {
        info!(
            "Discarding history of {} series over {} periods",
            self.series.len(),
            self.periods.len()
        );
        self.periods.clear();
        self.series.clear();
    }

    /// Fold a snapshot into a copy of this history
    ///
    /// See [`merge`].
    pub fn merge(&self, snapshot: &PeriodSnapshot) -> Result<History> {
        merge(self, snapshot)
    }

    fn check_period(&self, period: NaiveDate) -> Result<()> {
        match self.latest_period() {
            Some(latest) if latest == period || self.contains_period(period) => {
                Err(AuditError::PeriodAlreadyRecorded(period))
            }
            Some(latest) if latest > period => Err(AuditError::PeriodOutOfOrder { period, latest }),
            _ => Ok(()),
        }
    }
}

/// Merge one period's snapshot into the running history
///
/// # Errors
///
/// - [`AuditError::PeriodAlreadyRecorded`] if the period was merged before;
/// - [`AuditError::PeriodOutOfOrder`] if it is older than the latest period;
/// - [`AuditError::HistoryKeyMismatch`] if a key path changed between leaf
///   and internal since it was first recorded;
/// - [`AuditError::NonFiniteTotal`] if a total is NaN or infinite, since it
///   could not be stored.
pub fn merge(history: &History, snapshot: &PeriodSnapshot) -> Result<History> {
    let period = snapshot.period();
    history.check_period(period)?;

    for (path, entry) in snapshot.entries() {
        check_finite(path, entry.total)?;
        if let Some(existing) = history.series.get(path) {
            if existing.shape != entry.shape {
                return Err(AuditError::HistoryKeyMismatch {
                    path: path.clone(),
                    existing: existing.shape,
                    requested: entry.shape,
                });
            }
        }
    }

    let mut merged = history.clone();
    merged.periods.push(period);

    let mut created = 0usize;
    let mut appended = 0usize;
    for (path, entry) in snapshot.entries() {
        let point = SeriesPoint {
            period,
            total: entry.total,
        };
        match merged.series.get_mut(path) {
            Some(series) => {
                series.points.push(point);
                appended += 1;
            }
            None => {
                debug!("New key path {} first seen on {}", path, period);
                merged.series.insert(path.clone(), TimeSeries::start(entry.shape, point));
                created += 1;
            }
        }
    }

    info!(
        "Merged period {}: {} series extended, {} created, {} without activity",
        period,
        appended,
        created,
        history.series.len() - appended
    );

    Ok(merged)
}

/// On-disk layout of a [`History`]
///
/// JSON objects need string keys, so series are stored as a list of
/// `{path, shape, points}` records instead of a map keyed by path.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryDocument {
    periods: Vec<NaiveDate>,
    series: Vec<SeriesDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesDocument {
    path: KeyPath,
    shape: NodeShape,
    points: Vec<SeriesPoint>,
}

impl From<History> for HistoryDocument {
    fn from(history: History) -> Self {
        Self {
            periods: history.periods,
            series: history
                .series
                .into_iter()
                .map(|(path, series)| SeriesDocument {
                    path,
                    shape: series.shape,
                    points: series.points,
                })
                .collect(),
        }
    }
}

impl TryFrom<HistoryDocument> for History {
    type Error = AuditError;

    fn try_from(document: HistoryDocument) -> Result<Self> {
        let corrupt = |reason: String| AuditError::Config(format!("invalid history: {reason}"));

        if !document.periods.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(corrupt("periods are not strictly increasing".to_string()));
        }

        let mut series = BTreeMap::new();
        for entry in document.series {
            if entry.points.is_empty() {
                return Err(corrupt(format!("series {} has no entries", entry.path)));
            }
            if !entry.points.windows(2).all(|pair| pair[0].period < pair[1].period) {
                return Err(corrupt(format!("series {} is not ordered by period", entry.path)));
            }
            if let Some(point) = entry
                .points
                .iter()
                .find(|point| document.periods.binary_search(&point.period).is_err())
            {
                return Err(corrupt(format!(
                    "series {} has an entry for unrecorded period {}",
                    entry.path, point.period
                )));
            }
            let path = entry.path.clone();
            let previous = series.insert(
                entry.path,
                TimeSeries {
                    shape: entry.shape,
                    points: entry.points,
                },
            );
            if previous.is_some() {
                return Err(corrupt(format!("series {path} appears twice")));
            }
        }

        Ok(Self {
            periods: document.periods,
            series,
        })
    }
}
