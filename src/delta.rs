//! Delta calculator
//!
//! Compares the two most recent entries of a running series and classifies
//! the change, so reports can say "up $2.50 from yesterday" instead of
//! printing raw numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Increases below this amount are reported as "up < $0.01"
pub const SUB_CENT_THRESHOLD: f64 = 0.01;

/// How the latest value relates to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// Only one observation exists; the delta is the value itself
    FirstObservation,
    /// The value did not move
    NoChange,
    /// Went up by less than a cent
    SubCentIncrease,
    /// Went up by at least a cent
    Increase,
    /// Went down, e.g. after a credit or billing correction
    Decrease,
}

/// Latest value of a series and its change since the previous observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Most recent value
    pub latest: f64,
    /// `latest - previous`, or `latest` for a first observation
    pub delta: f64,
    /// Classification of `delta`
    pub kind: DeltaKind,
}

impl Delta {
    /// Classify the change between the last two values of a series
    ///
    /// Returns `None` for an empty series.
    ///
    /// # Examples
    /// ```
    /// use costaudit::delta::{Delta, DeltaKind};
    ///
    /// assert_eq!(Delta::from_values(&[5.0]).unwrap().kind, DeltaKind::FirstObservation);
    /// assert_eq!(Delta::from_values(&[5.0, 5.0]).unwrap().kind, DeltaKind::NoChange);
    /// assert_eq!(Delta::from_values(&[5.0, 5.003]).unwrap().kind, DeltaKind::SubCentIncrease);
    ///
    /// let delta = Delta::from_values(&[5.0, 7.5]).unwrap();
    /// assert_eq!(delta.kind, DeltaKind::Increase);
    /// assert_eq!(delta.delta, 2.5);
    /// ```
    pub fn from_values(values: &[f64]) -> Option<Self> {
        match values {
            [] => None,
            [only] => Some(Self {
                latest: *only,
                delta: *only,
                kind: DeltaKind::FirstObservation,
            }),
            [.., previous, latest] => Some(Self::between(*previous, *latest)),
        }
    }

    /// Classify the change from `previous` to `latest`
    pub fn between(previous: f64, latest: f64) -> Self {
        let delta = latest - previous;
        let kind = if delta == 0.0 {
            DeltaKind::NoChange
        } else if delta < 0.0 {
            DeltaKind::Decrease
        } else if delta < SUB_CENT_THRESHOLD {
            DeltaKind::SubCentIncrease
        } else {
            DeltaKind::Increase
        };
        Self {
            latest,
            delta,
            kind,
        }
    }
}

impl fmt::Display for Delta {
    /// Report wording, e.g. `$7.50 up $2.50 from yesterday`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let latest = format_usd(self.latest);
        match self.kind {
            DeltaKind::FirstObservation => write!(f, "{latest} first usage this month"),
            DeltaKind::NoChange => write!(f, "{latest} no change"),
            DeltaKind::SubCentIncrease => write!(f, "{latest} up < $0.01 from yesterday"),
            DeltaKind::Increase => write!(f, "{latest} up ${:.2} from yesterday", self.delta),
            DeltaKind::Decrease => write!(f, "{latest} down ${:.2} from yesterday", -self.delta),
        }
    }
}

/// Format a dollar amount, showing `< $0.01` for positive sub-cent values
///
/// # Examples
/// ```
/// use costaudit::delta::format_usd;
///
/// assert_eq!(format_usd(12.345), "$12.35");
/// assert_eq!(format_usd(0.004), "< $0.01");
/// assert_eq!(format_usd(0.0), "$0.00");
/// ```
pub fn format_usd(amount: f64) -> String {
    if amount > 0.0 && amount < SUB_CENT_THRESHOLD {
        "< $0.01".to_string()
    } else {
        format!("${amount:.2}")
    }
}
