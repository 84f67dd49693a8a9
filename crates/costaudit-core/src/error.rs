//! Error types for costaudit
//!
//! This module defines the error types used throughout the costaudit crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! None of these errors are retried internally. They describe configuration
//! mistakes, bad input data or history drift, and the caller decides whether
//! to skip the offending input or abort the run.
//!
//! # Example
//!
//! ```
//! use costaudit_core::error::{AuditError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to AuditError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{KeyPath, NodeShape};

/// Main error type for costaudit operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid category or filter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record failed its type constraints
    #[error("Malformed record {record}: {reason}")]
    MalformedRecord {
        /// Record id, or a positional description when the record has none
        record: String,
        /// What was wrong with it
        reason: String,
    },

    /// A key path changed shape between merges
    #[error("History key {path} was recorded as {existing} but is now {requested}")]
    HistoryKeyMismatch {
        /// The offending key path
        path: KeyPath,
        /// Shape already stored in the history
        existing: NodeShape,
        /// Shape carried by the new snapshot
        requested: NodeShape,
    },

    /// The period has already been merged into the history
    #[error("Period {0} is already recorded in the history")]
    PeriodAlreadyRecorded(NaiveDate),

    /// The period is older than the latest merged period
    #[error("Period {period} is older than the latest recorded period {latest}")]
    PeriodOutOfOrder {
        /// Period that was offered
        period: NaiveDate,
        /// Latest period already in the history
        latest: NaiveDate,
    },

    /// A summed total overflowed or is not a number
    #[error("Total for {path} is not a finite number ({total})")]
    NonFiniteTotal {
        /// Key path carrying the total
        path: KeyPath,
        /// The offending value
        total: f64,
    },
}

/// Convenience type alias for Results in costaudit
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AuditError::Config("unknown attribute 'colour'".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: unknown attribute 'colour'"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let audit_error: AuditError = io_error.into();
        assert!(matches!(audit_error, AuditError::Io(_)));
    }

    #[test]
    fn test_key_mismatch_display() {
        let error = AuditError::HistoryKeyMismatch {
            path: KeyPath::from_segments(["By Person", "alice"]),
            existing: NodeShape::Leaf,
            requested: NodeShape::Internal,
        };
        assert_eq!(
            error.to_string(),
            "History key By Person / alice was recorded as leaf but is now internal"
        );
    }

    #[test]
    fn test_non_finite_total_display() {
        let error = AuditError::NonFiniteTotal {
            path: KeyPath::from_segments(["By Person"]),
            total: f64::INFINITY,
        };
        assert_eq!(
            error.to_string(),
            "Total for By Person is not a finite number (inf)"
        );
    }
}
