//! Core types, traits, and utilities for costaudit
//!
//! This crate provides the foundational types shared by the costaudit
//! engine: billing records and their attributes, grouping categories,
//! key paths, the predicate filter and the error taxonomy.

pub mod category;
pub mod error;
pub mod filters;
pub mod types;

// Re-export commonly used types
pub use category::Category;
pub use error::{AuditError, Result};
pub use filters::FilterConstraints;
pub use types::{Attribute, KeyPath, NodeShape, OwnerTag, Record, RecordId, NO_OWNER};
