//! Activity export schema
//!
//! This module defines the row format of the upstream activity export and the
//! adapter that validates rows into typed [`ActivityRecord`](crate::types::ActivityRecord)s.
//! Rows are accepted as a JSON array or as NDJSON.

mod adapter;
mod raw_record;

pub use adapter::*;
pub use raw_record::*;
