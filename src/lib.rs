//! Worktrace - Productivity metrics over encrypted activity exports
//!
//! Worktrace reads activity intervals whose duration and away-from-keyboard
//! fields are sealed as authenticated tokens, and turns them into daily and
//! multi-day productivity metrics through a deterministic pipeline:
//! codec unwrapping → token verification and decryption → field parsing →
//! daily aggregation → rollup.
//!
//! ## Modules
//!
//! - **Crypto**: `codec`, `key` and `token` open sealed field values
//! - **Metrics**: `daily`, `rollup`, `stats` and `assessment` compute results
//! - **Input**: `schema` parses exports; `config` loads analyzer settings

pub mod assessment;
pub mod codec;
pub mod config;
pub mod daily;
pub mod error;
pub mod key;
pub mod pipeline;
pub mod record;
pub mod rollup;
pub mod schema;
pub mod stats;
pub mod token;
pub mod types;

pub use codec::TokenCodec;
pub use config::WorktraceConfig;
pub use error::ComputeError;
pub use key::Key;
pub use pipeline::{compute_daily, compute_rollup, ActivityAnalyzer};
pub use record::{seal_field, RecordDecryptor};
pub use rollup::RollupOptions;

// Schema exports
pub use schema::{available_dates, RawActivityRecord, RecordAdapter};

pub use types::{
    ActivityRecord, AfkPolicy, DailyMetrics, EncryptedField, ProductivityTier, RollupMetrics,
};

/// Worktrace version
pub const WORKTRACE_VERSION: &str = env!("CARGO_PKG_VERSION");
