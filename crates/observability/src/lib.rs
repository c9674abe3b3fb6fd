//! Tracing/logging setup shared by ledger processes and tests.

/// Initialize process-wide tracing with the format chosen by
/// `GEMLEDGER_LOG_FORMAT` (`json` by default).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use crate::tracing::{LogFormat, init_for_tests};
