//! Process-wide logging setup shared by the binaries.

/// Initialize tracing with the format selected by `TASKGATE_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, output format).
pub mod tracing;
