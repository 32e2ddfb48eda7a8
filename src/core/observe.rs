use tracing::error;

use crate::{cell::CellId, error::PersistError};

/// Hooks an external change-tracking system implements.
///
/// The cells call these around every read and scoped mutation; the tracking
/// itself lives outside this crate. Derived views report through the
/// identity of the storage they project.
pub trait AccessObserver: Send + Sync + 'static {
    fn did_access(&self, cell: CellId) {
        let _ = cell;
    }
    fn will_mutate(&self, cell: CellId) {
        let _ = cell;
    }
    fn did_mutate(&self, cell: CellId) {
        let _ = cell;
    }
}

/// Observer that tracks nothing.
pub struct NullObserver;

impl AccessObserver for NullObserver {}

/// Sink for persistence failures nobody handled at the call site.
pub trait IssueSink: Send + Sync + 'static {
    fn report(&self, error: &PersistError);
}

/// Issue sink that logs through `tracing`.
pub struct LogSink;

impl IssueSink for LogSink {
    fn report(&self, error: &PersistError) {
        error!(error = %error, "unhandled persistence failure");
    }
}
