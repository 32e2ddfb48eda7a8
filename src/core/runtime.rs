use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{key::KeyId, snapshot::SnapshotStore};

use super::{
    observe::{AccessObserver, IssueSink, LogSink, NullObserver},
    scheduler::{Scheduler, ThreadScheduler},
};

pub(crate) type Registry = HashMap<(KeyId, TypeId), Box<dyn Any + Send + Sync>>;

/// The context shared-state cells live in.
///
/// Owns the shared-key registry, the snapshot store, the notification
/// scheduler, and the observation and issue-reporting hooks. Construct one
/// per process (or per test) and pass it to every cell operation; clones
/// share the same context. Worker threads of the default scheduler stop when
/// the last clone is dropped.
pub struct Runtime(Arc<RuntimeCore>);

struct RuntimeCore {
    registry: Mutex<Registry>,
    snapshots: SnapshotStore,
    scheduler: Arc<dyn Scheduler>,
    observer: Arc<dyn AccessObserver>,
    issues: Arc<dyn IssueSink>,
}

impl Runtime {
    /// Creates a runtime with a [`ThreadScheduler`] and default hooks.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a runtime that runs notifications and background work inline.
    ///
    /// Equivalent to `Runtime::builder().scheduler(InlineScheduler).build()`.
    pub fn new_inline() -> Self {
        Self::builder().scheduler(super::InlineScheduler).build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The test-only expected-value store.
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.0.snapshots
    }

    /// Whether two handles refer to the same runtime.
    pub fn same(a: &Runtime, b: &Runtime) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn registry(&self) -> &Mutex<Registry> {
        &self.0.registry
    }
    pub(crate) fn scheduler(&self) -> &dyn Scheduler {
        &*self.0.scheduler
    }
    pub(crate) fn observer(&self) -> &dyn AccessObserver {
        &*self.0.observer
    }
    pub(crate) fn issues(&self) -> &dyn IssueSink {
        &*self.0.issues
    }
}

impl Clone for Runtime {
    fn clone(&self) -> Self {
        Runtime(self.0.clone())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("keys", &self.0.registry.lock().len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct RuntimeBuilder {
    scheduler: Option<Arc<dyn Scheduler>>,
    observer: Option<Arc<dyn AccessObserver>>,
    issues: Option<Arc<dyn IssueSink>>,
}

impl RuntimeBuilder {
    pub fn scheduler(mut self, scheduler: impl Scheduler) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }
    pub fn observer(mut self, observer: impl AccessObserver) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }
    pub fn issue_sink(mut self, issues: impl IssueSink) -> Self {
        self.issues = Some(Arc::new(issues));
        self
    }
    pub fn build(self) -> Runtime {
        Runtime(Arc::new(RuntimeCore {
            registry: Mutex::new(HashMap::new()),
            snapshots: SnapshotStore::new(),
            scheduler: self
                .scheduler
                .unwrap_or_else(|| Arc::new(ThreadScheduler::spawn())),
            observer: self.observer.unwrap_or_else(|| Arc::new(NullObserver)),
            issues: self.issues.unwrap_or_else(|| Arc::new(LogSink)),
        }))
    }
}
