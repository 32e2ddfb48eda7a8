use std::{any::Any, collections::HashMap, panic::Location};

use parking_lot::Mutex;
use tracing::debug;

use crate::cell::CellId;


/// Expected values recorded for cells, keyed by storage identity.
///
/// A channel for assertion code layered above the cells: production code
/// writes entries (with call-site provenance for diagnostics), assertions
/// read them. The live read path never consults this store, and recording
/// never changes a live value or fires a notification.
pub struct SnapshotStore {
    entries: Mutex<HashMap<CellId, SnapshotEntry>>,
}

struct SnapshotEntry {
    value: Box<dyn Any + Send>,
    site: &'static Location<'static>,
}

impl SnapshotStore {
    pub(crate) fn new() -> Self {
        SnapshotStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or overwrites the entry for `id`.
    #[track_caller]
    pub fn record<T: Send + 'static>(&self, id: CellId, value: T) {
        let site = Location::caller();
        debug!(cell = %id, site = %site, "recorded snapshot");
        self.entries.lock().insert(
            id,
            SnapshotEntry {
                value: Box::new(value),
                site,
            },
        );
    }

    /// The recorded value for `id`, or absent.
    ///
    /// Also absent when the entry was recorded with a different type.
    pub fn lookup<T: Clone + 'static>(&self, id: CellId) -> Option<T> {
        self.entries
            .lock()
            .get(&id)
            .and_then(|entry| entry.value.downcast_ref::<T>().cloned())
    }

    /// Where the entry for `id` was recorded.
    pub fn site(&self, id: CellId) -> Option<&'static Location<'static>> {
        self.entries.lock().get(&id).map(|entry| entry.site)
    }

    /// Removes the entry for `id`, returning whether one existed.
    pub fn remove(&self, id: CellId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// Drops every entry. Intended for test-run teardown.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
