use std::sync::Arc;

use parking_lot::Mutex;
use slabmap::SlabMap;

use crate::core::Runtime;

/// Change watchers of one cell.
///
/// Notification applies the affinity policy: if the notifying thread is the
/// affinity context the watchers run inline, otherwise they are queued onto
/// it. The mutation itself is already visible on every thread either way.
pub(crate) struct Watchers(Mutex<SlabMap<Arc<dyn Fn() + Send + Sync>>>);

impl Watchers {
    pub fn new() -> Self {
        Watchers(Mutex::new(SlabMap::new()))
    }

    pub fn insert(&self, f: Arc<dyn Fn() + Send + Sync>) -> usize {
        self.0.lock().insert(f)
    }

    pub fn remove(&self, key: usize) {
        self.0.lock().remove(key);
    }

    pub fn notify(&self, rt: &Runtime) {
        let watchers: Vec<_> = self.0.lock().iter().map(|(_, f)| f.clone()).collect();
        if watchers.is_empty() {
            return;
        }
        if rt.scheduler().is_affinity() {
            for f in &watchers {
                f();
            }
        } else {
            rt.scheduler().on_affinity(Box::new(move || {
                for f in &watchers {
                    f();
                }
            }));
        }
    }
}
