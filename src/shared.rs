use std::{any::TypeId, sync::Arc};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    cell::{CellId, ReadCell, WriteCell},
    core::Runtime,
    error::{ErrorSlot, PersistError},
    key::{KeyEvent, KeyId, KeyReceiver, PersistenceKey, SaveMode},
    stream::Changes,
    subscription::Subscription,
    watch::Watchers,
};


/// Handle to a cell whose value is backed by a [`PersistenceKey`].
///
/// Handles constructed with equal key identity share one live cell per
/// runtime: one value, one error state, one key subscription. Each handle
/// holds a reference on the cell; when the last one is dropped the key
/// subscription is cancelled and the cell is evicted from the runtime's
/// registry, so a later handle for the same key starts with a fresh load.
///
/// `==` compares storage identity, never values.
pub struct Shared<T: 'static> {
    node: Arc<PersistedNode<T>>,
}

impl<T: Clone + Send + 'static> Shared<T> {
    /// Returns the live cell for `key`, creating it if none exists.
    ///
    /// Creation loads synchronously: the loaded value is adopted, `initial`
    /// is used when the source has no value, and on failure the load error
    /// is recorded and `initial` is used. The key's live update channel is
    /// opened immediately after.
    pub fn new(rt: &Runtime, key: impl PersistenceKey<Value = T>, initial: T) -> Self {
        let key_id = key.id();
        let registry_key = (key_id.clone(), TypeId::of::<T>());
        let mut registry = rt.registry().lock();
        if let Some(entry) = registry.get(&registry_key) {
            if let Some(node) = entry.downcast_ref::<Arc<PersistedNode<T>>>() {
                node.state.lock().refs += 1;
                return Shared { node: node.clone() };
            }
        }
        let node = PersistedNode::open(rt, Box::new(key), key_id, initial);
        registry.insert(registry_key, Box::new(node.clone()));
        Shared { node }
    }

    /// Identity of the backing key.
    pub fn key_id(&self) -> &KeyId {
        &self.node.key_id
    }

    /// A stream yielding the current value and then one value per change
    /// notification.
    pub fn to_stream(&self, rt: &Runtime) -> Changes<T> {
        Changes::new(self, rt)
    }
}

impl<T: Clone + Send + 'static> ReadCell for Shared<T> {
    type Value = T;

    fn id(&self) -> CellId {
        self.node.id
    }

    fn with_value<R>(&self, rt: &Runtime, f: impl FnOnce(&T) -> R) -> R {
        rt.observer().did_access(self.node.id);
        f(&self.node.state.lock().value)
    }

    fn load_error(&self) -> Option<PersistError> {
        self.node.state.lock().load_error.read()
    }

    fn save_error(&self) -> Option<PersistError> {
        self.node.state.lock().save_error.read()
    }

    fn watch(&self, rt: &Runtime, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        let _ = rt;
        let key = self.node.watchers.insert(Arc::new(f));
        Subscription::from_arc_fn(self.node.clone(), move |node| node.watchers.remove(key))
    }
}

impl<T: Clone + Send + 'static> WriteCell for Shared<T> {
    fn with_lock<R>(&self, rt: &Runtime, f: impl FnOnce(&mut T) -> R) -> R {
        debug_assert!(Runtime::same(rt, &self.node.rt));
        rt.observer().will_mutate(self.node.id);
        let gate = self.node.gate.lock();
        let mut working = {
            let mut state = self.node.state.lock();
            state.save_error.write(None);
            state.value.clone()
        };
        let out = f(&mut working);
        let saved = {
            let mut state = self.node.state.lock();
            state.value = working;
            state.value.clone()
        };
        drop(gate);
        rt.observer().did_mutate(self.node.id);
        self.node.watchers.notify(rt);
        self.node.schedule_save(saved);
        out
    }

    fn touch(&self, rt: &Runtime) {
        self.node.watchers.notify(rt);
    }

    fn load(&self, rt: &Runtime) -> Result<(), PersistError> {
        let node = &self.node;
        let initial = {
            let mut state = node.state.lock();
            state.load_error.write(None);
            state.initial.clone()
        };
        match node.key.load(Some(&initial)) {
            Ok(Some(value)) => {
                node.state.lock().value = value;
                node.watchers.notify(rt);
                Ok(())
            }
            // The source has no value; the previous value is kept.
            Ok(None) => Ok(()),
            Err(error) => {
                warn!(key = %node.key_id, error = %error, "reload failed");
                node.record_load_error(error.clone());
                Err(error)
            }
        }
    }

    fn save(&self, rt: &Runtime) -> Result<(), PersistError> {
        let _ = rt;
        let node = &self.node;
        let value = {
            let mut state = node.state.lock();
            state.save_error.write(None);
            state.value.clone()
        };
        match node.key.save(&value, SaveMode::Immediate) {
            Ok(()) => {
                node.state.lock().load_error.write(None);
                Ok(())
            }
            Err(error) => {
                warn!(key = %node.key_id, error = %error, "save failed");
                node.record_save_error(error.clone());
                Err(error)
            }
        }
    }
}

impl<T: 'static> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.node.state.lock().refs += 1;
        Shared {
            node: self.node.clone(),
        }
    }
}

impl<T: 'static> Drop for Shared<T> {
    fn drop(&mut self) {
        self.node.release();
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}
impl<T> Eq for Shared<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node.state.try_lock() {
            Some(state) => std::fmt::Debug::fmt(&state.value, f),
            None => write!(f, "<locked>"),
        }
    }
}

impl<T> Serialize for Shared<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self.node.state.try_lock() {
            Some(state) => T::serialize(&state.value, serializer),
            None => Err(serde::ser::Error::custom("locked")),
        }
    }
}

struct PersistedNode<T: 'static> {
    id: CellId,
    key_id: KeyId,
    key: Box<dyn PersistenceKey<Value = T>>,
    rt: Runtime,
    state: Mutex<PersistedState<T>>,
    gate: Mutex<()>,
    watchers: Watchers,
}

struct PersistedState<T> {
    value: T,
    initial: T,
    load_error: ErrorSlot,
    save_error: ErrorSlot,
    refs: usize,
    subscription: Option<Subscription>,
}

impl<T: Clone + Send + 'static> PersistedNode<T> {
    fn open(
        rt: &Runtime,
        key: Box<dyn PersistenceKey<Value = T>>,
        key_id: KeyId,
        initial: T,
    ) -> Arc<Self> {
        let mut first_error = None;
        let value = match key.load(Some(&initial)) {
            Ok(Some(value)) => value,
            Ok(None) => initial.clone(),
            Err(error) => {
                warn!(key = %key_id, error = %error, "initial load failed");
                first_error = Some(error);
                initial.clone()
            }
        };
        let node = Arc::new(PersistedNode {
            id: CellId::next(),
            key_id: key_id.clone(),
            key,
            rt: rt.clone(),
            state: Mutex::new(PersistedState {
                value: value.clone(),
                initial,
                load_error: ErrorSlot::default(),
                save_error: ErrorSlot::default(),
                refs: 1,
                subscription: None,
            }),
            gate: Mutex::new(()),
            watchers: Watchers::new(),
        });
        if let Some(error) = first_error {
            node.record_load_error(error);
        }
        let weak = Arc::downgrade(&node);
        let receiver = KeyReceiver::new(move |event| {
            if let Some(node) = weak.upgrade() {
                node.on_key_event(event);
            }
        });
        let subscription = node.key.subscribe(Some(&value), receiver);
        node.state.lock().subscription = Some(subscription);
        debug!(key = %key_id, cell = %node.id, "opened shared cell");
        node
    }

    fn on_key_event(self: &Arc<Self>, event: KeyEvent<T>) {
        match event {
            Ok(update) => {
                {
                    let mut state = self.state.lock();
                    state.load_error.write(None);
                    let next = match update {
                        Some(value) => value,
                        // The source lost its value; converge on the initial.
                        None => state.initial.clone(),
                    };
                    state.value = next;
                }
                self.watchers.notify(&self.rt);
            }
            Err(error) => {
                warn!(key = %self.key_id, error = %error, "subscription update failed");
                self.record_load_error(error);
            }
        }
    }

    // Holds the node alive so a save scheduled just before the last release
    // still reaches the store; the cell is already evicted by then.
    fn schedule_save(self: &Arc<Self>, value: T) {
        let node = self.clone();
        self.rt.scheduler().in_background(Box::new(move || {
            match node.key.save(&value, SaveMode::Deferred) {
                Ok(()) => node.state.lock().load_error.write(None),
                Err(error) => {
                    warn!(key = %node.key_id, error = %error, "deferred save failed");
                    node.record_save_error(error);
                }
            }
        }));
    }

    fn record_load_error(&self, error: PersistError) {
        let monitored = {
            let mut state = self.state.lock();
            let monitored = state.save_error.is_monitored();
            state.load_error.write(Some(error.clone()));
            monitored
        };
        if !monitored {
            self.rt.issues().report(&error);
        }
    }

    fn record_save_error(&self, error: PersistError) {
        let monitored = {
            let mut state = self.state.lock();
            let monitored = state.load_error.is_monitored();
            state.save_error.write(Some(error.clone()));
            monitored
        };
        if !monitored {
            self.rt.issues().report(&error);
        }
    }
}

impl<T: 'static> PersistedNode<T> {
    fn release(self: &Arc<Self>) {
        // Registry before state, everywhere: a release hitting zero is
        // serialized against a concurrent lookup-or-create for the key.
        let mut registry = self.rt.registry().lock();
        let subscription = {
            let mut state = self.state.lock();
            state.refs -= 1;
            if state.refs > 0 {
                return;
            }
            state.subscription.take()
        };
        let registry_key = (self.key_id.clone(), TypeId::of::<T>());
        if let Some(entry) = registry.get(&registry_key) {
            let same = entry
                .downcast_ref::<Arc<PersistedNode<T>>>()
                .map_or(false, |node| Arc::ptr_eq(node, self));
            // Only this exact instance; never a newer cell for the same key.
            if same {
                registry.remove(&registry_key);
            }
        }
        drop(registry);
        debug!(key = %self.key_id, cell = %self.id, "released shared cell");
        drop(subscription);
    }
}
