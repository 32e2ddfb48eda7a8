use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    cell::{CellId, ReadCell, WriteCell},
    core::Runtime,
    error::PersistError,
    subscription::Subscription,
};

/// A view with an explicitly pinned copy of the base's value.
///
/// The slot is filled at construction and changes only on [`reset`](Self::reset)
/// or as a side effect of writing through this view; live reads bypass it.
/// Lets a consumer pin a stable value for one pass while still writing
/// through and resynchronizing deliberately. Clones share the slot.
pub struct Cached<C: ReadCell> {
    base: C,
    slot: Arc<Mutex<C::Value>>,
}

impl<C: ReadCell> Cached<C> {
    pub fn new(rt: &Runtime, base: C) -> Self {
        let value = base.get(rt);
        Cached {
            base,
            slot: Arc::new(Mutex::new(value)),
        }
    }

    /// The pinned value.
    pub fn cached(&self) -> C::Value {
        self.slot.lock().clone()
    }

    /// Copies the current live value into the slot.
    pub fn reset(&self, rt: &Runtime) {
        *self.slot.lock() = self.base.get(rt);
    }

    pub fn base(&self) -> &C {
        &self.base
    }
}

impl<C: ReadCell> ReadCell for Cached<C> {
    type Value = C::Value;

    fn id(&self) -> CellId {
        self.base.id()
    }

    fn with_value<R>(&self, rt: &Runtime, f: impl FnOnce(&C::Value) -> R) -> R {
        self.base.with_value(rt, f)
    }

    fn load_error(&self) -> Option<PersistError> {
        self.base.load_error()
    }

    fn save_error(&self) -> Option<PersistError> {
        self.base.save_error()
    }

    fn watch(&self, rt: &Runtime, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.base.watch(rt, f)
    }

    fn snapshot(&self, rt: &Runtime) -> Option<C::Value> {
        self.base.snapshot(rt)
    }

    #[track_caller]
    fn record_snapshot(&self, rt: &Runtime, value: C::Value) {
        self.base.record_snapshot(rt, value);
    }
}

impl<C: WriteCell> WriteCell for Cached<C> {
    fn with_lock<R>(&self, rt: &Runtime, f: impl FnOnce(&mut C::Value) -> R) -> R {
        let slot = self.slot.clone();
        self.base.with_lock(rt, |value| {
            let out = f(value);
            *slot.lock() = value.clone();
            out
        })
    }

    fn touch(&self, rt: &Runtime) {
        self.base.touch(rt);
    }

    fn load(&self, rt: &Runtime) -> Result<(), PersistError> {
        self.base.load(rt)
    }

    fn save(&self, rt: &Runtime) -> Result<(), PersistError> {
        self.base.save(rt)
    }
}

impl<C: ReadCell + Clone> Clone for Cached<C> {
    fn clone(&self) -> Self {
        Cached {
            base: self.base.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<C: ReadCell + PartialEq> PartialEq for Cached<C> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<C: ReadCell + std::fmt::Debug> std::fmt::Debug for Cached<C>
where
    C::Value: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot.try_lock() {
            Some(slot) => f.debug_tuple("Cached").field(&self.base).field(&*slot).finish(),
            None => write!(f, "<locked>"),
        }
    }
}
