use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    cell::{CellId, ReadCell, WriteCell},
    core::Runtime,
    error::PersistError,
    subscription::Subscription,
};

/// A non-optional view over an optional-valued cell.
///
/// Reads return the base's value whenever it is present and fall back to
/// the last present value otherwise, so this view never reports "absent" —
/// a transient gap in the base (for example mid-reload) is bridged by the
/// cache. Clones share the cache.
pub struct Unwrapped<C, U> {
    base: C,
    cache: Arc<Mutex<U>>,
}

impl<C, U> Unwrapped<C, U>
where
    C: ReadCell<Value = Option<U>>,
    U: Clone + Send + 'static,
{
    /// Returns `None` if the base is currently absent.
    pub fn new(rt: &Runtime, base: C) -> Option<Self> {
        let seed = base.with_value(rt, |value| value.clone())?;
        Some(Unwrapped {
            base,
            cache: Arc::new(Mutex::new(seed)),
        })
    }

    /// Seeds the cache from `fallback` when the base is currently absent.
    pub fn new_or(rt: &Runtime, base: C, fallback: U) -> Self {
        let seed = base.with_value(rt, |value| value.clone()).unwrap_or(fallback);
        Unwrapped {
            base,
            cache: Arc::new(Mutex::new(seed)),
        }
    }

    pub fn base(&self) -> &C {
        &self.base
    }
}

impl<C, U> ReadCell for Unwrapped<C, U>
where
    C: ReadCell<Value = Option<U>>,
    U: Clone + Send + 'static,
{
    type Value = U;

    fn id(&self) -> CellId {
        self.base.id()
    }

    fn with_value<R>(&self, rt: &Runtime, f: impl FnOnce(&U) -> R) -> R {
        self.base.with_value(rt, |value| match value {
            Some(value) => {
                *self.cache.lock() = value.clone();
                f(value)
            }
            None => f(&*self.cache.lock()),
        })
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

    fn snapshot(&self, rt: &Runtime) -> Option<U> {
        self.base.snapshot(rt).flatten()
    }

    #[track_caller]
    fn record_snapshot(&self, rt: &Runtime, value: U) {
        self.base.record_snapshot(rt, Some(value));
    }
}

impl<C, U> WriteCell for Unwrapped<C, U>
where
    C: WriteCell<Value = Option<U>>,
    U: Clone + Send + 'static,
{
    fn with_lock<R>(&self, rt: &Runtime, f: impl FnOnce(&mut U) -> R) -> R {
        self.base.with_lock(rt, |value| match value.as_mut() {
            Some(value) => {
                let out = f(value);
                *self.cache.lock() = value.clone();
                out
            }
            None => {
                // The base stays absent; the write lands on a scratch copy
                // of the cached value so the target is well-defined.
                let mut scratch = self.cache.lock().clone();
                let out = f(&mut scratch);
                *self.cache.lock() = scratch;
                out
            }
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

impl<C: Clone, U> Clone for Unwrapped<C, U> {
    fn clone(&self) -> Self {
        Unwrapped {
            base: self.base.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<C: PartialEq, U> PartialEq for Unwrapped<C, U> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && Arc::ptr_eq(&self.cache, &other.cache)
    }
}

impl<C: std::fmt::Debug, U> std::fmt::Debug for Unwrapped<C, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Unwrapped").field(&self.base).finish()
    }
}
