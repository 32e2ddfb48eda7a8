use std::sync::atomic::{AtomicU64, Ordering};

use parse_display::Display;

use crate::{core::Runtime, error::PersistError, subscription::Subscription};

/// Identity of a cell's storage.
///
/// Stable for the lifetime of the cell instance and never reused within a
/// process. Two handles reporting the same `CellId` alias the same storage.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
#[display("cell#{0}")]
pub struct CellId(u64);

impl CellId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        CellId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Read access to an observable cell.
///
/// Reading the current value never fails; the fallible operations are the
/// explicit [`WriteCell::load`] and [`WriteCell::save`].
pub trait ReadCell {
    type Value: Clone + Send + 'static;

    /// Identity of the underlying storage.
    ///
    /// Derived views report the identity of the storage they project, so a
    /// projection and its base share an id. Use `==` on the handles to
    /// compare views including their access path.
    fn id(&self) -> CellId;

    /// Calls `f` with a reference to the current value.
    ///
    /// The closure must not re-enter the same cell.
    fn with_value<R>(&self, rt: &Runtime, f: impl FnOnce(&Self::Value) -> R) -> R;

    /// Gets a copy of the current value.
    fn get(&self, rt: &Runtime) -> Self::Value {
        self.with_value(rt, |value| value.clone())
    }

    /// The most recent load failure, if any.
    ///
    /// Reading the field marks it as read, which suppresses global
    /// auto-reporting of subsequent failures on the other channel.
    fn load_error(&self) -> Option<PersistError> {
        None
    }

    /// The most recent save failure, if any.
    fn save_error(&self) -> Option<PersistError> {
        None
    }

    /// Registers a change watcher.
    ///
    /// `f` is called after every committed mutation and every touch, on the
    /// runtime's affinity context. Dropping the returned [`Subscription`]
    /// unregisters the watcher.
    fn watch(&self, rt: &Runtime, f: impl Fn() + Send + Sync + 'static) -> Subscription;

    /// The expected value recorded for this cell, if any.
    ///
    /// This channel is for assertion code only; it is never consulted when
    /// reading the live value.
    fn snapshot(&self, rt: &Runtime) -> Option<Self::Value> {
        rt.snapshots().lookup(self.id())
    }

    /// Records an expected value for this cell.
    ///
    /// Does not change the live value and fires no change notification.
    #[track_caller]
    fn record_snapshot(&self, rt: &Runtime, value: Self::Value) {
        rt.snapshots().record(self.id(), value);
    }
}

/// Write access to an observable cell.
pub trait WriteCell: ReadCell {
    /// Calls `f` with exclusive access to the value and commits the result.
    ///
    /// The mutation is atomic with respect to concurrent reads: readers see
    /// the value as it was before the call until the commit point, never a
    /// partially applied mutation. Mutators of the same cell are serialized.
    /// No lock is held while `f` runs, so `f` may read this cell (observing
    /// the pre-mutation value) or other cells.
    ///
    /// A change notification fires after the commit.
    fn with_lock<R>(&self, rt: &Runtime, f: impl FnOnce(&mut Self::Value) -> R) -> R;

    /// Fires a change notification without changing the value.
    fn touch(&self, rt: &Runtime);

    /// Sets the value.
    fn set(&self, rt: &Runtime, value: Self::Value) {
        self.with_lock(rt, |v| *v = value);
    }

    /// Sets the value, returning the previous one.
    fn replace(&self, rt: &Runtime, value: Self::Value) -> Self::Value {
        self.with_lock(rt, |v| std::mem::replace(v, value))
    }

    /// Reloads the value from the external source.
    ///
    /// A no-op for cells without one. Failures are both recorded in the
    /// load-error field and returned.
    fn load(&self, rt: &Runtime) -> Result<(), PersistError> {
        let _ = rt;
        Ok(())
    }

    /// Persists the current value to the external source, synchronously.
    ///
    /// A no-op for cells without one. Failures are both recorded in the
    /// save-error field and returned.
    fn save(&self, rt: &Runtime) -> Result<(), PersistError> {
        let _ = rt;
        Ok(())
    }
}
