use std::sync::Arc;

use derive_ex::derive_ex;

use crate::{
    cell::{CellId, ReadCell, WriteCell},
    core::Runtime,
    error::PersistError,
    subscription::Subscription,
};

/// An access path into a value: a getter plus the matching in-place setter.
///
/// Lenses compare by accessor identity, so two projections are equal only
/// when built from the same `Lens` value (or clones of it). Build one with
/// [`lens!`](crate::lens) for plain field paths.
#[derive_ex(Clone, bound())]
pub struct Lens<T: ?Sized, U: ?Sized> {
    read: Arc<dyn Fn(&T) -> &U + Send + Sync>,
    write: Arc<dyn Fn(&mut T) -> &mut U + Send + Sync>,
}

impl<T: ?Sized, U: ?Sized> Lens<T, U> {
    pub fn new(
        read: impl Fn(&T) -> &U + Send + Sync + 'static,
        write: impl Fn(&mut T) -> &mut U + Send + Sync + 'static,
    ) -> Self {
        Lens {
            read: Arc::new(read),
            write: Arc::new(write),
        }
    }

    pub fn get<'a>(&self, value: &'a T) -> &'a U {
        (self.read)(value)
    }

    pub fn get_mut<'a>(&self, value: &'a mut T) -> &'a mut U {
        (self.write)(value)
    }

    /// Whether two lenses are the same access path.
    pub fn same(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.read, &b.read) && Arc::ptr_eq(&a.write, &b.write)
    }
}

/// Builds a [`Lens`] from a field path.
///
/// ```
/// use sharemut::{lens, Lens};
///
/// struct Window {
///     size: (u32, u32),
/// }
/// let width: Lens<Window, u32> = lens!(Window, size.0);
/// ```
#[macro_export]
macro_rules! lens {
    ($T:ty, $($path:tt)+) => {
        $crate::Lens::<$T, _>::new(
            |value: &$T| &value.$($path)+,
            |value: &mut $T| &mut value.$($path)+,
        )
    };
}

/// A view of one component of another cell's value.
///
/// Reads project the base's value through the lens; writes rewrite only the
/// targeted component, inside the base's own scoped mutation, so the
/// compound write is atomic from the base's perspective. No separate
/// storage.
pub struct Mapped<C: ReadCell, U: 'static> {
    base: C,
    lens: Lens<C::Value, U>,
}

impl<C: ReadCell, U: 'static> Mapped<C, U> {
    pub fn new(base: C, lens: Lens<C::Value, U>) -> Self {
        Mapped { base, lens }
    }

    pub fn base(&self) -> &C {
        &self.base
    }
}

impl<C: ReadCell, U: Clone + Send + 'static> ReadCell for Mapped<C, U> {
    type Value = U;

    fn id(&self) -> CellId {
        self.base.id()
    }

    fn with_value<R>(&self, rt: &Runtime, f: impl FnOnce(&U) -> R) -> R {
        self.base.with_value(rt, |value| f(self.lens.get(value)))
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
        self.base
            .snapshot(rt)
            .map(|compound| self.lens.get(&compound).clone())
    }

    #[track_caller]
    fn record_snapshot(&self, rt: &Runtime, value: U) {
        // A missing base snapshot is synthesized from the live value so the
        // component write is not dropped.
        let mut compound = match self.base.snapshot(rt) {
            Some(compound) => compound,
            None => self.base.get(rt),
        };
        *self.lens.get_mut(&mut compound) = value;
        self.base.record_snapshot(rt, compound);
    }
}

impl<C: WriteCell, U: Clone + Send + 'static> WriteCell for Mapped<C, U> {
    fn with_lock<R>(&self, rt: &Runtime, f: impl FnOnce(&mut U) -> R) -> R {
        self.base
            .with_lock(rt, |value| f(self.lens.get_mut(value)))
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

impl<C: ReadCell + Clone, U: 'static> Clone for Mapped<C, U> {
    fn clone(&self) -> Self {
        Mapped {
            base: self.base.clone(),
            lens: self.lens.clone(),
        }
    }
}

impl<C: ReadCell + PartialEq, U: 'static> PartialEq for Mapped<C, U> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && Lens::same(&self.lens, &other.lens)
    }
}

impl<C: ReadCell + std::fmt::Debug, U: 'static> std::fmt::Debug for Mapped<C, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Mapped").field(&self.base).finish()
    }
}

impl<C: ReadCell + Clone + Send + Sync + 'static, U: Clone + Send + 'static> Mapped<C, U> {
    /// A stream yielding the projected value and then one value per change
    /// notification of the base.
    pub fn to_stream(&self, rt: &Runtime) -> crate::stream::Changes<U> {
        crate::stream::Changes::new(self, rt)
    }
}
