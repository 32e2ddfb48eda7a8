mod cached;
mod map;
mod unwrap;

pub use cached::Cached;
pub use map::{Lens, Mapped};
pub use unwrap::Unwrapped;

use crate::{cell::ReadCell, core::Runtime};

/// Adapters deriving a reshaped view from any cell.
///
/// The adapters share the base's storage; none of them copies the value into
/// a second cell, and none introduces error state of its own.
pub trait CellExt: ReadCell + Sized {
    /// A view of one component of the value.
    fn project<U: Clone + Send + 'static>(self, lens: Lens<Self::Value, U>) -> Mapped<Self, U> {
        Mapped::new(self, lens)
    }

    /// A non-optional view over an optional-valued cell.
    ///
    /// Returns `None` if the base is currently absent; the view is seeded
    /// from the present value. See [`Unwrapped::new_or`] for an explicit
    /// fallback.
    fn unwrapped<U>(self, rt: &Runtime) -> Option<Unwrapped<Self, U>>
    where
        Self: ReadCell<Value = Option<U>>,
        U: Clone + Send + 'static,
    {
        Unwrapped::new(rt, self)
    }

    /// A view with an explicitly pinned copy of the value.
    fn cached(self, rt: &Runtime) -> Cached<Self> {
        Cached::new(rt, self)
    }
}

impl<C: ReadCell + Sized> CellExt for C {}

#[cfg(test)]
mod tests;
