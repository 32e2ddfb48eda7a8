use std::sync::Arc;

use derive_ex::derive_ex;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    cell::{CellId, ReadCell, WriteCell},
    core::Runtime,
    stream::Changes,
    subscription::Subscription,
    watch::Watchers,
};

#[cfg(test)]
mod tests;

/// Similar to `Arc<Mutex<T>>`, but with added functionality to observe
/// changes.
///
/// An in-memory-only cell: no external source, so [`WriteCell::load`] and
/// [`WriteCell::save`] always succeed and the error fields are always
/// absent. Clones alias the same storage; `==` compares storage identity,
/// never values.
#[derive_ex(Clone, bound())]
pub struct State<T: 'static>(Arc<StateNode<T>>);

struct StateNode<T> {
    id: CellId,
    value: Mutex<T>,
    gate: Mutex<()>,
    watchers: Watchers,
}

impl<T: Send + 'static> State<T> {
    /// Create a new `State` with the given initial value.
    pub fn new(value: T) -> Self {
        State(Arc::new(StateNode {
            id: CellId::next(),
            value: Mutex::new(value),
            gate: Mutex::new(()),
            watchers: Watchers::new(),
        }))
    }
}

impl<T: Clone + Send + 'static> State<T> {
    /// Sets the value and notifies watchers only if it changed.
    pub fn set_dedup(&self, rt: &Runtime, value: T)
    where
        T: PartialEq,
    {
        rt.observer().will_mutate(self.0.id);
        let changed = {
            let _gate = self.0.gate.lock();
            let mut current = self.0.value.lock();
            if *current != value {
                *current = value;
                true
            } else {
                false
            }
        };
        rt.observer().did_mutate(self.0.id);
        if changed {
            self.0.watchers.notify(rt);
        }
    }

    /// A stream yielding the current value and then one value per change
    /// notification.
    pub fn to_stream(&self, rt: &Runtime) -> Changes<T> {
        Changes::new(self, rt)
    }
}

impl<T: Clone + Send + 'static> ReadCell for State<T> {
    type Value = T;

    fn id(&self) -> CellId {
        self.0.id
    }

    fn with_value<R>(&self, rt: &Runtime, f: impl FnOnce(&T) -> R) -> R {
        rt.observer().did_access(self.0.id);
        f(&*self.0.value.lock())
    }

    fn watch(&self, rt: &Runtime, f: impl Fn() + Send + Sync + 'static) -> Subscription {
        let _ = rt;
        let key = self.0.watchers.insert(Arc::new(f));
        Subscription::from_arc_fn(self.0.clone(), move |node| node.watchers.remove(key))
    }
}

impl<T: Clone + Send + 'static> WriteCell for State<T> {
    fn with_lock<R>(&self, rt: &Runtime, f: impl FnOnce(&mut T) -> R) -> R {
        rt.observer().will_mutate(self.0.id);
        let gate = self.0.gate.lock();
        let mut working = self.0.value.lock().clone();
        let out = f(&mut working);
        *self.0.value.lock() = working;
        drop(gate);
        rt.observer().did_mutate(self.0.id);
        self.0.watchers.notify(rt);
        out
    }

    fn touch(&self, rt: &Runtime) {
        self.0.watchers.notify(rt);
    }
}

impl<T> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl<T> Eq for State<T> {}

impl<T: Default + Send + 'static> Default for State<T> {
    fn default() -> Self {
        State::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for State<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.value.try_lock() {
            Some(value) => std::fmt::Debug::fmt(&*value, f),
            None => write!(f, "<locked>"),
        }
    }
}

impl<T> Serialize for State<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self.0.value.try_lock() {
            Some(value) => T::serialize(&*value, serializer),
            None => Err(serde::ser::Error::custom("locked")),
        }
    }
}

impl<'de, T> Deserialize<'de> for State<T>
where
    T: Deserialize<'de> + Send + 'static,
{
    fn deserialize<D>(deserializer: D) -> Result<State<T>, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(State::new)
    }
}
