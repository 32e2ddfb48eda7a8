use std::{
    any::Any,
    mem::take,
    sync::{Arc, Weak},
};

/// A cancellable connection to something that outlives the caller.
///
/// Cancellation runs exactly once, when the subscription is dropped.
#[derive(Default)]
#[must_use]
pub struct Subscription(RawSubscription);

impl Subscription {
    pub fn empty() -> Self {
        Subscription(RawSubscription::Empty)
    }
    pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
        Subscription(RawSubscription::Fn(Box::new(f)))
    }
    pub fn from_arc(arc: Arc<dyn Any + Send + Sync>) -> Self {
        Subscription(RawSubscription::Arc(arc))
    }
    pub fn from_arc_fn<T: Send + Sync + 'static>(
        this: Arc<T>,
        unsubscribe: impl Fn(Arc<T>) + Copy + Send + 'static,
    ) -> Self {
        Subscription(RawSubscription::ArcFn {
            this,
            unsubscribe: Box::new(move |this| {
                if let Ok(this) = this.downcast() {
                    unsubscribe(this)
                }
            }),
        })
    }
    pub fn from_weak_fn<T: Send + Sync + 'static>(
        this: Weak<T>,
        unsubscribe: impl Fn(Arc<T>) + Copy + Send + 'static,
    ) -> Self {
        Subscription(RawSubscription::WeakFn {
            this,
            unsubscribe: Box::new(move |this| {
                if let Some(this) = this.upgrade() {
                    if let Ok(this) = this.downcast() {
                        unsubscribe(this)
                    }
                }
            }),
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        match take(&mut self.0) {
            RawSubscription::Empty => {}
            RawSubscription::Fn(f) => f(),
            RawSubscription::Arc(_) => {}
            RawSubscription::ArcFn { this, unsubscribe } => unsubscribe(this),
            RawSubscription::WeakFn { this, unsubscribe } => unsubscribe(this),
        }
    }
}

#[derive(Default)]
enum RawSubscription {
    #[default]
    Empty,
    Fn(Box<dyn FnOnce() + Send>),
    Arc(#[allow(unused)] Arc<dyn Any + Send + Sync>),
    ArcFn {
        this: Arc<dyn Any + Send + Sync>,
        unsubscribe: Box<dyn Fn(Arc<dyn Any + Send + Sync>) + Send>,
    },
    WeakFn {
        this: Weak<dyn Any + Send + Sync>,
        unsubscribe: Box<dyn Fn(Weak<dyn Any + Send + Sync>) + Send>,
    },
}

#[cfg(test)]
mod tests;
