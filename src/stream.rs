use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver},
    Stream,
};

use crate::{cell::ReadCell, core::Runtime, subscription::Subscription};

/// A stream of value snapshots from a cell.
///
/// Yields the value at creation, then one snapshot per change notification.
/// Snapshots are taken on the affinity context when the notification is
/// delivered, so rapid mutations may be observed coalesced.
pub struct Changes<T> {
    receiver: UnboundedReceiver<T>,
    _watch: Subscription,
}

impl<T> Changes<T> {
    pub(crate) fn new<C>(cell: &C, rt: &Runtime) -> Self
    where
        C: ReadCell<Value = T> + Clone + Send + Sync + 'static,
        T: Clone + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let _ = sender.unbounded_send(cell.get(rt));
        let source = cell.clone();
        let watch_rt = rt.clone();
        let watch = cell.watch(rt, move || {
            let _ = sender.unbounded_send(source.get(&watch_rt));
        });
        Changes {
            receiver,
            _watch: watch,
        }
    }
}

impl<T> Stream for Changes<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
