use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc, Weak,
};

use assert_call::{call, CallRecorder};

use super::*;

fn on_unsubscribe(arc: Arc<AtomicI32>) {
    call!("{}", arc.load(Ordering::Relaxed));
}

#[test]
fn from_fn_calls_on_drop() {
    let mut cr = CallRecorder::new();
    {
        let _s = Subscription::from_fn(|| call!("drop"));
    }
    cr.verify("drop");
}

#[test]
fn empty_does_nothing() {
    let mut cr = CallRecorder::new();
    {
        let _s = Subscription::empty();
    }
    cr.verify(());
}

#[test]
fn from_arc_keeps_the_value_alive() {
    let arc: Arc<AtomicI32> = Arc::new(AtomicI32::new(0));
    let weak = Arc::downgrade(&arc);
    let s = Subscription::from_arc(arc);
    assert!(weak.upgrade().is_some());
    drop(s);
    assert!(weak.upgrade().is_none());
}

#[test]
fn from_arc_fn_calls_on_drop() {
    let mut cr = CallRecorder::new();
    let arc = Arc::new(AtomicI32::new(7));
    {
        let _s = Subscription::from_arc_fn(arc.clone(), on_unsubscribe);
    }
    cr.verify("7");
}

#[test]
fn from_weak_fn_calls_when_alive() {
    let mut cr = CallRecorder::new();
    let arc = Arc::new(AtomicI32::new(9));
    let weak = Arc::downgrade(&arc);
    {
        let _s = Subscription::from_weak_fn(weak, on_unsubscribe);
    }
    cr.verify("9");
}

#[test]
fn from_weak_fn_noop_when_dead() {
    let mut cr = CallRecorder::new();
    let arc = Arc::new(AtomicI32::new(1));
    let weak: Weak<AtomicI32> = Arc::downgrade(&arc);
    drop(arc);
    {
        let _s = Subscription::from_weak_fn(weak, on_unsubscribe);
    }
    cr.verify(());
}
