use assert_call::{call, CallRecorder};

use crate::{
    cell::CellId,
    core::{AccessObserver, InlineScheduler, Runtime},
    ReadCell, State, WriteCell,
};

#[test]
fn new() {
    let rt = Runtime::new_inline();
    let s = State::new(10);
    assert_eq!(s.get(&rt), 10);
}

#[test]
fn set() {
    let rt = Runtime::new_inline();
    let s = State::new(10);
    assert_eq!(s.get(&rt), 10);

    s.set(&rt, 20);
    assert_eq!(s.get(&rt), 20);

    s.set(&rt, 30);
    assert_eq!(s.get(&rt), 30);
}

#[test]
fn with_lock_composes_left_to_right() {
    let rt = Runtime::new_inline();
    let s = State::new(String::new());
    s.with_lock(&rt, |v| v.push('a'));
    s.with_lock(&rt, |v| v.push('b'));
    s.with_lock(&rt, |v| v.push('c'));
    assert_eq!(s.get(&rt), "abc");
}

#[test]
fn with_lock_returns_closure_result() {
    let rt = Runtime::new_inline();
    let s = State::new(2);
    let doubled = s.with_lock(&rt, |v| {
        *v *= 2;
        *v
    });
    assert_eq!(doubled, 4);
}

#[test]
fn replace_returns_previous_value() {
    let rt = Runtime::new_inline();
    let s = State::new(1);
    assert_eq!(s.replace(&rt, 2), 1);
    assert_eq!(s.get(&rt), 2);
}

#[test]
fn watch_fires_on_mutation() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new_inline();
    let s = State::new(0);
    let _w = s.watch(&rt, || call!("changed"));
    cr.verify(());
    s.with_lock(&rt, |v| *v += 1);
    cr.verify("changed");
}

#[test]
fn touch_fires_exactly_one_extra_notification() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new_inline();
    let s = State::new(0);
    let s0 = s.clone();
    let rt0 = rt.clone();
    let _w = s.watch(&rt, move || call!("{}", s0.get(&rt0)));

    s.with_lock(&rt, |v| *v += 1);
    cr.verify("1");

    s.touch(&rt);
    cr.verify("1");
    assert_eq!(s.get(&rt), 1);
}

#[test]
fn dropped_watcher_stops_firing() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new_inline();
    let s = State::new(0);
    let w = s.watch(&rt, || call!("changed"));
    s.set(&rt, 1);
    cr.verify("changed");
    drop(w);
    s.set(&rt, 2);
    cr.verify(());
}

#[test]
fn nested_read_during_mutation_sees_previous_value() {
    let rt = Runtime::new_inline();
    let s = State::new(1);
    let s0 = s.clone();
    let rt0 = rt.clone();
    s.with_lock(&rt, |v| {
        *v = 2;
        assert_eq!(s0.get(&rt0), 1);
    });
    assert_eq!(s.get(&rt), 2);
}

#[test]
fn set_dedup_notifies_only_on_change() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new_inline();
    let s = State::new(10);
    let _w = s.watch(&rt, || call!("changed"));

    s.set_dedup(&rt, 10);
    cr.verify(());

    s.set_dedup(&rt, 20);
    cr.verify("changed");
}

#[test]
fn clones_alias_one_storage() {
    let rt = Runtime::new_inline();
    let a = State::new(0);
    let b = a.clone();
    a.set(&rt, 7);
    assert_eq!(b.get(&rt), 7);
    assert_eq!(a, b);
    assert_eq!(a.id(), b.id());
}

#[test]
fn equality_is_identity_not_value() {
    let a = State::new(1);
    let b = State::new(1);
    assert_ne!(a, b);
}

#[test]
fn load_and_save_are_successful_noops() {
    let rt = Runtime::new_inline();
    let s = State::new(0);
    assert!(s.load(&rt).is_ok());
    assert!(s.save(&rt).is_ok());
    assert!(s.load_error().is_none());
    assert!(s.save_error().is_none());
}

#[test]
fn recording_snapshot_leaves_live_value_untouched() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new_inline();
    let s = State::new(1);
    let _w = s.watch(&rt, || call!("changed"));

    s.record_snapshot(&rt, 9);
    assert_eq!(s.get(&rt), 1);
    assert_eq!(s.snapshot(&rt), Some(9));
    cr.verify(());
}

struct Hooks;
impl AccessObserver for Hooks {
    fn did_access(&self, _cell: CellId) {
        call!("access");
    }
    fn will_mutate(&self, _cell: CellId) {
        call!("will");
    }
    fn did_mutate(&self, _cell: CellId) {
        call!("did");
    }
}

#[test]
fn observer_hooks_surround_reads_and_writes() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::builder()
        .scheduler(InlineScheduler)
        .observer(Hooks)
        .build();
    let s = State::new(0);

    s.get(&rt);
    cr.verify("access");

    s.with_lock(&rt, |v| *v = 1);
    cr.verify(["will", "did"]);
}

#[test]
fn to_stream_yields_current_value_then_changes() {
    use futures::{executor::block_on, StreamExt};
    let rt = Runtime::new_inline();
    let s = State::new(1);
    let mut stream = s.to_stream(&rt);
    assert_eq!(block_on(stream.next()), Some(1));
    s.set(&rt, 2);
    assert_eq!(block_on(stream.next()), Some(2));
}

#[test]
fn debug_formats_inner_value() {
    let s = State::new(5);
    assert_eq!(format!("{s:?}"), "5");
}

#[test]
fn serde_round_trip() {
    let rt = Runtime::new_inline();
    let s = State::new(vec![1, 2, 3]);
    let json = serde_json::to_string(&s).unwrap();
    assert_eq!(json, "[1,2,3]");
    let restored: State<Vec<i32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.get(&rt), vec![1, 2, 3]);
}
