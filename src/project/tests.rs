use assert_call::{call, CallRecorder};
use rstest::rstest;

use crate::{core::Runtime, lens, CellExt, Lens, ReadCell, State, Unwrapped, WriteCell};

#[derive(Clone, Debug, PartialEq)]
struct Profile {
    name: String,
    age: u32,
}

fn profile() -> Profile {
    Profile {
        name: "ada".to_owned(),
        age: 36,
    }
}

#[test]
fn projection_round_trip_touches_only_the_target_field() {
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let name = base.clone().project(lens!(Profile, name));

    name.set(&rt, "grace".to_owned());
    assert_eq!(name.get(&rt), "grace");

    let parent = base.get(&rt);
    assert_eq!(parent.name, "grace");
    assert_eq!(parent.age, 36);
}

#[test]
fn projection_reads_reflect_base_mutations() {
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let age = base.clone().project(lens!(Profile, age));

    base.with_lock(&rt, |p| p.age += 1);
    assert_eq!(age.get(&rt), 37);
}

#[test]
fn projection_shares_storage_identity_with_base() {
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let name = base.clone().project(lens!(Profile, name));
    assert_eq!(name.id(), base.id());
    let _ = rt;
}

#[test]
fn projection_equality_requires_the_same_lens() {
    let shared_lens: Lens<Profile, String> = lens!(Profile, name);
    let base = State::new(profile());
    let a = base.clone().project(shared_lens.clone());
    let b = base.clone().project(shared_lens);
    let c = base.clone().project(lens!(Profile, name));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn projection_watch_sees_base_changes() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let name = base.clone().project(lens!(Profile, name));
    let _w = name.watch(&rt, || call!("changed"));

    base.with_lock(&rt, |p| p.age += 1);
    cr.verify("changed");
}

#[test]
fn projection_snapshot_synthesizes_compound_from_live_value() {
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let name = base.clone().project(lens!(Profile, name));

    name.record_snapshot(&rt, "grace".to_owned());
    assert_eq!(name.snapshot(&rt), Some("grace".to_owned()));
    assert_eq!(
        base.snapshot(&rt),
        Some(Profile {
            name: "grace".to_owned(),
            age: 36,
        })
    );
    // The live value is untouched.
    assert_eq!(base.get(&rt), profile());
}

#[test]
fn projection_snapshot_rewrites_existing_compound() {
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let name = base.clone().project(lens!(Profile, name));
    let age = base.clone().project(lens!(Profile, age));

    base.record_snapshot(
        &rt,
        Profile {
            name: "lin".to_owned(),
            age: 99,
        },
    );
    name.record_snapshot(&rt, "grace".to_owned());

    assert_eq!(age.snapshot(&rt), Some(99));
    assert_eq!(name.snapshot(&rt), Some("grace".to_owned()));
}

#[rstest]
#[case(Some(7), 7)]
#[case(None, 42)]
fn unwrap_seeds_from_base_or_fallback(#[case] seed: Option<i32>, #[case] expected: i32) {
    let rt = Runtime::new_inline();
    let base = State::new(seed);
    let view = Unwrapped::new_or(&rt, base, 42);
    assert_eq!(view.get(&rt), expected);
}

#[test]
fn unwrap_constructor_fails_on_absent_base() {
    let rt = Runtime::new_inline();
    assert!(State::new(None::<i32>).unwrapped(&rt).is_none());
    assert!(State::new(Some(1)).unwrapped(&rt).is_some());
}

#[test]
fn unwrap_bridges_transient_gaps_with_last_present_value() {
    let rt = Runtime::new_inline();
    let base = State::new(Some(1));
    let view = base.clone().unwrapped(&rt).unwrap();

    base.set(&rt, None);
    assert_eq!(view.get(&rt), 1);

    base.set(&rt, Some(2));
    assert_eq!(view.get(&rt), 2);

    base.set(&rt, None);
    assert_eq!(view.get(&rt), 2);
}

#[test]
fn unwrap_write_mutates_present_base_in_place() {
    let rt = Runtime::new_inline();
    let base = State::new(Some(5));
    let view = base.clone().unwrapped(&rt).unwrap();

    view.with_lock(&rt, |v| *v += 1);
    assert_eq!(base.get(&rt), Some(6));
    assert_eq!(view.get(&rt), 6);
}

#[test]
fn unwrap_write_on_absent_base_lands_on_the_cache() {
    let rt = Runtime::new_inline();
    let base = State::new(Some(5));
    let view = base.clone().unwrapped(&rt).unwrap();

    base.set(&rt, None);
    view.with_lock(&rt, |v| *v += 10);

    // The base's optional is not forced into existence.
    assert_eq!(base.get(&rt), None);
    assert_eq!(view.get(&rt), 15);
}

#[test]
fn unwrap_clones_share_the_cache() {
    let rt = Runtime::new_inline();
    let base = State::new(Some(1));
    let a = base.clone().unwrapped(&rt).unwrap();
    let b = a.clone();

    base.set(&rt, None);
    a.with_lock(&rt, |v| *v = 9);
    assert_eq!(b.get(&rt), 9);
    assert_eq!(a, b);
}

#[test]
fn cached_pins_until_reset() {
    let rt = Runtime::new_inline();
    let base = State::new(1);
    let view = base.clone().cached(&rt);
    assert_eq!(view.cached(), 1);

    base.set(&rt, 2);
    assert_eq!(view.cached(), 1);
    assert_eq!(view.get(&rt), 2);

    view.reset(&rt);
    assert_eq!(view.cached(), 2);
}

#[test]
fn writing_through_cached_refreshes_the_slot() {
    let rt = Runtime::new_inline();
    let base = State::new(1);
    let view = base.clone().cached(&rt);

    view.with_lock(&rt, |v| *v = 3);
    assert_eq!(view.cached(), 3);
    assert_eq!(base.get(&rt), 3);
}

#[test]
fn cached_clones_share_the_slot() {
    let rt = Runtime::new_inline();
    let base = State::new(1);
    let a = base.clone().cached(&rt);
    let b = a.clone();

    base.set(&rt, 2);
    a.reset(&rt);
    assert_eq!(b.cached(), 2);
    assert_eq!(a, b);
}

#[test]
fn adapters_compose() {
    let rt = Runtime::new_inline();
    let base = State::new(profile());
    let age = base.clone().project(lens!(Profile, age)).cached(&rt);

    base.with_lock(&rt, |p| p.age = 50);
    assert_eq!(age.cached(), 36);
    assert_eq!(age.get(&rt), 50);

    age.record_snapshot(&rt, 60);
    assert_eq!(base.snapshot(&rt).map(|p| p.age), Some(60));
}
