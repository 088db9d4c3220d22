// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end join resolution behavior:
//! - registration/arrival satisfaction symmetry
//! - exactly-once firing and explicit consumption
//! - FIFO tie-breaks (declaration, registration, arrival order)
//! - idempotent cancellation

#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use latch_core::{
    CorrelationTag, DependencyResolver, EntryId, RegisterOutcome, ResolverError, Trigger, WhenId,
};

fn engine(
    entries: usize,
    whens: usize,
    edges: &[(usize, usize)],
) -> DependencyResolver<&'static str> {
    let mut r = DependencyResolver::new(entries, whens).expect("valid config");
    for &(w, e) in edges {
        r.declare_dependency(WhenId(w), EntryId(e)).expect("declare");
    }
    r
}

// =============================================================================
// The canonical two-entry scenario
// =============================================================================

#[test]
fn specific_plus_any_resolves_only_when_complete() {
    let mut r = engine(2, 1, &[(0, 0), (0, 1)]);
    assert_eq!(r.dependencies_of(WhenId(0)).unwrap(), &[EntryId(0), EntryId(1)]);

    let trig = Trigger::new(WhenId(0))
        .expecting(EntryId(0), CorrelationTag(5))
        .expecting_any(EntryId(1));
    assert!(matches!(
        r.register(trig).unwrap(),
        RegisterOutcome::Pending(_)
    ));

    // Entry 1 arrives first: the specific (entry 0, tag 5) leg is missing.
    let a = r.buffer_message(EntryId(1), CorrelationTag(7), "A").unwrap();
    assert!(r
        .on_message_arrived(EntryId(1), CorrelationTag(7))
        .unwrap()
        .is_none());

    // Entry 0 completes the set.
    let b = r.buffer_message(EntryId(0), CorrelationTag(5), "B").unwrap();
    let resolved = r
        .on_message_arrived(EntryId(0), CorrelationTag(5))
        .unwrap()
        .expect("trigger should resolve");
    assert_eq!(resolved.when, WhenId(0));
    assert_eq!(r.pending_len(WhenId(0)), Ok(0));

    // Caller commits by consuming the matched messages.
    assert_eq!(r.consume_message(a), Ok("A"));
    assert_eq!(r.consume_message(b), Ok("B"));
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(5))
        .unwrap()
        .is_none());
    assert!(r
        .on_message_arrived(EntryId(1), CorrelationTag(7))
        .unwrap()
        .is_none());
}

// =============================================================================
// Registration-time satisfaction (the symmetry that prevents stalls)
// =============================================================================

#[test]
fn registration_after_arrival_is_satisfied_synchronously() {
    let mut r = engine(1, 1, &[(0, 0)]);
    r.buffer_message(EntryId(0), CorrelationTag(3), "early").unwrap();

    let trig = Trigger::new(WhenId(0)).expecting(EntryId(0), CorrelationTag(3));
    match r.register(trig).unwrap() {
        RegisterOutcome::Satisfied(t) => assert_eq!(t.when, WhenId(0)),
        RegisterOutcome::Pending(_) => unreachable!("must not be left pending"),
    }
    // Nothing was left behind in the registry.
    assert_eq!(r.pending_len(WhenId(0)), Ok(0));
    // The message is still buffered until the caller consumes it.
    assert_eq!(r.buffered_len(EntryId(0)), Ok(1));
}

// =============================================================================
// Exactly-once firing
// =============================================================================

#[test]
fn each_trigger_fires_at_most_once() {
    let mut r = engine(1, 1, &[(0, 0)]);
    let make = || Trigger::new(WhenId(0)).expecting_any(EntryId(0));
    assert!(matches!(r.register(make()).unwrap(), RegisterOutcome::Pending(_)));
    assert!(matches!(r.register(make()).unwrap(), RegisterOutcome::Pending(_)));

    r.buffer_message(EntryId(0), CorrelationTag(1), "m").unwrap();

    // One resolution per call; both pending triggers see the same message
    // (first satisfied wins), but no trigger is ever returned twice.
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(1))
        .unwrap()
        .is_some());
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(1))
        .unwrap()
        .is_some());
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(1))
        .unwrap()
        .is_none());
}

#[test]
fn no_cascading_resolution_within_one_call() {
    let mut r = engine(1, 1, &[(0, 0)]);
    for _ in 0..2 {
        let t = Trigger::new(WhenId(0)).expecting_any(EntryId(0));
        assert!(matches!(r.register(t).unwrap(), RegisterOutcome::Pending(_)));
    }
    r.buffer_message(EntryId(0), CorrelationTag(1), "x").unwrap();
    r.buffer_message(EntryId(0), CorrelationTag(2), "y").unwrap();

    // A single arrival event yields a single trigger even though both are
    // now satisfiable; the caller re-invokes to discover the second.
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(2))
        .unwrap()
        .is_some());
    assert_eq!(r.pending_len(WhenId(0)), Ok(1));
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(2))
        .unwrap()
        .is_some());
    assert_eq!(r.pending_len(WhenId(0)), Ok(0));
}

// =============================================================================
// FIFO tie-breaks
// =============================================================================

#[test]
fn any_match_claims_earliest_arrival_first() {
    let mut r = engine(1, 1, &[(0, 0)]);
    let h1 = r.buffer_message(EntryId(0), CorrelationTag(1), "t1").unwrap();
    let h2 = r.buffer_message(EntryId(0), CorrelationTag(2), "t2").unwrap();
    let h3 = r.buffer_message(EntryId(0), CorrelationTag(3), "t3").unwrap();

    assert_eq!(r.first_message(EntryId(0)), Ok(Some(h1)));
    assert_eq!(r.consume_message(h1), Ok("t1"));
    assert_eq!(r.first_message(EntryId(0)), Ok(Some(h2)));
    assert_eq!(r.consume_message(h2), Ok("t2"));
    assert_eq!(r.first_message(EntryId(0)), Ok(Some(h3)));
}

#[test]
fn earliest_registered_trigger_wins() {
    let mut r = engine(1, 1, &[(0, 0)]);
    let first = Trigger::new(WhenId(0)).expecting_any(EntryId(0));
    let second = Trigger::new(WhenId(0))
        .expecting_any(EntryId(0))
        .expecting(EntryId(0), CorrelationTag(9));
    let RegisterOutcome::Pending(first_handle) = r.register(first).unwrap() else {
        unreachable!()
    };
    assert!(matches!(r.register(second).unwrap(), RegisterOutcome::Pending(_)));

    r.buffer_message(EntryId(0), CorrelationTag(9), "m").unwrap();
    let resolved = r
        .on_message_arrived(EntryId(0), CorrelationTag(9))
        .unwrap()
        .expect("one trigger resolves");
    // Both are satisfied; registration order decides.
    assert!(resolved.specific.is_empty());
    assert!(r.deregister(first_handle).is_none());
}

#[test]
fn arrival_scan_follows_declaration_order() {
    // Whens 1 and 0 both depend on entry 0; when 1 was declared first.
    let mut r = engine(1, 2, &[(1, 0), (0, 0)]);
    let t0 = Trigger::new(WhenId(0)).expecting_any(EntryId(0));
    let t1 = Trigger::new(WhenId(1)).expecting_any(EntryId(0));
    assert!(matches!(r.register(t0).unwrap(), RegisterOutcome::Pending(_)));
    assert!(matches!(r.register(t1).unwrap(), RegisterOutcome::Pending(_)));

    r.buffer_message(EntryId(0), CorrelationTag(0), "m").unwrap();
    let resolved = r
        .on_message_arrived(EntryId(0), CorrelationTag(0))
        .unwrap()
        .expect("one trigger resolves");
    assert_eq!(resolved.when, WhenId(1));
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn deregistration_is_idempotent_and_releases_nothing_else() {
    let mut r = engine(2, 1, &[(0, 0), (0, 1)]);
    let trig = Trigger::new(WhenId(0)).expecting(EntryId(0), CorrelationTag(5));
    let RegisterOutcome::Pending(handle) = r.register(trig).unwrap() else {
        unreachable!()
    };
    r.buffer_message(EntryId(1), CorrelationTag(1), "other").unwrap();

    assert!(r.deregister(handle).is_some());
    assert!(r.deregister(handle).is_none());
    assert_eq!(r.pending_len(WhenId(0)), Ok(0));
    // Messages the trigger never consumed stay buffered for others.
    assert_eq!(r.buffered_len(EntryId(1)), Ok(1));

    // Arrival for the cancelled trigger's entry resolves nothing.
    r.buffer_message(EntryId(0), CorrelationTag(5), "late").unwrap();
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(5))
        .unwrap()
        .is_none());
}

#[test]
fn resolved_trigger_handle_goes_stale() {
    let mut r = engine(1, 1, &[(0, 0)]);
    let trig = Trigger::new(WhenId(0)).expecting_any(EntryId(0));
    let RegisterOutcome::Pending(handle) = r.register(trig).unwrap() else {
        unreachable!()
    };
    r.buffer_message(EntryId(0), CorrelationTag(1), "m").unwrap();
    assert!(r
        .on_message_arrived(EntryId(0), CorrelationTag(1))
        .unwrap()
        .is_some());
    // The resolver already deregistered it; cancellation is a no-op.
    assert!(r.deregister(handle).is_none());
}

// =============================================================================
// Error surface
// =============================================================================

#[test]
fn stale_message_handles_are_detected() {
    let mut r = engine(1, 1, &[(0, 0)]);
    let h = r.buffer_message(EntryId(0), CorrelationTag(1), "m").unwrap();
    assert_eq!(r.consume_message(h), Ok("m"));
    assert_eq!(r.consume_message(h), Err(ResolverError::StaleHandle));
    assert!(r.payload(h).is_none());
}
