//! Integration tests for the push-stream runtime
//!
//! These tests exercise subjects, operators and subscriptions together.

use rxpath_stream::{
    operators, BehaviorSubject, CollectingObserver, Notification, Observable, StreamError, Subject,
    Subscriber,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_fan_out_preserves_push_order() {
    init_tracing();
    let subject = Subject::new();
    let doubled = CollectingObserver::new();
    let odd = CollectingObserver::new();

    subject.as_observable().map(|v: i32| v * 2).subscribe(doubled.clone());
    subject
        .as_observable()
        .filter(|v: &i32| v % 2 == 1)
        .subscribe(odd.clone());

    for v in 1..=4 {
        subject.next(v);
    }

    assert_eq!(doubled.values(), vec![2, 4, 6, 8]);
    assert_eq!(odd.values(), vec![1, 3]);
}

#[test]
fn test_unsubscribe_through_operator_chain() {
    init_tracing();
    let subject = Subject::new();
    let observer = CollectingObserver::new();

    let sub = subject
        .as_observable()
        .map(|v: i32| v + 1)
        .distinct_until_changed()
        .subscribe(observer.clone());
    assert_eq!(subject.observer_count(), 1);

    subject.next(1);
    sub.unsubscribe();
    subject.next(2);

    assert_eq!(observer.values(), vec![2]);
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn test_behavior_subject_replay_then_updates() {
    init_tracing();
    let state = BehaviorSubject::new("a".to_string());
    state.next("b".to_string());

    let late = CollectingObserver::new();
    state.subscribe(late.clone());
    state.next("c".to_string());

    assert_eq!(late.values(), vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_terminal_propagates_to_derived_streams() {
    init_tracing();
    let subject = Subject::<i32>::new();
    let observer = CollectingObserver::new();
    subject
        .as_observable()
        .scan(0, |acc, v| acc + v)
        .subscribe(observer.clone());

    subject.next(1);
    subject.next(2);
    subject.error(StreamError::new("stop"));

    assert_eq!(
        observer.events(),
        vec![
            Notification::Next(1),
            Notification::Next(3),
            Notification::Error(StreamError::new("stop")),
        ]
    );
}

#[test]
fn test_take_releases_upstream_registration() {
    init_tracing();
    let subject = Subject::new();
    let observer = CollectingObserver::new();

    subject.as_observable().take(1).subscribe(observer.clone());
    assert_eq!(subject.observer_count(), 1);

    subject.next(10);
    subject.next(20);

    assert_eq!(observer.values(), vec![10]);
    assert!(observer.is_completed());
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn test_pipe_with_operator_builders() {
    init_tracing();
    let out = CollectingObserver::new();
    rxpath_stream::of(vec![1, 2, 3, 4])
        .pipe_all([
            operators::scan(0, |acc: i32, v: i32| acc + v),
            operators::filter(|v: &i32| *v > 1),
            operators::take(2),
        ])
        .subscribe(out.clone());

    assert_eq!(out.values(), vec![3, 6]);
    assert!(out.is_completed());
}

#[test]
fn test_custom_producer_teardown() {
    init_tracing();
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    let source = Observable::new(move |subscriber: Subscriber<i32>| {
        subscriber.next(1);
        let counter = counter.clone();
        subscriber.add(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    });

    let observer = CollectingObserver::new();
    let sub = source.subscribe(observer.clone());
    assert_eq!(released.load(Ordering::SeqCst), 0);

    sub.unsubscribe();
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(observer.values(), vec![1]);
}
