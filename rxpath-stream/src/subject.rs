//! Hot multicast sources
//!
//! A [`Subject`] forwards every pushed value to the observers registered at
//! the time of the push. A [`BehaviorSubject`] additionally holds the last
//! pushed value and replays it to each new subscriber.

use crate::error::StreamError;
use crate::observable::Observable;
use crate::observer::{Notification, Observer, Subscriber};
use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone)]
enum Terminal {
    Error(StreamError),
    Complete,
}

impl<T> From<Terminal> for Notification<T> {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Error(error) => Notification::Error(error),
            Terminal::Complete => Notification::Complete,
        }
    }
}

struct Entry<T> {
    /// Sequence number of the last notification queued before registration
    joined: u64,
    subscriber: Subscriber<T>,
}

/// Delivery queue shared by every push into one subject
///
/// Notifications are numbered in push order. Only one caller drains at a
/// time, so a push made while observers run is delivered after the current
/// notification has reached every observer.
struct Delivery<T> {
    busy: bool,
    seq: u64,
    queue: VecDeque<(u64, Notification<T>)>,
    terminal: Option<Terminal>,
}

impl<T> Delivery<T> {
    /// Queue `notification`, returning true when the caller must drain
    fn enqueue(&mut self, notification: Notification<T>) -> bool {
        self.seq += 1;
        self.queue.push_back((self.seq, notification));
        !std::mem::replace(&mut self.busy, true)
    }
}

struct SubjectInner<T> {
    delivery: Mutex<Delivery<T>>,
    observers: Mutex<BTreeMap<u64, Entry<T>>>,
    next_id: AtomicU64,
}

impl<T> SubjectInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Register `subscriber`, replaying the terminal or the held value
    fn register(inner: &Arc<SubjectInner<T>>, subscriber: Subscriber<T>, held: Option<&Mutex<T>>) {
        let replay: Notification<T> = {
            let delivery = inner.delivery.lock();
            match delivery.terminal.clone() {
                Some(terminal) => terminal.into(),
                None => {
                    let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
                    inner.observers.lock().insert(
                        id,
                        Entry {
                            joined: delivery.seq,
                            subscriber: subscriber.clone(),
                        },
                    );
                    let weak: Weak<SubjectInner<T>> = Arc::downgrade(inner);
                    subscriber.add(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.observers.lock().remove(&id);
                        }
                    });
                    match held {
                        Some(held) => Notification::Next(held.lock().clone()),
                        None => return,
                    }
                }
            }
        };
        if !subscriber.is_stopped() {
            subscriber.notify(replay);
        }
    }

    fn push(&self, notification: Notification<T>) {
        let drain = {
            let mut delivery = self.delivery.lock();
            if delivery.terminal.is_some() {
                return;
            }
            delivery.terminal = match &notification {
                Notification::Next(_) => None,
                Notification::Error(error) => Some(Terminal::Error(error.clone())),
                Notification::Complete => Some(Terminal::Complete),
            };
            delivery.enqueue(notification)
        };
        if drain {
            self.drain();
        }
    }

    fn drain(&self) {
        loop {
            let (seq, notification) = {
                let mut delivery = self.delivery.lock();
                match delivery.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        delivery.busy = false;
                        return;
                    }
                }
            };
            self.deliver(seq, notification);
        }
    }

    fn deliver(&self, seq: u64, notification: Notification<T>) {
        match notification {
            Notification::Next(value) => {
                let observers: Vec<_> = self
                    .observers
                    .lock()
                    .values()
                    .filter(|entry| entry.joined < seq)
                    .map(|entry| entry.subscriber.clone())
                    .collect();
                tracing::trace!(seq, observers = observers.len(), "subject next");
                for observer in observers {
                    observer.next(value.clone());
                }
            }
            Notification::Error(error) => {
                tracing::debug!(%error, "subject errored");
                for observer in self.take_observers() {
                    observer.error(error.clone());
                }
            }
            Notification::Complete => {
                tracing::debug!("subject completed");
                for observer in self.take_observers() {
                    observer.complete();
                }
            }
        }
    }

    fn take_observers(&self) -> Vec<Subscriber<T>> {
        std::mem::take(&mut *self.observers.lock())
            .into_values()
            .map(|entry| entry.subscriber)
            .collect()
    }
}

/// A multicast event source
///
/// Clones share the same set of observers. Every observer sees the pushed
/// values in push order, including values pushed from inside an observer.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                delivery: Mutex::new(Delivery {
                    busy: false,
                    seq: 0,
                    queue: VecDeque::new(),
                    terminal: None,
                }),
                observers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl<T> Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a value to every current observer, in subscription order
    pub fn next(&self, value: T) {
        self.inner.push(Notification::Next(value));
    }

    pub fn error(&self, error: StreamError) {
        self.inner.push(Notification::Error(error));
    }

    pub fn complete(&self) {
        self.inner.push(Notification::Complete);
    }

    pub fn notify(&self, notification: Notification<T>) {
        self.inner.push(notification);
    }

    /// True after `error` or `complete`
    pub fn is_stopped(&self) -> bool {
        self.inner.delivery.lock().terminal.is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    pub fn as_observable(&self) -> Observable<T> {
        let inner = self.inner.clone();
        Observable::new(move |subscriber: Subscriber<T>| SubjectInner::register(&inner, subscriber, None))
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        self.as_observable().subscribe(observer)
    }

    pub fn ptr_eq(a: &Subject<T>, b: &Subject<T>) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T> Observer<T> for Subject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn next(&self, value: T) {
        Subject::next(self, value);
    }

    fn error(&self, error: StreamError) {
        Subject::error(self, error);
    }

    fn complete(&self) {
        Subject::complete(self);
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terminal = self.inner.delivery.lock().terminal.clone();
        let observers = self.inner.observers.lock().len();
        f.debug_struct("Subject")
            .field("observers", &observers)
            .field("terminal", &terminal)
            .finish()
    }
}

/// A subject holding a current value
///
/// The held value is always the last value pushed. Subscribing yields the
/// current value synchronously, then every later push in order.
pub struct BehaviorSubject<T> {
    subject: Subject<T>,
    value: Arc<Mutex<T>>,
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T> BehaviorSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            subject: Subject::new(),
            value: Arc::new(Mutex::new(initial)),
        }
    }

    /// Snapshot of the held value
    pub fn value(&self) -> T {
        self.value.lock().clone()
    }

    pub fn next(&self, value: T) {
        let _ = self.try_update(|_| Ok::<_, Infallible>(Some(value)));
    }

    /// Replace the held value with one computed from it, then publish it
    ///
    /// `f` runs while the subject is locked, so it must not touch this
    /// subject. Returning `Ok(None)` leaves the value alone and publishes
    /// nothing. Returns `Ok(false)` when nothing was published, including
    /// after termination.
    pub fn try_update<E, F>(&self, f: F) -> Result<bool, E>
    where
        F: FnOnce(&T) -> Result<Option<T>, E>,
    {
        let inner = &self.subject.inner;
        let drain = {
            let mut delivery = inner.delivery.lock();
            if delivery.terminal.is_some() {
                return Ok(false);
            }
            let mut held = self.value.lock();
            let Some(next) = f(&*held)? else {
                return Ok(false);
            };
            *held = next.clone();
            drop(held);
            delivery.enqueue(Notification::Next(next))
        };
        if drain {
            inner.drain();
        }
        Ok(true)
    }

    pub fn error(&self, error: StreamError) {
        self.subject.error(error);
    }

    pub fn complete(&self) {
        self.subject.complete();
    }

    pub fn is_stopped(&self) -> bool {
        self.subject.is_stopped()
    }

    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }

    pub fn as_observable(&self) -> Observable<T> {
        let inner = self.subject.inner.clone();
        let value = self.value.clone();
        Observable::new(move |subscriber: Subscriber<T>| {
            SubjectInner::register(&inner, subscriber, Some(&*value))
        })
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        self.as_observable().subscribe(observer)
    }

    pub fn ptr_eq(a: &BehaviorSubject<T>, b: &BehaviorSubject<T>) -> bool {
        Subject::ptr_eq(&a.subject, &b.subject)
    }
}

impl<T> Observer<T> for BehaviorSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn next(&self, value: T) {
        BehaviorSubject::next(self, value);
    }

    fn error(&self, error: StreamError) {
        BehaviorSubject::error(self, error);
    }

    fn complete(&self) {
        BehaviorSubject::complete(self);
    }
}

impl<T: fmt::Debug> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("subject", &self.subject)
            .field("value", &*self.value.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CollectingObserver;

    #[test]
    fn test_subject_multicasts_without_replay() {
        let subject = Subject::new();
        subject.next(0);

        let observer = CollectingObserver::new();
        subject.subscribe(observer.clone());
        assert!(observer.events().is_empty());

        subject.next(1);
        subject.next(2);
        assert_eq!(observer.values(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_removes_observer() {
        let subject = Subject::new();
        let observer = CollectingObserver::new();
        let sub = subject.subscribe(observer.clone());
        assert_eq!(subject.observer_count(), 1);

        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);

        subject.next(5);
        assert!(observer.values().is_empty());
    }

    #[test]
    fn test_late_subscriber_gets_terminal() {
        let subject = Subject::<i32>::new();
        subject.complete();

        let observer = CollectingObserver::new();
        subject.subscribe(observer.clone());
        assert_eq!(observer.events(), vec![Notification::Complete]);

        subject.next(1);
        assert!(observer.values().is_empty());
    }

    #[test]
    fn test_error_is_delivered_once() {
        let subject = Subject::<i32>::new();
        let observer = CollectingObserver::new();
        subject.subscribe(observer.clone());

        subject.error(StreamError::new("first"));
        subject.error(StreamError::new("second"));
        subject.complete();

        assert_eq!(observer.events(), vec![Notification::Error(StreamError::new("first"))]);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_behavior_replays_current() {
        let state = BehaviorSubject::new(0);
        state.next(1);
        state.next(2);

        let observer = CollectingObserver::new();
        state.subscribe(observer.clone());
        assert_eq!(observer.values(), vec![2]);

        state.next(3);
        assert_eq!(observer.values(), vec![2, 3]);
        assert_eq!(state.value(), 3);
    }

    #[test]
    fn test_behavior_after_complete_does_not_replay() {
        let state = BehaviorSubject::new(7);
        state.complete();

        let observer = CollectingObserver::new();
        state.subscribe(observer.clone());
        assert_eq!(observer.events(), vec![Notification::Complete]);
    }

    #[test]
    fn test_reentrant_push_from_observer() {
        let subject = Subject::<i32>::new();
        let observer = CollectingObserver::new();

        let echo = subject.clone();
        subject.subscribe(move |v: i32| {
            if v < 3 {
                echo.next(v + 1);
            }
        });
        subject.subscribe(observer.clone());

        // nested pushes wait until the outer value reached every observer
        subject.next(1);
        assert_eq!(observer.values(), vec![1, 2, 3]);
    }

    #[test]
    fn test_terminal_from_observer_follows_current_value() {
        let subject = Subject::<i32>::new();
        let observer = CollectingObserver::new();

        let closer = subject.clone();
        subject.subscribe(move |_: i32| closer.complete());
        subject.subscribe(observer.clone());

        subject.next(1);
        assert_eq!(observer.events(), vec![Notification::Next(1), Notification::Complete]);
    }

    #[test]
    fn test_behavior_try_update() {
        let state = BehaviorSubject::new(1);
        let observer = CollectingObserver::new();
        state.subscribe(observer.clone());

        assert_eq!(state.try_update(|n| Ok::<_, &str>(Some(n + 1))), Ok(true));
        assert_eq!(state.try_update(|_| Ok::<_, &str>(None)), Ok(false));
        assert_eq!(state.try_update(|_| Err::<Option<i32>, _>("bad")), Err("bad"));

        assert_eq!(state.value(), 2);
        assert_eq!(observer.values(), vec![1, 2]);
    }

    #[test]
    fn test_behavior_late_subscriber_during_delivery() {
        let state = BehaviorSubject::new(0);
        let late = CollectingObserver::new();

        let inner = state.clone();
        let sink = late.clone();
        state.subscribe(move |v: i32| {
            if v == 1 {
                inner.next(2);
                inner.subscribe(sink.clone());
            }
        });

        state.next(1);
        // the replayed value is already the newest, so queued pushes are skipped
        assert_eq!(late.values(), vec![2]);
        assert_eq!(state.value(), 2);
    }

    #[test]
    fn test_subject_as_observer() {
        let subject = Subject::new();
        let observer = CollectingObserver::new();
        subject.subscribe(observer.clone());

        crate::observable::of(vec![4, 5]).subscribe(subject.clone());
        assert_eq!(observer.values(), vec![4, 5]);
        assert!(observer.is_completed());
    }
}
