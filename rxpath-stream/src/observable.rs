//! Cold observables and their constructors
//!
//! An [`Observable`] is a producer function run once per subscription.
//! Producers push synchronously: every value emitted during `subscribe`
//! reaches the observer before `subscribe` returns.

use crate::error::StreamError;
use crate::observer::{Observer, Subscriber};
use crate::subscription::Subscription;
use std::fmt;
use std::sync::Arc;

type Producer<T> = dyn Fn(Subscriber<T>) + Send + Sync;

/// A transformation stage from one observable to another
pub type Operator<T, U = T> = Arc<dyn Fn(Observable<T>) -> Observable<U> + Send + Sync>;

/// A push-based stream of values
pub struct Observable<T> {
    producer: Arc<Producer<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ptr = Arc::as_ptr(&self.producer) as *const ();
        f.debug_tuple("Observable").field(&ptr).finish()
    }
}

impl<T: 'static> Observable<T> {
    /// Build an observable from a producer run per subscription
    ///
    /// The producer registers its cleanup with [`Subscriber::add`].
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Subscriber<T>) + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
        }
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        self.subscribe_linked(observer, None)
    }

    /// Subscribe with the new subscription registered under `parent` before
    /// the producer runs, so a parent released mid-emission stops it.
    pub(crate) fn subscribe_linked<O>(&self, observer: O, parent: Option<&Subscription>) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        let subscriber = Subscriber::new(Arc::new(observer));
        let subscription = subscriber.subscription().clone();
        if let Some(parent) = parent {
            parent.add_child(subscription.clone());
        }
        if !subscriber.is_stopped() {
            (self.producer)(subscriber);
        }
        subscription
    }

    /// Apply one transformation stage
    pub fn pipe<U, F>(&self, stage: F) -> Observable<U>
    where
        F: FnOnce(Observable<T>) -> Observable<U>,
    {
        stage(self.clone())
    }

    /// Apply a sequence of same-typed stages in order
    pub fn pipe_all<I>(&self, stages: I) -> Observable<T>
    where
        I: IntoIterator<Item = Operator<T>>,
    {
        stages
            .into_iter()
            .fold(self.clone(), |source, stage| stage(source))
    }

    /// Identity comparison of two handles
    pub fn ptr_eq(a: &Observable<T>, b: &Observable<T>) -> bool {
        Arc::ptr_eq(&a.producer, &b.producer)
    }
}

/// Emit each value in order, then complete
pub fn of<T>(values: Vec<T>) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    Observable::new(move |subscriber: Subscriber<T>| {
        for value in &values {
            if subscriber.is_stopped() {
                return;
            }
            subscriber.next(value.clone());
        }
        subscriber.complete();
    })
}

pub fn from_iter<T, I>(values: I) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    of(values.into_iter().collect())
}

/// Complete immediately
pub fn empty<T: 'static>() -> Observable<T> {
    Observable::new(|subscriber: Subscriber<T>| subscriber.complete())
}

/// Never emit anything
pub fn never<T: 'static>() -> Observable<T> {
    Observable::new(|_subscriber: Subscriber<T>| {})
}

/// Fail immediately with `error`
pub fn throw<T: 'static>(error: StreamError) -> Observable<T> {
    Observable::new(move |subscriber: Subscriber<T>| subscriber.error(error.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{CollectingObserver, Notification};

    #[test]
    fn test_of_emits_then_completes() {
        let observer = CollectingObserver::new();
        let sub = of(vec![1, 2, 3]).subscribe(observer.clone());

        assert_eq!(observer.values(), vec![1, 2, 3]);
        assert!(observer.is_completed());
        assert!(sub.is_closed());
    }

    #[test]
    fn test_cold_observable_runs_per_subscription() {
        let source = of(vec!["x"]);
        let first = CollectingObserver::new();
        let second = CollectingObserver::new();

        source.subscribe(first.clone());
        source.subscribe(second.clone());

        assert_eq!(first.values(), vec!["x"]);
        assert_eq!(second.values(), vec!["x"]);
    }

    #[test]
    fn test_throw_and_empty() {
        let failed = CollectingObserver::<i32>::new();
        throw(StreamError::new("boom")).subscribe(failed.clone());
        assert_eq!(
            failed.events(),
            vec![Notification::Error(StreamError::new("boom"))]
        );

        let done = CollectingObserver::<i32>::new();
        empty().subscribe(done.clone());
        assert_eq!(done.events(), vec![Notification::Complete]);

        let silent = CollectingObserver::<i32>::new();
        never().subscribe(silent.clone());
        assert!(silent.events().is_empty());
    }

    #[test]
    fn test_unsubscribed_parent_skips_producer() {
        let parent = Subscription::new();
        parent.unsubscribe();

        let observer = CollectingObserver::new();
        of(vec![1]).subscribe_linked(observer.clone(), Some(&parent));
        assert!(observer.events().is_empty());
    }
}
