//! Operator combinators
//!
//! Each operator subscribes upstream once per downstream subscription and
//! forwards terminal signals unchanged. Operator state is per subscription,
//! and no lock is held while a downstream observer runs.

use crate::error::StreamError;
use crate::observable::{Observable, Operator};
use crate::observer::{Observer, Subscriber};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Forward<U, N> {
    downstream: Subscriber<U>,
    on_next: N,
}

impl<T, U, N> Observer<T> for Forward<U, N>
where
    N: Fn(&Subscriber<U>, T) + Send + Sync,
{
    fn next(&self, value: T) {
        (self.on_next)(&self.downstream, value);
    }

    fn error(&self, error: StreamError) {
        self.downstream.error(error);
    }

    fn complete(&self) {
        self.downstream.complete();
    }
}

impl<T: 'static> Observable<T> {
    /// Derive an observable whose per-subscription `next` handler is built
    /// by `make`.
    pub fn lift<U, M, N>(&self, make: M) -> Observable<U>
    where
        U: 'static,
        M: Fn() -> N + Send + Sync + 'static,
        N: Fn(&Subscriber<U>, T) + Send + Sync + 'static,
    {
        let source = self.clone();
        Observable::new(move |downstream: Subscriber<U>| {
            let forward = Forward {
                downstream: downstream.clone(),
                on_next: make(),
            };
            source.subscribe_linked(forward, Some(downstream.subscription()));
        })
    }

    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move || {
            let f = f.clone();
            move |downstream: &Subscriber<U>, value: T| downstream.next(f(value))
        })
    }

    pub fn filter<P>(&self, predicate: P) -> Observable<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.lift(move || {
            let predicate = predicate.clone();
            move |downstream: &Subscriber<T>, value: T| {
                if predicate(&value) {
                    downstream.next(value);
                }
            }
        })
    }

    /// Emit the running accumulation of `f` starting from `seed`
    pub fn scan<U, F>(&self, seed: U, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(U, T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.lift(move || {
            let f = f.clone();
            let acc = Mutex::new(seed.clone());
            move |downstream: &Subscriber<U>, value: T| {
                // no lock is held while the reducer runs
                let current = acc.lock().clone();
                let next = f(current, value);
                *acc.lock() = next.clone();
                downstream.next(next);
            }
        })
    }

    /// Emit the first `count` values, then complete
    pub fn take(&self, count: usize) -> Observable<T> {
        if count == 0 {
            return crate::observable::empty();
        }
        self.lift(move || {
            let seen = AtomicUsize::new(0);
            move |downstream: &Subscriber<T>, value: T| {
                let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= count {
                    downstream.next(value);
                }
                if n == count {
                    downstream.complete();
                }
            }
        })
    }
}

impl<T> Observable<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    /// Drop values equal to the immediately preceding one
    pub fn distinct_until_changed(&self) -> Observable<T> {
        self.lift(|| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            move |downstream: &Subscriber<T>, value: T| {
                let changed = {
                    let mut last = last.lock();
                    if last.as_ref() == Some(&value) {
                        false
                    } else {
                        *last = Some(value.clone());
                        true
                    }
                };
                if changed {
                    downstream.next(value);
                }
            }
        })
    }
}

/// [`Observable::map`] as a pipeline stage
pub fn map<T, U, F>(f: F) -> Operator<T, U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |source: Observable<T>| {
        let f = f.clone();
        source.map(move |value| f(value))
    })
}

/// [`Observable::filter`] as a pipeline stage
pub fn filter<T, P>(predicate: P) -> Operator<T>
where
    T: 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    Arc::new(move |source: Observable<T>| {
        let predicate = predicate.clone();
        source.filter(move |value| predicate(value))
    })
}

/// [`Observable::scan`] as a pipeline stage
pub fn scan<T, U, F>(seed: U, f: F) -> Operator<T, U>
where
    T: 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(U, T) -> U + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |source: Observable<T>| {
        let f = f.clone();
        source.scan(seed.clone(), move |acc, value| f(acc, value))
    })
}

/// [`Observable::take`] as a pipeline stage
pub fn take<T: 'static>(count: usize) -> Operator<T> {
    Arc::new(move |source: Observable<T>| source.take(count))
}

/// [`Observable::distinct_until_changed`] as a pipeline stage
pub fn distinct_until_changed<T>() -> Operator<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    Arc::new(|source: Observable<T>| source.distinct_until_changed())
}
