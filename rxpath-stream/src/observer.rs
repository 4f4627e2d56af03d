//! Observers and subscribers
//!
//! An [`Observer`] receives notifications. A [`Subscriber`] wraps an
//! observer for one subscription and enforces the stream grammar: any number
//! of `next` calls followed by at most one `error` or `complete`.

use crate::error::StreamError;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single stream notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

impl<T> Notification<T> {
    pub fn is_next(&self) -> bool {
        matches!(self, Notification::Next(_))
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_next()
    }
}

/// Receiver of stream notifications
///
/// Closures `Fn(T)` implement this trait and ignore terminal signals.
pub trait Observer<T>: Send + Sync {
    fn next(&self, value: T);

    fn error(&self, _error: StreamError) {}

    fn complete(&self) {}

    /// Convenience method to dispatch a notification
    fn notify(&self, notification: Notification<T>) {
        match notification {
            Notification::Next(value) => self.next(value),
            Notification::Error(error) => self.error(error),
            Notification::Complete => self.complete(),
        }
    }
}

impl<T, F> Observer<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn next(&self, value: T) {
        self(value)
    }
}

/// The per-subscription end of an observer
pub struct Subscriber<T> {
    observer: Arc<dyn Observer<T>>,
    stopped: Arc<AtomicBool>,
    subscription: Subscription,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            stopped: self.stopped.clone(),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T> Subscriber<T> {
    pub(crate) fn new(observer: Arc<dyn Observer<T>>) -> Self {
        Self {
            observer,
            stopped: Arc::new(AtomicBool::new(false)),
            subscription: Subscription::new(),
        }
    }

    pub fn next(&self, value: T) {
        if !self.is_stopped() {
            self.observer.next(value);
        }
    }

    pub fn error(&self, error: StreamError) {
        if self.stop() {
            self.observer.error(error);
            self.subscription.unsubscribe();
        }
    }

    pub fn complete(&self) {
        if self.stop() {
            self.observer.complete();
            self.subscription.unsubscribe();
        }
    }

    pub fn notify(&self, notification: Notification<T>) {
        match notification {
            Notification::Next(value) => self.next(value),
            Notification::Error(error) => self.error(error),
            Notification::Complete => self.complete(),
        }
    }

    /// True once a terminal signal was delivered or the subscription closed
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.subscription.is_closed()
    }

    /// Register cleanup for this subscription
    pub fn add<F>(&self, teardown: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.subscription.add(teardown);
    }

    pub fn add_subscription(&self, child: Subscription) {
        self.subscription.add_child(child);
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    // Claims the single terminal slot; false if already taken.
    fn stop(&self) -> bool {
        !self.subscription.is_closed() && !self.stopped.swap(true, Ordering::SeqCst)
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// An observer that records every notification it receives
///
/// Clones share the same record, so one clone can be handed to `subscribe`
/// while another is inspected.
pub struct CollectingObserver<T> {
    events: Arc<Mutex<Vec<Notification<T>>>>,
}

impl<T> Clone for CollectingObserver<T> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<T> Default for CollectingObserver<T> {
    fn default() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> CollectingObserver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Notification<T>> {
        self.events.lock().clone()
    }

    /// Values received through `next`, in order
    pub fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Notification::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Notification::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, Notification::Complete))
            .count()
    }

    pub fn is_completed(&self) -> bool {
        self.completions() > 0
    }

    /// Take the recorded notifications, leaving the record empty
    pub fn take(&self) -> Vec<Notification<T>> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<T: Send> Observer<T> for CollectingObserver<T> {
    fn next(&self, value: T) {
        self.events.lock().push(Notification::Next(value));
    }

    fn error(&self, error: StreamError) {
        self.events.lock().push(Notification::Error(error));
    }

    fn complete(&self) {
        self.events.lock().push(Notification::Complete);
    }
}

impl<T: fmt::Debug> fmt::Debug for CollectingObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectingObserver")
            .field("events", &*self.events.lock())
            .finish()
    }
}
