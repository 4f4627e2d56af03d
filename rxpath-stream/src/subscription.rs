//! Subscription handles
//!
//! A subscription is the unit of resource ownership in the runtime. It is
//! released only by an explicit [`Subscription::unsubscribe`]; dropping the
//! handle leaves the registration in place.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Teardown = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct SubscriptionInner {
    closed: AtomicBool,
    teardowns: Mutex<Vec<Teardown>>,
}

/// Handle to an active subscription
///
/// Clones share the same underlying registration.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register cleanup to run on unsubscribe
    ///
    /// Runs immediately when the subscription is already closed.
    pub fn add<F>(&self, teardown: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut teardowns = self.inner.teardowns.lock();
            if !self.is_closed() {
                teardowns.push(Box::new(teardown));
                return;
            }
        }
        teardown();
    }

    /// Release `child` together with this subscription
    pub fn add_child(&self, child: Subscription) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        self.add(move || child.unsubscribe());
    }

    pub fn unsubscribe(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let teardowns = std::mem::take(&mut *self.inner.teardowns.lock());
        for teardown in teardowns {
            teardown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("teardowns", &self.inner.teardowns.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_teardown_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = Subscription::new();

        let c = count.clone();
        sub.add(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(sub.is_closed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_add_after_close_runs_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = Subscription::new();
        sub.unsubscribe();

        let c = count.clone();
        sub.add(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_child_released_with_parent() {
        let parent = Subscription::new();
        let child = Subscription::new();
        parent.add_child(child.clone());

        parent.unsubscribe();
        assert!(child.is_closed());
    }

    #[test]
    fn test_drop_does_not_release() {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = Subscription::new();
        let c = count.clone();
        sub.add(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
