//! Mutable state container
//!
//! Owns the replaying root subject. Reads walk the held value; writes build
//! a new root by copy-on-write and publish it.

use crate::accessor;
use crate::error::AccessError;
use rxpath_stream::{BehaviorSubject, Observable, StreamError};
use rxpath_types::{Path, Value};

#[derive(Debug, Clone)]
pub struct StateContainer {
    subject: BehaviorSubject<Value>,
    distinct: bool,
}

impl StateContainer {
    pub fn new(subject: BehaviorSubject<Value>, distinct: bool) -> Self {
        Self { subject, distinct }
    }

    /// Current value at `path`
    pub fn read(&self, path: &Path) -> Value {
        accessor::read(&self.subject.value(), path)
    }

    /// Store `value` at `path` and publish the new root
    ///
    /// Returns `Ok(false)` when nothing was published: the subject already
    /// terminated, or the container is distinct and the leaf is unchanged.
    /// The copy-on-write runs first, so an unreachable leaf is an error even
    /// when the value read there equals `value`. Read, compare and publish
    /// happen under the subject lock, so concurrent writers never overwrite
    /// each other's updates.
    pub fn write(&self, path: &Path, value: Value) -> Result<bool, AccessError> {
        if self.subject.is_stopped() {
            tracing::debug!(%path, "write after termination ignored");
            return Ok(false);
        }

        let distinct = self.distinct;
        let published = self.subject.try_update(|root| -> Result<Option<Value>, AccessError> {
            let unchanged = distinct && accessor::read(root, path) == value;
            let next = accessor::write(root, path, value)?;
            if unchanged {
                tracing::trace!(%path, "unchanged write suppressed");
                return Ok(None);
            }
            Ok(Some(next))
        })?;
        if published {
            tracing::debug!(%path, "published state update");
        }
        Ok(published)
    }

    /// Fail the root stream
    pub fn error(&self, error: StreamError) {
        tracing::debug!(%error, "state errored");
        self.subject.error(error);
    }

    /// Complete the root stream
    pub fn complete(&self) {
        tracing::debug!("state completed");
        self.subject.complete();
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn subject(&self) -> &BehaviorSubject<Value> {
        &self.subject
    }

    pub fn observable(&self) -> Observable<Value> {
        self.subject.as_observable()
    }
}
