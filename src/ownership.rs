//! Thread-access markers for in-flight messages.
//!
//! A message is mutated by exactly one side of the connection/pipeline
//! handoff at a time. `AccessControl` records which thread currently holds
//! mutation rights: the marker binds to the first thread that mutates the
//! message and rejects mutation from any other thread until it is reset.
//! Resets are explicit and happen at each ownership crossing — when the
//! message is dispatched to the pipeline, and again when a failure carries it
//! back to the connection side.

use std::{
    sync::{Mutex, PoisonError},
    thread::{self, ThreadId},
};

use thiserror::Error;

/// Error raised when a thread mutates a message without holding its marker.
#[derive(Debug, Error)]
#[error("message is owned by another thread; reset access control before mutating")]
pub struct AccessViolation;

/// Marker identifying the thread currently allowed to mutate a message.
///
/// Unbound after construction or a reset; the next mutating thread claims it.
#[derive(Debug, Default)]
pub struct AccessControl {
    owner: Mutex<Option<ThreadId>>,
}

impl AccessControl {
    /// Create an unbound marker.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Verify the calling thread may mutate, binding the marker if unbound.
    ///
    /// # Errors
    ///
    /// Returns [`AccessViolation`] if the marker is bound to another thread.
    pub fn check(&self) -> Result<(), AccessViolation> {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        match *owner {
            Some(id) if id != thread::current().id() => Err(AccessViolation),
            Some(_) => Ok(()),
            None => {
                *owner = Some(thread::current().id());
                Ok(())
            }
        }
    }

    /// Clear the marker so the next mutating thread may claim it.
    ///
    /// Called exactly once per ownership crossing. Omitting the reset when a
    /// failure hands a message back to the connection side leaves the marker
    /// bound to a pipeline thread and later mutation attempts fail.
    pub fn reset(&self) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        *owner = None;
    }

    /// Returns `true` while no thread holds the marker.
    #[must_use]
    pub fn is_unbound(&self) -> bool {
        self.owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
