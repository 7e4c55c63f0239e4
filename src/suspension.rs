//! Handle detaching a request from its connection task and re-entering it.
//!
//! `SuspensionHandle` pairs the per-connection [`ExchangeSynchronizer`] with
//! the wakeup primitive that schedules connection re-entry after a resume.
//! The handle is cheaply cloneable and shared between the connection task and
//! whichever pipeline thread eventually completes the request.
//!
//! Suspension is signalled by the [`SuspendOutcome`] return value; the
//! connection framework's outer loop checks it rather than relying on
//! stack-unwinding control flow.

use std::sync::Arc;

use log::debug;
use tokio::sync::Notify;

use crate::{
    completion::{CompletionCallback, CompletionToken},
    exchange::{
        ExchangeState, ExchangeSynchronizer, PipelineResult, ProtocolViolation, ResumeEffect,
        SuspendOutcome,
    },
};

#[derive(Debug)]
struct Shared {
    sync: ExchangeSynchronizer,
    reentry: Notify,
}

/// Cloneable suspend/resume handle for one connection's exchange.
#[derive(Clone, Debug)]
pub struct SuspensionHandle {
    shared: Arc<Shared>,
}

impl Default for SuspensionHandle {
    fn default() -> Self { Self::new() }
}

impl SuspensionHandle {
    /// Create a handle with a fresh exchange in the `Initial` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                sync: ExchangeSynchronizer::new(),
                reentry: Notify::new(),
            }),
        }
    }

    /// Observable state of the current exchange.
    #[must_use]
    pub fn state(&self) -> ExchangeState { self.shared.sync.state() }

    /// Returns `true` while no request has been dispatched on this exchange.
    #[must_use]
    pub fn is_initial(&self) -> bool { self.state() == ExchangeState::Initial }

    /// Returns `true` once a completion stored its result.
    #[must_use]
    pub fn is_resumed(&self) -> bool { self.state() == ExchangeState::Resumed }

    /// Mint the completion callback for the request about to be dispatched.
    ///
    /// The callback's token captures the current exchange generation, so it
    /// cannot resume a later request on a reused connection.
    #[must_use]
    pub fn completion(&self) -> CompletionCallback {
        CompletionCallback::new(
            self.clone(),
            CompletionToken::new(self.shared.sync.generation()),
        )
    }

    /// Detach the current request pending a completion.
    ///
    /// Callers must check the outcome: [`SuspendOutcome::AlreadyResumed`]
    /// means the pipeline won the race and the stored result is ready for
    /// immediate consumption.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::SuspendFrom`] when called while already
    /// suspended or consumed.
    pub fn suspend(&self) -> Result<SuspendOutcome, ProtocolViolation> {
        self.shared.sync.suspend()
    }

    /// Store a completion result and wake the connection task if it parked.
    ///
    /// Safe to call from any thread, including synchronously on the thread
    /// performing the dispatch. The wakeup permit persists if the resume
    /// lands between the suspend transition and the task parking, so no
    /// wakeup is lost.
    pub(crate) fn resume(
        &self,
        token: &CompletionToken,
        result: PipelineResult,
    ) -> Result<(), ProtocolViolation> {
        match self.shared.sync.resume(token.generation(), result)? {
            ResumeEffect::RanAhead => {
                debug!("completion arrived before suspend; no wakeup needed");
            }
            ResumeEffect::NeedsReentry => {
                debug!("completion delivered; scheduling connection re-entry");
                self.shared.reentry.notify_one();
            }
        }
        Ok(())
    }

    /// Take the stored result under the synchronizer lock.
    pub(crate) fn consume(&self) -> Result<PipelineResult, ProtocolViolation> {
        self.shared.sync.consume()
    }

    /// Reset the exchange for the next request on this connection.
    ///
    /// Any leftover wakeup permit may cause one spurious re-entry pass on the
    /// next request; the dispatcher treats that pass as a no-op.
    pub fn reset(&self) { self.shared.sync.reset(); }

    /// Park until a completion schedules re-entry.
    pub async fn reentered(&self) { self.shared.reentry.notified().await; }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::SuspensionHandle;
    use crate::exchange::SuspendOutcome;

    #[tokio::test]
    async fn wakeup_is_not_lost_when_resume_lands_before_parking() {
        let handle = SuspensionHandle::new();
        let completion = handle.completion();
        assert_eq!(handle.suspend().unwrap(), SuspendOutcome::Suspended);

        // Resume before anyone awaits re-entry; the permit must persist.
        completion.on_success(Bytes::from_static(b"ok")).unwrap();
        handle.reentered().await;
        assert!(handle.is_resumed());
    }

    #[tokio::test]
    async fn resume_from_a_worker_thread_wakes_the_parked_task() {
        let handle = SuspensionHandle::new();
        let completion = handle.completion();
        handle.suspend().unwrap();

        let worker = std::thread::spawn(move || {
            completion.on_success(Bytes::from_static(b"threaded")).unwrap();
        });
        handle.reentered().await;
        worker.join().expect("worker thread");

        assert_eq!(handle.consume().unwrap().unwrap().as_ref(), b"threaded");
    }
}
