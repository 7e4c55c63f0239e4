//! Completion surface handed to the backend pipeline.
//!
//! `CompletionCallback` is the only interface the pipeline uses to report the
//! outcome of a dispatched request. Exactly one of
//! [`on_success`](CompletionCallback::on_success) /
//! [`on_failure`](CompletionCallback::on_failure) fires per request; both
//! consume the callback, so invoking it twice is unrepresentable. Completions
//! that outlive their request — a token minted before the connection reused
//! its exchange — are rejected at runtime as protocol violations.

use bytes::Bytes;
use log::error;

use crate::{
    error::ProcessingFailure, exchange::ProtocolViolation, suspension::SuspensionHandle,
};

/// Binding between one dispatched request and its completion callback.
#[derive(Debug)]
pub struct CompletionToken {
    generation: u64,
}

impl CompletionToken {
    pub(crate) fn new(generation: u64) -> Self { Self { generation } }

    pub(crate) fn generation(&self) -> u64 { self.generation }
}

/// Callback reporting a request's outcome back to its connection.
///
/// Safe to invoke from any thread: synchronously on the dispatching thread
/// for fast pipelines, or from a worker thread that finishes before the
/// connection task even reaches its suspend point.
#[derive(Debug)]
pub struct CompletionCallback {
    handle: SuspensionHandle,
    token: CompletionToken,
}

impl CompletionCallback {
    pub(crate) fn new(handle: SuspensionHandle, token: CompletionToken) -> Self {
        Self { handle, token }
    }

    /// Deliver a successful payload and resume the connection.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] if the exchange already resumed or the
    /// token is stale; the violation is also logged.
    pub fn on_success(self, payload: Bytes) -> Result<(), ProtocolViolation> {
        self.deliver(Ok(payload))
    }

    /// Deliver a pipeline failure and resume the connection.
    ///
    /// If `failure` embeds the in-flight message, its access marker is reset
    /// on the connection side before the failure becomes observable there.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] if the exchange already resumed or the
    /// token is stale; the violation is also logged.
    pub fn on_failure(self, failure: ProcessingFailure) -> Result<(), ProtocolViolation> {
        self.deliver(Err(failure))
    }

    fn deliver(
        self,
        result: Result<Bytes, ProcessingFailure>,
    ) -> Result<(), ProtocolViolation> {
        self.handle.resume(&self.token, result).inspect_err(|violation| {
            error!("completion rejected: {violation}");
        })
    }
}
