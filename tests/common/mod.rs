//! Shared utilities for integration tests.
//!
//! Provides a recording response writer and a small set of pipeline handlers
//! covering the inline, fast-detached and worker-thread-detached shapes.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    sync::Arc,
    thread::{self, ThreadId},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use holdwire::{
    CompletionCallback, ConnectionDriver, ConnectionId, Handler, HandlerRegistry, Message,
    ProcessingFailure, ResponseWriter, RoutingMode,
};

/// Response writer recording each payload and the thread that wrote it.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub frames: Vec<Bytes>,
    pub writer_threads: Vec<ThreadId>,
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    async fn write(&mut self, payload: Bytes) -> std::io::Result<()> {
        self.frames.push(payload);
        self.writer_threads.push(thread::current().id());
        Ok(())
    }
}

/// Build a driver over a single-target registry and a recording writer.
pub fn recording_driver(
    target: &str,
    handler: Arc<dyn Handler>,
) -> ConnectionDriver<RecordingWriter> {
    let registry = HandlerRegistry::new();
    registry.register(target, handler);
    ConnectionDriver::new(
        ConnectionId::new(1),
        Arc::new(registry),
        RecordingWriter::default(),
    )
}

/// Inline handler echoing the request payload.
pub struct EchoInline;

#[async_trait]
impl Handler for EchoInline {
    async fn route_inline(&self, message: Message) -> Result<Bytes, ProcessingFailure> {
        Ok(message.payload().clone())
    }
}

/// Detached handler invoking its callback before returning from dispatch.
pub struct FastDetached {
    pub payload: Bytes,
}

#[async_trait]
impl Handler for FastDetached {
    fn routing_mode(&self) -> RoutingMode { RoutingMode::Detached }

    async fn route_inline(&self, _message: Message) -> Result<Bytes, ProcessingFailure> {
        Err(ProcessingFailure::new("inline route unused"))
    }

    async fn route_detached(&self, _message: Message, completion: CompletionCallback) {
        completion
            .on_success(self.payload.clone())
            .expect("first completion for this request");
    }
}

/// Detached handler completing from a separate worker thread after a delay.
pub struct WorkerDetached {
    pub payload: Bytes,
    pub delay: Duration,
}

#[async_trait]
impl Handler for WorkerDetached {
    fn routing_mode(&self) -> RoutingMode { RoutingMode::Detached }

    async fn route_inline(&self, _message: Message) -> Result<Bytes, ProcessingFailure> {
        Err(ProcessingFailure::new("inline route unused"))
    }

    async fn route_detached(&self, _message: Message, completion: CompletionCallback) {
        let payload = self.payload.clone();
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            completion
                .on_success(payload)
                .expect("first completion for this request");
        });
    }
}

/// Detached handler failing from a worker thread with the message embedded.
pub struct FailingDetached;

#[async_trait]
impl Handler for FailingDetached {
    fn routing_mode(&self) -> RoutingMode { RoutingMode::Detached }

    async fn route_inline(&self, _message: Message) -> Result<Bytes, ProcessingFailure> {
        Err(ProcessingFailure::new("inline route unused"))
    }

    async fn route_detached(&self, mut message: Message, completion: CompletionCallback) {
        thread::spawn(move || {
            // Bind the access marker to this pipeline thread before failing.
            message
                .set_metadata("pipeline", "worker")
                .expect("pipeline thread claims the message");
            completion
                .on_failure(ProcessingFailure::with_message("pipeline exploded", message))
                .expect("first completion for this request");
        });
    }
}
