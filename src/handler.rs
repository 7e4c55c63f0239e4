//! Handler seam between the connection front end and the backend pipeline.
//!
//! Handlers come in two routing modes. Inline handlers process the message
//! and return the result directly on the connection task; no suspension
//! occurs. Detached handlers receive a [`CompletionCallback`] and report
//! completion through it — from any thread, at any later time — while the
//! connection suspends. Handler lookup is a separate concern behind
//! [`HandlerResolver`], with a concurrent [`HandlerRegistry`] as the default
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::{
    completion::CompletionCallback, error::ProcessingFailure, message::Message,
    session::ConnectionId,
};

/// How a handler reports its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutingMode {
    /// Process on the connection task and return the result directly.
    Inline,
    /// Fire-and-forget dispatch; completion arrives through the callback.
    Detached,
}

/// A backend pipeline entry point.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Which entry point the admission path should use.
    fn routing_mode(&self) -> RoutingMode { RoutingMode::Inline }

    /// Process `message` and return the response payload directly.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessingFailure`] if the pipeline cannot produce a
    /// response.
    async fn route_inline(&self, message: Message) -> Result<Bytes, ProcessingFailure>;

    /// Hand `message` to the pipeline; completion is reported solely through
    /// `completion`. Implementations must return promptly — long-running work
    /// belongs on a spawned task or worker thread holding the callback.
    ///
    /// The default adapts the inline route and completes synchronously, which
    /// exercises the completion-ahead-of-suspend path.
    async fn route_detached(&self, message: Message, completion: CompletionCallback) {
        let outcome = match self.route_inline(message).await {
            Ok(payload) => completion.on_success(payload),
            Err(failure) => completion.on_failure(failure),
        };
        if let Err(violation) = outcome {
            log::error!("detached route could not complete: {violation}");
        }
    }
}

/// Resolve the handler serving a request target on a connection.
pub trait HandlerResolver: Send + Sync {
    /// Look up the handler for `target`, if one is registered.
    fn resolve(&self, connection: ConnectionId, target: &str) -> Option<Arc<dyn Handler>>;
}

/// Concurrent handler registry keyed by request target.
#[derive(Default)]
pub struct HandlerRegistry {
    routes: DashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `handler` for `target`, replacing any previous registration.
    pub fn register(&self, target: impl Into<String>, handler: Arc<dyn Handler>) {
        self.routes.insert(target.into(), handler);
    }

    /// Remove the handler registered for `target`.
    pub fn deregister(&self, target: &str) { self.routes.remove(target); }
}

impl HandlerResolver for HandlerRegistry {
    fn resolve(&self, _connection: ConnectionId, target: &str) -> Option<Arc<dyn Handler>> {
        self.routes.get(target).map(|entry| Arc::clone(entry.value()))
    }
}
