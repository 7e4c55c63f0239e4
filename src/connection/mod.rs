//! Per-connection driver loop around the suspend/resume cycle.
//!
//! `ConnectionDriver` is the outer loop the redesigned suspend outcome
//! reports to. It owns the connection's exchange — reused across sequential
//! requests — and, for each request, runs service passes until a response is
//! written or a failure propagates: park while suspended, re-enter when a
//! completion arrives, and reset the exchange before the next request.
//!
//! Suspension is indefinite by default; [`DriverConfig::resume_timeout`] arms
//! an optional deadline, and the shutdown token aborts parked requests when
//! the connection is being torn down.

mod admission;
mod dispatch;

use std::sync::Arc;

use log::warn;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use self::{admission::RequestAdmission, dispatch::{ResponseDispatcher, ServicePass}};
use crate::{
    error::ServiceError,
    handler::HandlerResolver,
    message::{DefaultMessageFactory, MessageFactory, RawRequest},
    session::ConnectionId,
    suspension::SuspensionHandle,
    writer::ResponseWriter,
};

/// Configuration for a connection driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct DriverConfig {
    /// How long a suspended request may wait for its completion.
    ///
    /// `None` suspends indefinitely. When armed, an elapsed deadline fails
    /// the request with [`ServiceError::ResumeTimeout`] and resets the
    /// exchange; the late completion is then rejected as stale.
    pub resume_timeout: Option<Duration>,
}

/// Drives request handling for one connection.
pub struct ConnectionDriver<W> {
    id: ConnectionId,
    dispatcher: ResponseDispatcher,
    handle: SuspensionHandle,
    writer: W,
    config: DriverConfig,
    shutdown: CancellationToken,
}

impl<W: ResponseWriter> ConnectionDriver<W> {
    /// Create a driver for connection `id` resolving handlers through
    /// `resolver` and writing responses to `writer`.
    #[must_use]
    pub fn new(id: ConnectionId, resolver: Arc<dyn HandlerResolver>, writer: W) -> Self {
        Self::with_factory(id, resolver, Arc::new(DefaultMessageFactory), writer)
    }

    /// Create a driver with a custom message construction seam.
    #[must_use]
    pub fn with_factory(
        id: ConnectionId,
        resolver: Arc<dyn HandlerResolver>,
        factory: Arc<dyn MessageFactory>,
        writer: W,
    ) -> Self {
        Self {
            id,
            dispatcher: ResponseDispatcher::new(RequestAdmission::new(resolver, factory)),
            handle: SuspensionHandle::new(),
            writer,
            config: DriverConfig::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the driver configuration.
    #[must_use]
    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `shutdown` to abort suspended requests on connection teardown.
    #[must_use]
    pub fn with_shutdown_token(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// The identity of the connection this driver serves.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId { self.id }

    /// Clone the suspend/resume handle for this connection's exchange.
    #[must_use]
    pub fn suspension_handle(&self) -> SuspensionHandle { self.handle.clone() }

    /// Borrow the response writer.
    pub fn writer_mut(&mut self) -> &mut W { &mut self.writer }

    /// Consume the driver, returning the response writer.
    pub fn into_writer(self) -> W { self.writer }

    /// Handle one request to completion: exactly one response is written or
    /// one error is returned.
    ///
    /// The exchange is reset afterwards in every case, so the next request on
    /// this connection starts from a clean `Initial` state and any completion
    /// still in flight for this request is rejected as stale.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the pipeline reports a failure, the
    /// response cannot be written, no handler matches, the resume deadline
    /// elapses, or the connection shuts down while suspended.
    pub async fn handle_request(&mut self, raw: RawRequest) -> Result<(), ServiceError> {
        let outcome = self.run(&raw).await;
        self.handle.reset();
        if let Err(error) = &outcome {
            warn!("request failed: connection={}, error={error}", self.id);
        }
        outcome
    }

    async fn run(&mut self, raw: &RawRequest) -> Result<(), ServiceError> {
        loop {
            let pass = self
                .dispatcher
                .service(self.id, raw, &self.handle, &mut self.writer)
                .await?;
            match pass {
                ServicePass::Complete => return Ok(()),
                ServicePass::ResumePending => {}
                ServicePass::AwaitResume => self.park().await?,
            }
        }
    }

    /// Park until a completion schedules re-entry, the deadline elapses, or
    /// the connection shuts down.
    async fn park(&self) -> Result<(), ServiceError> {
        let reentered = self.handle.reentered();
        match self.config.resume_timeout {
            Some(limit) => tokio::select! {
                () = self.shutdown.cancelled() => Err(ServiceError::Shutdown),
                parked = time::timeout(limit, reentered) => {
                    parked.map_err(|_| ServiceError::ResumeTimeout(limit))
                }
            },
            None => tokio::select! {
                () = self.shutdown.cancelled() => Err(ServiceError::Shutdown),
                () = reentered => Ok(()),
            },
        }
    }
}
