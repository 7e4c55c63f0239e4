//! First-pass request admission: resolve the handler, build the message,
//! dispatch.

use std::sync::Arc;

use bytes::Bytes;
use log::debug;

use crate::{
    error::{ProcessingFailure, ServiceError},
    exchange::SuspendOutcome,
    handler::{HandlerResolver, RoutingMode},
    message::{METHOD_KEY, MessageFactory, RawRequest},
    session::ConnectionId,
    suspension::SuspensionHandle,
};

/// Outcome of admitting one request.
#[derive(Debug)]
pub(crate) enum AdmissionOutcome {
    /// The inline route finished; the result is ready to deliver.
    Completed(Result<Bytes, ProcessingFailure>),
    /// The request was dispatched and the exchange is suspended.
    Suspended,
    /// The pipeline completed before suspension; the stored result awaits
    /// consumption on the next pass.
    ResumePending,
}

/// Turns a raw inbound request into a dispatched pipeline message.
pub(crate) struct RequestAdmission {
    resolver: Arc<dyn HandlerResolver>,
    factory: Arc<dyn MessageFactory>,
}

impl RequestAdmission {
    pub(crate) fn new(
        resolver: Arc<dyn HandlerResolver>,
        factory: Arc<dyn MessageFactory>,
    ) -> Self {
        Self { resolver, factory }
    }

    /// Resolve, build and dispatch one request.
    ///
    /// For detached handlers the dispatch happens before the suspend
    /// transition, so a fast pipeline may already be racing to complete; the
    /// suspend outcome reports whether it won.
    pub(crate) async fn admit(
        &self,
        connection: ConnectionId,
        raw: &RawRequest,
        handle: &SuspensionHandle,
    ) -> Result<AdmissionOutcome, ServiceError> {
        let handler = self
            .resolver
            .resolve(connection, &raw.target)
            .ok_or_else(|| ServiceError::UnknownTarget(raw.target.clone()))?;

        let mut message = self.factory.build(raw);
        message.set_metadata(METHOD_KEY, raw.method.clone())?;
        // Mutation rights pass to the pipeline at dispatch.
        message.reset_access_control();

        match handler.routing_mode() {
            RoutingMode::Inline => {
                debug!("routing inline: connection={connection}, target={}", raw.target);
                Ok(AdmissionOutcome::Completed(
                    handler.route_inline(message).await,
                ))
            }
            RoutingMode::Detached => {
                debug!(
                    "dispatching detached: connection={connection}, target={}",
                    raw.target
                );
                let completion = handle.completion();
                handler.route_detached(message, completion).await;
                match handle.suspend()? {
                    SuspendOutcome::Suspended => Ok(AdmissionOutcome::Suspended),
                    SuspendOutcome::AlreadyResumed => Ok(AdmissionOutcome::ResumePending),
                }
            }
        }
    }
}
