//! Per-pass response dispatching on connection entry and re-entry.

use log::debug;

use super::admission::{AdmissionOutcome, RequestAdmission};
use crate::{
    error::{ProcessingFailure, ServiceError},
    message::RawRequest,
    session::ConnectionId,
    suspension::SuspensionHandle,
    writer::ResponseWriter,
};

/// What the driver's outer loop should do after one service pass.
#[derive(Debug)]
pub(crate) enum ServicePass {
    /// The response was written; the request is complete.
    Complete,
    /// The exchange is suspended (or the re-entry was spurious); park until a
    /// completion schedules re-entry.
    AwaitResume,
    /// A result is already stored; run another pass immediately.
    ResumePending,
}

/// Drives one pass of the connection's service logic.
///
/// The first pass for a request finds the exchange in `Initial` and performs
/// admission. A pass after a resume consumes the stored result. A pass while
/// still suspended — the connection subsystem may re-enter spuriously — is a
/// deliberate no-op.
pub(crate) struct ResponseDispatcher {
    admission: RequestAdmission,
}

impl ResponseDispatcher {
    pub(crate) fn new(admission: RequestAdmission) -> Self { Self { admission } }

    pub(crate) async fn service<W: ResponseWriter>(
        &self,
        connection: ConnectionId,
        raw: &RawRequest,
        handle: &SuspensionHandle,
        writer: &mut W,
    ) -> Result<ServicePass, ServiceError> {
        if handle.is_initial() {
            return match self.admission.admit(connection, raw, handle).await? {
                AdmissionOutcome::Completed(Ok(payload)) => {
                    writer.write(payload).await?;
                    Ok(ServicePass::Complete)
                }
                AdmissionOutcome::Completed(Err(failure)) => Err(Self::release(failure)),
                AdmissionOutcome::Suspended => Ok(ServicePass::AwaitResume),
                AdmissionOutcome::ResumePending => Ok(ServicePass::ResumePending),
            };
        }

        if handle.is_resumed() {
            // Consumption runs under the same synchronizer that guards
            // resume, so a racing completion on a reused connection cannot
            // interleave with the read.
            return match handle.consume()? {
                Ok(payload) => {
                    debug!("resumed with response: connection={connection}");
                    writer.write(payload).await?;
                    Ok(ServicePass::Complete)
                }
                Err(failure) => Err(Self::release(failure)),
            };
        }

        // Re-entered while still suspended: no completion has fired yet.
        debug!("spurious re-entry while suspended: connection={connection}");
        Ok(ServicePass::AwaitResume)
    }

    /// Hand a pipeline failure back to the connection side.
    ///
    /// The embedded message, if any, crossed from a pipeline thread; its
    /// access marker is reset here, before the failure becomes observable to
    /// connection-side code.
    fn release(failure: ProcessingFailure) -> ServiceError {
        if let Some(message) = failure.message() {
            message.reset_access_control();
        }
        ServiceError::Processing(failure)
    }
}
