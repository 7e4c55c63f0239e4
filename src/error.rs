//! Failure values produced by the pipeline and the per-request error
//! envelope.
//!
//! `ProcessingFailure` is the failure a backend pipeline reports through its
//! completion callback. It may embed the in-flight [`Message`] for
//! exception-handling on the connection side; the response dispatcher resets
//! the message's access marker before the failure becomes observable there.
//! `ServiceError` is what a single request ultimately propagates to the
//! surrounding connection framework.

use std::{io, time::Duration};

use thiserror::Error;

use crate::{exchange::ProtocolViolation, message::Message, ownership::AccessViolation};

/// Failure reported by the backend pipeline for one request.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct ProcessingFailure {
    reason: String,
    message: Option<Message>,
}

impl ProcessingFailure {
    /// Create a failure with a human-readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: None,
        }
    }

    /// Create a failure embedding the in-flight message for diagnostics.
    #[must_use]
    pub fn with_message(reason: impl Into<String>, message: Message) -> Self {
        Self {
            reason: reason.into(),
            message: Some(message),
        }
    }

    /// The reason reported by the pipeline.
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }

    /// Borrow the embedded message, if the pipeline attached one.
    #[must_use]
    pub fn message(&self) -> Option<&Message> { self.message.as_ref() }

    /// Mutably borrow the embedded message.
    pub fn message_mut(&mut self) -> Option<&mut Message> { self.message.as_mut() }
}

/// Errors a single request may propagate to the connection framework.
///
/// Exactly one of a written response or one of these errors results per
/// request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend pipeline reported a failure.
    #[error("backend pipeline reported a failure")]
    Processing(#[from] ProcessingFailure),
    /// Writing the outbound response failed. Not retried by this layer.
    #[error("failed to write response")]
    Io(#[from] io::Error),
    /// No handler is registered for the request target.
    #[error("no handler registered for target {0:?}")]
    UnknownTarget(String),
    /// A suspend or resume transition was attempted from an invalid state.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    /// A message was mutated by a thread that does not hold its marker.
    #[error(transparent)]
    Access(#[from] AccessViolation),
    /// The configured resume deadline elapsed while suspended.
    #[error("no completion arrived within {0:?}")]
    ResumeTimeout(Duration),
    /// The connection was shut down while the request was suspended.
    #[error("connection shut down while request was suspended")]
    Shutdown,
}
