//! Per-connection exchange state machine and its synchronizer.
//!
//! An exchange tracks one in-flight request across the suspend/resume cycle:
//! `Initial` → `Suspended` → `Resumed` → `Consumed`, then an explicit reset
//! back to `Initial` before the connection reuses it for the next request.
//! Every observation and transition runs under a single per-connection mutex
//! shared by the dispatch path and the completion path, so a pipeline that
//! completes before the connection task suspends can never lose its result:
//! the early resume is recorded and the suspend path observes it.
//!
//! A generation counter, bumped on every reset, ties completions to the
//! request they were minted for. A completion that outlives its request on a
//! reused connection fails the generation check instead of resuming the next
//! request.

mod synchronizer;

use thiserror::Error;

pub use self::synchronizer::{ExchangeSynchronizer, ResumeEffect, SuspendOutcome};
use crate::error::ProcessingFailure;

/// Result stored on the exchange by the completion path.
pub type PipelineResult = Result<bytes::Bytes, ProcessingFailure>;

/// Observable state of an exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeState {
    /// No request dispatched yet, or the exchange was reset for reuse.
    Initial,
    /// The connection task detached pending a completion.
    Suspended,
    /// A completion stored its result; the connection task must consume it.
    Resumed,
    /// The stored result was consumed; awaiting reset before reuse.
    Consumed,
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::Suspended => "suspended",
            Self::Resumed => "resumed",
            Self::Consumed => "consumed",
        })
    }
}

/// Fatal misuse of the exchange protocol by the pipeline or the framework.
///
/// Violations are rejected without mutating the exchange, so a misbehaving
/// completion cannot corrupt the state of the request currently in flight.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// `suspend` was called outside the `Initial` state.
    #[error("suspend attempted while exchange was {0}")]
    SuspendFrom(ExchangeState),
    /// `resume` was called after the exchange already resumed or consumed.
    #[error("resume attempted while exchange was {0}")]
    ResumeFrom(ExchangeState),
    /// The stored result was consumed outside the `Resumed` state.
    #[error("result consumed while exchange was {0}")]
    ConsumeFrom(ExchangeState),
    /// A completion carried a token minted for an earlier request.
    #[error("completion for a stale exchange (expected generation {expected}, got {actual})")]
    StaleCompletion {
        /// Generation of the request currently in flight.
        expected: u64,
        /// Generation captured when the completion token was minted.
        actual: u64,
    },
}
