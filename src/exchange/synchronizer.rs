//! The per-connection lock serializing suspend against resume.

use std::sync::{Mutex, PoisonError};

use log::debug;

use super::{ExchangeState, PipelineResult, ProtocolViolation};

/// Outcome of a suspend attempt, checked by the connection framework's outer
/// loop instead of a control-flow signal.
#[derive(Debug, PartialEq, Eq)]
pub enum SuspendOutcome {
    /// The exchange is now suspended; park until a completion re-enters it.
    Suspended,
    /// A completion ran ahead of the suspend; the stored result is ready and
    /// the connection task should re-dispatch immediately.
    AlreadyResumed,
}

/// Effect of a successful resume, telling the completion path whether the
/// connection task is parked and needs waking.
#[derive(Debug, PartialEq, Eq)]
pub enum ResumeEffect {
    /// Resume won the race with `suspend`; the connection task will observe
    /// the stored result on its own suspend path. No wakeup required.
    RanAhead,
    /// The exchange was suspended; the connection task must be re-entered.
    NeedsReentry,
}

/// Request cycle with its stored result, guarded by the synchronizer mutex.
///
/// The result only exists in the `Resumed` state, so "result set twice" and
/// "result consumed twice" are unrepresentable.
#[derive(Debug)]
enum Cycle {
    Initial,
    Suspended,
    Resumed(PipelineResult),
    Consumed,
}

impl Cycle {
    fn state(&self) -> ExchangeState {
        match self {
            Self::Initial => ExchangeState::Initial,
            Self::Suspended => ExchangeState::Suspended,
            Self::Resumed(_) => ExchangeState::Resumed,
            Self::Consumed => ExchangeState::Consumed,
        }
    }
}

#[derive(Debug)]
struct Cell {
    cycle: Cycle,
    generation: u64,
}

/// Mutex scoped to one connection, serializing the observe-and-suspend
/// critical section against the observe-and-resume one.
///
/// All exchanges reused on a connection share this synchronizer. Critical
/// sections are short and never held across an await, so the completion path
/// may run on a plain worker thread or synchronously on the dispatching
/// thread without deadlocking.
#[derive(Debug)]
pub struct ExchangeSynchronizer {
    cell: Mutex<Cell>,
}

impl Default for ExchangeSynchronizer {
    fn default() -> Self { Self::new() }
}

impl ExchangeSynchronizer {
    /// Create a synchronizer with a fresh exchange in the `Initial` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(Cell {
                cycle: Cycle::Initial,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Observable state of the current exchange.
    #[must_use]
    pub fn state(&self) -> ExchangeState { self.lock().cycle.state() }

    /// Generation of the request currently in flight. Captured by completion
    /// tokens at dispatch.
    #[must_use]
    pub fn generation(&self) -> u64 { self.lock().generation }

    /// Detach the current request pending a completion.
    ///
    /// Valid only from `Initial`. Observing `Resumed` here is not a fault: it
    /// means the pipeline completed before the connection task reached the
    /// suspend point, and the caller re-dispatches immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::SuspendFrom`] when called while already
    /// suspended or consumed.
    pub fn suspend(&self) -> Result<SuspendOutcome, ProtocolViolation> {
        let mut cell = self.lock();
        match cell.cycle {
            Cycle::Initial => {
                cell.cycle = Cycle::Suspended;
                Ok(SuspendOutcome::Suspended)
            }
            Cycle::Resumed(_) => {
                debug!("completion ran ahead of suspend; re-dispatching immediately");
                Ok(SuspendOutcome::AlreadyResumed)
            }
            ref cycle => Err(ProtocolViolation::SuspendFrom(cycle.state())),
        }
    }

    /// Store a completion result and transition to `Resumed`.
    ///
    /// `generation` must match the generation captured when the completion
    /// token was minted; completions from an earlier request on a reused
    /// connection are rejected. A resume arriving while still `Initial` is
    /// the legitimate completion-ahead-of-suspend race and is recorded, not
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::StaleCompletion`] on a generation
    /// mismatch and [`ProtocolViolation::ResumeFrom`] when the exchange has
    /// already resumed or been consumed.
    pub fn resume(
        &self,
        generation: u64,
        result: PipelineResult,
    ) -> Result<ResumeEffect, ProtocolViolation> {
        let mut cell = self.lock();
        if cell.generation != generation {
            return Err(ProtocolViolation::StaleCompletion {
                expected: cell.generation,
                actual: generation,
            });
        }
        match cell.cycle {
            Cycle::Initial => {
                cell.cycle = Cycle::Resumed(result);
                Ok(ResumeEffect::RanAhead)
            }
            Cycle::Suspended => {
                cell.cycle = Cycle::Resumed(result);
                Ok(ResumeEffect::NeedsReentry)
            }
            ref cycle => Err(ProtocolViolation::ResumeFrom(cycle.state())),
        }
    }

    /// Take the stored result, transitioning `Resumed` → `Consumed`.
    ///
    /// The re-entry path calls this under the same lock that guards resume,
    /// because the connection subsystem may deliver a re-entry concurrently
    /// with a racing completion on a reused connection.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::ConsumeFrom`] outside the `Resumed`
    /// state.
    pub fn consume(&self) -> Result<PipelineResult, ProtocolViolation> {
        let mut cell = self.lock();
        match std::mem::replace(&mut cell.cycle, Cycle::Consumed) {
            Cycle::Resumed(result) => Ok(result),
            cycle => {
                let state = cycle.state();
                cell.cycle = cycle;
                Err(ProtocolViolation::ConsumeFrom(state))
            }
        }
    }

    /// Reset the exchange to `Initial` for the next request on this
    /// connection, dropping any stored result and invalidating outstanding
    /// completion tokens.
    pub fn reset(&self) {
        let mut cell = self.lock();
        cell.cycle = Cycle::Initial;
        cell.generation += 1;
    }
}
