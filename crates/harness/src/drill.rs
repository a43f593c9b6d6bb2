//! The drills: scripted scenarios that exercise handle ownership under
//! failure.
//!
//! Each drill moves handles across call frames and injects a failure at a
//! chosen point; the journal and the returned error together show that
//! every descriptor was released exactly once and that the original
//! failure crossed the boundary unmasked.

use std::fmt;
use std::sync::Arc;

use fdrill_core::{Error, PipeOps, PipePair, Result, ScopedFd};

use crate::journal::{DrillEvent, Journal};
use crate::probe::DropProbe;

/// Named scenario the harness can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drill {
    /// Open a pair, close one end ordinarily, fault while holding the
    /// other.
    Fault,
    /// Recurse with an owned handle per frame before faulting at the
    /// bottom.
    Descent,
    /// Open a pair and close both ends, completing without failure.
    Smoke,
}

impl Drill {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Drill::Fault => "fault",
            Drill::Descent => "descent",
            Drill::Smoke => "smoke",
        }
    }
}

impl fmt::Display for Drill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flavour of the deliberately injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Raise the terminal operation failure directly.
    Direct,
    /// Raise a backend condition that the drill boundary must re-signal.
    External,
}

/// Runs drills against one backend and journals what they observably do.
pub struct Harness {
    ops: Arc<dyn PipeOps>,
    journal: Journal,
}

impl Harness {
    #[must_use]
    pub fn new(ops: Arc<dyn PipeOps>, journal: Journal) -> Self {
        Self { ops, journal }
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Run one drill to completion.
    ///
    /// This is the boundary where exactly one failure taxonomy is allowed
    /// through: a backend condition raised mid-drill is re-signalled here
    /// as the terminal operation failure.
    pub fn run(&self, drill: Drill, fault: FaultKind) -> Result<()> {
        tracing::info!(%drill, "running drill");
        let outcome = match drill {
            Drill::Fault => self.fault_drill(fault),
            Drill::Descent => self.descent_drill(fault),
            Drill::Smoke => self.smoke_drill(),
        };
        outcome.map_err(|error| self.reframe(error))
    }

    /// The flagship scenario. Stage 1 opens the pair; stage 2 moves the
    /// write end into an ordinary close; stage 3 moves the read end into
    /// the faulting helper. The two ends travel different release paths:
    /// the write end through `close()`, the read end through drop while
    /// the injected failure is already propagating.
    fn fault_drill(&self, fault: FaultKind) -> Result<()> {
        let PipePair { read, write } = self.open_pair()?;
        close_end(write)?;
        fault_end(read, fault, &self.journal)
    }

    fn descent_drill(&self, fault: FaultKind) -> Result<()> {
        let PipePair { read, write } = self.open_pair()?;
        close_end(write)?;
        self.descend(read, true, fault)
    }

    /// Owns `held` for the duration of the frame. With `deeper` set it
    /// opens a fresh pair, closes one end ordinarily, and recurses
    /// carrying the other end; otherwise it faults immediately, so the
    /// failure unwinds through every frame that still owns a live handle.
    fn descend(&self, held: ScopedFd, deeper: bool, fault: FaultKind) -> Result<()> {
        tracing::debug!(fd = ?held.fd(), deeper, "descending");
        if !deeper {
            return Err(inject_fault("descend", fault, &self.journal));
        }
        let PipePair { read, write } = self.open_pair()?;
        close_end(write)?;
        self.descend(read, false, fault)
        // `held` drops here while the bottom failure propagates.
    }

    fn smoke_drill(&self) -> Result<()> {
        let PipePair { read, write } = self.open_pair()?;
        close_end(write)?;
        close_end(read)?;
        Ok(())
    }

    fn open_pair(&self) -> Result<PipePair> {
        let pair = PipePair::open(Arc::clone(&self.ops))?;
        tracing::debug!(read = ?pair.read.fd(), write = ?pair.write.fd(), "pipe opened");
        Ok(pair)
    }

    fn reframe(&self, error: Error) -> Error {
        match error {
            Error::External { message } => {
                tracing::debug!(%message, "re-signalling backend condition as operation failure");
                self.journal.record(DrillEvent::Converted {
                    message: message.clone(),
                });
                Error::OperationFailed {
                    operation: message,
                    fd: None,
                    source: None,
                }
            }
            other => other,
        }
    }
}

/// Moves a handle in and closes it, propagating the backend's verdict.
fn close_end(mut end: ScopedFd) -> Result<()> {
    end.close()
}

/// Raises the injected failure while still holding an open handle and
/// while a scope-local probe is alive. On the error return the probe
/// drops first, then `held` drops and releases its descriptor, both while
/// the original failure is propagating. Locals drop before parameters,
/// which is what fixes that order.
fn fault_end(held: ScopedFd, fault: FaultKind, journal: &Journal) -> Result<()> {
    let _probe = DropProbe::new("fault-end", journal.clone());
    tracing::debug!(fd = ?held.fd(), "faulting while the handle is still open");
    Err(inject_fault("fault-end", fault, journal))
}

/// Record and build the deliberate failure for `operation`.
fn inject_fault(operation: &str, fault: FaultKind, journal: &Journal) -> Error {
    journal.record(DrillEvent::FaultInjected {
        operation: operation.to_string(),
    });
    match fault {
        FaultKind::Direct => {
            tracing::debug!(%operation, "injecting operation failure");
            Error::fault(operation)
        }
        FaultKind::External => {
            tracing::debug!(%operation, "injecting backend condition");
            Error::external(format!("simulated backend condition in {operation}"))
        }
    }
}
