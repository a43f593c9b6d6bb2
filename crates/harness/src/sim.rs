//! Simulated descriptor backend with scripted fault injection.

use std::collections::HashSet;
use std::io;

use fdrill_core::{Fd, PipeOps};
use parking_lot::Mutex;

use crate::journal::{DrillEvent, Journal};

/// In-memory implementation of [`PipeOps`] that simulates the descriptor
/// table. This provides deterministic behavior for drills and tests:
/// descriptors are minted sequentially, the open set is tracked for leak
/// accounting, every release attempt lands in the journal, and faults can
/// be scripted per descriptor or globally.
///
/// Releasing a descriptor that is not open is a contract violation; the
/// sim records it and refuses, which machine-checks the "exactly once"
/// rule instead of leaving it to inspection.
pub struct SimPipeOps {
    journal: Journal,
    state: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    next_fd: i32,
    open: HashSet<i32>,
    failing_closes: HashSet<i32>,
    fail_all_closes: bool,
    fail_next_open: bool,
}

impl SimPipeOps {
    #[must_use]
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Mutex::new(SimState {
                // Descriptors 0..=2 belong to stdio.
                next_fd: 3,
                ..SimState::default()
            }),
        }
    }

    /// Arm the next `open_pair` call to fail without minting anything.
    pub fn fail_next_open(&self) {
        self.state.lock().fail_next_open = true;
    }

    /// Arm every close of `fd` to fail. The attempt still consumes the
    /// descriptor, as for the real primitive.
    pub fn fail_close(&self, fd: Fd) {
        self.state.lock().failing_closes.insert(fd.as_raw());
    }

    /// Arm every close to fail.
    pub fn fail_all_closes(&self) {
        self.state.lock().fail_all_closes = true;
    }

    /// How many descriptors are currently open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }
}

impl PipeOps for SimPipeOps {
    fn open_pair(&self) -> io::Result<(Fd, Fd)> {
        let mut state = self.state.lock();
        if state.fail_next_open {
            state.fail_next_open = false;
            // EMFILE: the descriptor table is full.
            return Err(io::Error::from_raw_os_error(24));
        }
        let read = Fd::from_raw(state.next_fd);
        let write = Fd::from_raw(state.next_fd + 1);
        state.next_fd += 2;
        state.open.insert(read.as_raw());
        state.open.insert(write.as_raw());
        self.journal.record(DrillEvent::PairOpened {
            read: read.as_raw(),
            write: write.as_raw(),
        });
        Ok((read, write))
    }

    fn close(&self, fd: Fd) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.open.remove(&fd.as_raw()) {
            self.journal.record(DrillEvent::ContractViolation {
                detail: format!("close of descriptor {fd} which is not open"),
            });
            // EBADF: nothing to release.
            return Err(io::Error::from_raw_os_error(9));
        }
        let ok = !(state.fail_all_closes || state.failing_closes.contains(&fd.as_raw()));
        self.journal.record(DrillEvent::Closed {
            fd: fd.as_raw(),
            ok,
        });
        if ok {
            Ok(())
        } else {
            // EIO: the backend failed while releasing.
            Err(io::Error::from_raw_os_error(5))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> (SimPipeOps, Journal) {
        let journal = Journal::new();
        let sim = SimPipeOps::new(journal.clone());
        (sim, journal)
    }

    #[test]
    fn tracks_the_open_set() {
        let (sim, _journal) = sim();
        let (read, write) = sim.open_pair().unwrap();
        assert_eq!(sim.open_count(), 2);

        sim.close(read).unwrap();
        sim.close(write).unwrap();
        assert_eq!(sim.open_count(), 0);
    }

    #[test]
    fn double_close_is_a_contract_violation() {
        let (sim, journal) = sim();
        let (read, _write) = sim.open_pair().unwrap();

        sim.close(read).unwrap();
        let err = sim.close(read).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(9));

        let events = journal.events();
        assert!(matches!(
            events.last(),
            Some(DrillEvent::ContractViolation { .. })
        ));
    }

    #[test]
    fn scripted_close_failure_still_consumes_the_descriptor() {
        let (sim, journal) = sim();
        let (read, _write) = sim.open_pair().unwrap();
        sim.fail_close(read);

        assert!(sim.close(read).is_err());
        assert_eq!(sim.open_count(), 1);
        assert!(journal.events().contains(&DrillEvent::Closed {
            fd: read.as_raw(),
            ok: false
        }));
    }

    #[test]
    fn scripted_open_failure_mints_nothing() {
        let (sim, journal) = sim();
        sim.fail_next_open();

        let err = sim.open_pair().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(24));
        assert_eq!(sim.open_count(), 0);
        assert!(journal.events().is_empty());

        // Only the next call was armed.
        let (read, _write) = sim.open_pair().unwrap();
        assert_eq!(read.as_raw(), 3);
    }

    #[test]
    fn fail_all_closes_applies_to_every_descriptor() {
        let (sim, _journal) = sim();
        sim.fail_all_closes();
        let (read, write) = sim.open_pair().unwrap();

        assert!(sim.close(read).is_err());
        assert!(sim.close(write).is_err());
        assert_eq!(sim.open_count(), 0);
    }
}
