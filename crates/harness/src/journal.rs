//! Ordered record of what a drill observably did.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// One observable step of a drill run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DrillEvent {
    /// The backend minted a connected pair.
    PairOpened { read: i32, write: i32 },
    /// A release attempt reached the backend, with its verdict.
    Closed { fd: i32, ok: bool },
    /// A scope-local probe observed its own destruction.
    ProbeDropped { label: String },
    /// A drill step deliberately raised a failure.
    FaultInjected { operation: String },
    /// A backend condition was re-signalled as the terminal failure.
    Converted { message: String },
    /// The backend refused an operation that breaks the descriptor
    /// contract, such as releasing the same descriptor twice.
    ContractViolation { detail: String },
}

/// Ordered, shareable record of [`DrillEvent`]s.
///
/// Clones share the same underlying record, so the backend, the probes,
/// and the drill itself can all append to one sequence.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<DrillEvent>>>,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: DrillEvent) {
        self.events.lock().push(event);
    }

    /// Snapshot of everything recorded so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<DrillEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let journal = Journal::new();
        journal.record(DrillEvent::PairOpened { read: 3, write: 4 });
        journal.record(DrillEvent::Closed { fd: 4, ok: true });

        assert_eq!(
            journal.events(),
            vec![
                DrillEvent::PairOpened { read: 3, write: 4 },
                DrillEvent::Closed { fd: 4, ok: true },
            ]
        );
    }

    #[test]
    fn clones_share_the_record() {
        let journal = Journal::new();
        let observer = journal.clone();
        journal.record(DrillEvent::FaultInjected {
            operation: "fault-end".to_string(),
        });
        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let event = DrillEvent::Closed { fd: 4, ok: false };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "closed");
        assert_eq!(json["fd"], 4);
        assert_eq!(json["ok"], false);
    }
}
