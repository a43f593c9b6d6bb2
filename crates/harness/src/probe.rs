//! RAII value with an observable destructor.

use crate::journal::{DrillEvent, Journal};

/// Records its own destruction, pinning down where in the teardown order
/// its scope was unwound.
///
/// Drills place one of these next to a held handle before faulting; the
/// journal then shows whether the probe dropped before the handle released
/// its descriptor.
pub struct DropProbe {
    label: String,
    journal: Journal,
}

impl DropProbe {
    #[must_use]
    pub fn new(label: impl Into<String>, journal: Journal) -> Self {
        Self {
            label: label.into(),
            journal,
        }
    }
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        tracing::debug!(label = %self.label, "probe dropped");
        self.journal.record(DrillEvent::ProbeDropped {
            label: std::mem::take(&mut self.label),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_on_scope_exit() {
        let journal = Journal::new();
        {
            let _probe = DropProbe::new("scoped", journal.clone());
            assert!(journal.events().is_empty());
        }
        assert_eq!(
            journal.events(),
            vec![DrillEvent::ProbeDropped {
                label: "scoped".to_string()
            }]
        );
    }

    #[test]
    fn records_during_panic_unwinding() {
        let journal = Journal::new();
        let probe_journal = journal.clone();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _probe = DropProbe::new("unwound", probe_journal);
            panic!("boom");
        }));

        assert!(outcome.is_err());
        assert_eq!(
            journal.events(),
            vec![DrillEvent::ProbeDropped {
                label: "unwound".to_string()
            }]
        );
    }
}
