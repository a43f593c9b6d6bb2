//! Serializable summary of one drill run.

use serde::Serialize;

use crate::drill::Drill;
use crate::journal::{DrillEvent, Journal};

/// Final outcome of one drill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed,
}

/// What one drill run did, for machine consumption.
#[derive(Debug, Serialize)]
pub struct DrillReport {
    pub drill: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<DrillEvent>,
}

impl DrillReport {
    /// Snapshot the journal and describe the outcome.
    #[must_use]
    pub fn new(drill: Drill, outcome: &fdrill_core::Result<()>, journal: &Journal) -> Self {
        Self {
            drill: drill.name().to_string(),
            outcome: if outcome.is_ok() {
                Outcome::Completed
            } else {
                Outcome::Failed
            },
            error: outcome.as_ref().err().map(ToString::to_string),
            events: journal.events(),
        }
    }
}
