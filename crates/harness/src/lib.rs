//! Failure-injection drills for the `fdrill` handle contract.
//!
//! This crate is the scenario driver: it runs named drills against a
//! descriptor backend and records everything observable about them.
//!
//! ## Key Components
//!
//! - **`drill`**: The `Harness` and the drills themselves (`fault`,
//!   `descent`, `smoke`), which move handles across call frames and
//!   inject failures at chosen points.
//! - **`sim`**: `SimPipeOps`, a deterministic in-memory backend with
//!   scripted fault injection and contract-violation detection.
//! - **`journal`**: the ordered `DrillEvent` record shared by the backend,
//!   the probes, and the drills.
//! - **`probe`**: `DropProbe`, the RAII value whose destructor is the
//!   observable marker in the unwinding order.
//! - **`report`**: the serializable `DrillReport` summary.

pub mod drill;
pub mod journal;
pub mod probe;
pub mod report;
pub mod sim;

pub use self::{
    drill::{Drill, FaultKind, Harness},
    journal::{DrillEvent, Journal},
    probe::DropProbe,
    report::{DrillReport, Outcome},
    sim::SimPipeOps,
};
