//! fets-cli library interface
//!
//! Orchestrates the FeTS brain-tumor segmentation workflow: per-subject
//! modality validation, per-architecture inference dispatch, label fusion,
//! and the final federated training/collaborator task. All heavy computation
//! happens in external processes; this crate decides which process to run,
//! with which arguments, in which order.
//!
//! Exposed as a library so the planners can be integration-tested against a
//! mock process runner; the binary in `main.rs` wires them to the real one.

pub mod dispatch;
pub mod fusion;
pub mod modalities;
pub mod planner;
pub mod report;
pub mod types;
pub mod weights;

pub use crate::planner::{RunPlanner, RunRequest};
pub use crate::report::RunReport;
