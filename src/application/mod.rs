//! Application layer containing the job/payment orchestration.
//!
//! The `Orchestrator` owns the job store and the payment session registry.
//! Monitoring sessions publish settlements on a `tokio` channel which the
//! dispatcher drains, running each job's transition on its own task.

pub mod gatekeeper;
pub mod lanes;
pub mod orchestrator;
pub mod sessions;
