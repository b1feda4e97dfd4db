//! Adapters implementing the domain ports.

pub mod in_memory;
pub mod masumi;
pub mod simulated;
