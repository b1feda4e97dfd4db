//! Domain types and the ports the application layer depends on.

pub mod job;
pub mod payment;
pub mod ports;
