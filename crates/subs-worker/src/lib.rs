//! Subs worker host.
//!
//! Wires the storage, bus and history log into both contexts and drives
//! their workers on a fixed duty cycle until cancelled.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod telemetry;
