//! Subs: Client lifecycle context.
//!
//! Validates and submits client commands to the client queue, and
//! reconciles queued commands against the `clients` table.

pub mod application;
pub mod domain;
