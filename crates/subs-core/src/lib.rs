//! Subs Core: shared domain abstractions.
//!
//! This crate defines the entity rows, queued message types, repository
//! traits and the table-backed bus that the client and subscription contexts
//! build on. It contains no database code.

#[macro_use]
mod macros;

pub mod bus;
pub mod cancel;
pub mod client;
pub mod clock;
pub mod command;
pub mod consumer;
pub mod error;
pub mod history;
pub mod message;
pub mod repository;
pub mod rng;
pub mod status;
pub mod subscription;
