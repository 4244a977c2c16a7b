//! Subscription façade, worker and read path.

pub mod command_handlers;
pub mod query_handlers;
pub mod worker;
