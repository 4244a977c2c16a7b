//! PostgreSQL storage for the subscription command pipeline.
//!
//! [`pg_store::PgStore`] implements every storage port of `subs-core` over a
//! single connection pool.

pub mod pg_store;
mod rows;
pub mod schema;
