//! Shared test doubles for the subscription command pipeline.

mod clock;
mod rng;
mod store;

pub use clock::{FixedClock, ManualClock};
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingStore, HistoryTable, InMemoryStore, QueueTable};
