//! Domain types for allocsim

pub mod allocation;
pub mod event;
pub mod order;
pub mod universe;

pub use allocation::{Allocation, AllocationError, WEIGHT_SUM_TOLERANCE};
pub use event::{EventType, SimulationEvent};
pub use order::{Order, Transaction};
pub use universe::StaticUniverse;

/// UTC instant with second precision used across the replay.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Symbol type alias
pub type Symbol = String;
