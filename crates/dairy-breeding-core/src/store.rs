//! Record-store interface consumed by the engine.
//!
//! The engine never persists anything itself. Anything that can list and
//! write cows and cycles can back the guard, the lifecycle operations and
//! the milking workflow. [`crate::db::Database`] is the bundled SQLite
//! implementation.

use crate::models::{BreedingCycle, Cow, CyclePatch, MilkingGroupState, NewCycle};

/// Storage operations the engine relies on.
///
/// `create_cycle` is not required to re-check the single-open-cycle rule.
/// Implementations that can do it atomically (as the SQLite store does)
/// should, since [`crate::engine::CycleGuard::open_cycle`] is otherwise a
/// check-then-act sequence.
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get_cow(&self, cow_id: &str) -> Result<Option<Cow>, Self::Error>;

    fn list_cows(&self) -> Result<Vec<Cow>, Self::Error>;

    fn get_cycle(&self, cycle_id: &str) -> Result<Option<BreedingCycle>, Self::Error>;

    fn list_cycles_for_cow(&self, cow_id: &str) -> Result<Vec<BreedingCycle>, Self::Error>;

    fn list_all_cycles(&self) -> Result<Vec<BreedingCycle>, Self::Error>;

    /// Persist a new cycle, assigning its ID and service number.
    fn create_cycle(&self, new_cycle: &NewCycle) -> Result<BreedingCycle, Self::Error>;

    fn update_cycle(&self, cycle_id: &str, patch: &CyclePatch) -> Result<BreedingCycle, Self::Error>;

    fn update_cow_flags(&self, cow_id: &str, state: &MilkingGroupState) -> Result<Cow, Self::Error>;
}
