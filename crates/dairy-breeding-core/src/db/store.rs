//! [`RecordStore`] implementation for the SQLite database.

use super::{Database, DbError};
use crate::models::{BreedingCycle, Cow, CyclePatch, MilkingGroupState, NewCycle};
use crate::store::RecordStore;

impl RecordStore for Database {
    type Error = DbError;

    fn get_cow(&self, cow_id: &str) -> Result<Option<Cow>, DbError> {
        Database::get_cow(self, cow_id)
    }

    fn list_cows(&self) -> Result<Vec<Cow>, DbError> {
        Database::list_cows(self)
    }

    fn get_cycle(&self, cycle_id: &str) -> Result<Option<BreedingCycle>, DbError> {
        Database::get_cycle(self, cycle_id)
    }

    fn list_cycles_for_cow(&self, cow_id: &str) -> Result<Vec<BreedingCycle>, DbError> {
        Database::list_cycles_for_cow(self, cow_id)
    }

    fn list_all_cycles(&self) -> Result<Vec<BreedingCycle>, DbError> {
        Database::list_all_cycles(self)
    }

    /// Guard re-check and insert happen in one transaction.
    fn create_cycle(&self, new_cycle: &NewCycle) -> Result<BreedingCycle, DbError> {
        Database::create_cycle(self, new_cycle)
    }

    fn update_cycle(&self, cycle_id: &str, patch: &CyclePatch) -> Result<BreedingCycle, DbError> {
        Database::update_cycle(self, cycle_id, patch)
    }

    fn update_cow_flags(&self, cow_id: &str, state: &MilkingGroupState) -> Result<Cow, DbError> {
        Database::update_cow_flags(self, cow_id, state)
    }
}
