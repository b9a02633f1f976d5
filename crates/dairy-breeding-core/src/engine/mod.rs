//! Breeding-cycle state and priority engine.
//!
//! Pipeline: cycles + cows → [`build_summaries`] → [`classify_and_sort`]
//!
//! [`CycleGuard`] runs out-of-band against the record store before a new
//! cycle is created. Everything except the guard, the lifecycle operations
//! and the milking workflow is pure and takes `today` explicitly.

mod due_dates;
mod guard;
mod lifecycle;
mod milking;
mod priority;
mod status;
mod summary;

pub use due_dates::*;
pub use guard::*;
pub use lifecycle::*;
pub use milking::*;
pub use priority::*;
pub use status::*;
pub use summary::*;

use thiserror::Error;

/// Engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    /// Wrap a record-store failure.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EngineError::Store(Box::new(err))
    }
}

impl From<crate::models::ParseEnumError> for EngineError {
    fn from(e: crate::models::ParseEnumError) -> Self {
        EngineError::Validation(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
