//! Domain models for the dairy breeding system.

mod config;
mod cow;
mod cycle;
mod summary;

pub use config::*;
pub use cow::*;
pub use cycle::*;
pub use summary::*;
