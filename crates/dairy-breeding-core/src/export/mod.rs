//! Attention list export.

mod attention;

pub use attention::*;
