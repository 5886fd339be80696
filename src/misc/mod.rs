//! Numerical utilities
mod func;
pub(crate) mod reduce;

pub use func::*;
