//! Utility types shared across the library.
//!
//! - [`Error`] / [`Result`] - error handling for file-level operations
//! - [`Color`], [`Point3`], [`UnitVector3`] - validated value primitives
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
