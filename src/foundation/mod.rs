//! Frame/time primitives, the error taxonomy and fixed-point pixel math.

pub mod core;
pub mod error;
pub(crate) mod math;
