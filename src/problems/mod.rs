//! Reference model problems.
//!
//! Small but realistic systems used by the CLI and the tests:
//!
//! - [`LinearSystem`]: `A u - b`, solved by one Newton step.
//! - [`Bratu1d`]: the finite-difference Bratu equation `-u'' = lambda e^u`.
//! - [`DiodeClipper`]: a resistor ladder loaded by Shockley diodes, whose
//!   residual overflows when a step overshoots.

mod bratu;
mod diode;
mod linear;

pub use bratu::{Bratu1d, BRATU_CRITICAL_LAMBDA};
pub use diode::{DiodeClipper, DiodeParams, THERMAL_VOLTAGE};
pub use linear::LinearSystem;
