//! # Damped Newton
//!
//! A globally damped, inexact Newton solver for discretized nonlinear
//! systems `F(u) = 0`.
//!
//! This library provides:
//! - A Newton driver with pluggable termination, step preparation and
//!   line search policies
//! - Jacobian reuse with a reassembly threshold and a retry on a fresh
//!   Jacobian when the line search fails
//! - Inexact linear solves with an adaptive tolerance
//! - Dense reference linear solvers (LU, Jacobi-preconditioned BiCGSTAB)
//! - Model problems (linear system, Bratu equation, diode clipper)
//!
//! ## Architecture
//!
//! - [`problem`] - The residual/Jacobian provider trait
//! - [`linalg`] - Linear solver interface and dense implementations
//! - [`newton`] - Driver, policies, configuration and progress events
//! - [`problems`] - Reference model problems
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! newton bratu --size 100 --lambda 3.0 --verbosity 2
//! newton diode --stages 4 --v-in 12 --config solver.toml
//! ```
//!
//! ### Library
//!
//! ```
//! use damped_newton::linalg::DenseLu;
//! use damped_newton::problems::Bratu1d;
//! use damped_newton::{Newton, NewtonConfig};
//!
//! let problem = Bratu1d::new(50, 1.0).unwrap();
//! let config = NewtonConfig::new().with_verbosity(0);
//! let mut newton = Newton::with_config(problem, DenseLu::new(), config);
//! let (u, result) = newton.solve(vec![0.0; 50]).unwrap();
//! assert!(result.reduction() < 1e-8);
//! assert!(u[25] > 0.1);
//! ```
//!
//! ## Iteration
//!
//! Each Newton step:
//!
//! 1. Reassemble the Jacobian if the defect dropped too little
//! 2. Solve `J z = F(u)` to a tolerance derived from the last reduction
//! 3. Backtrack `u - lambda z` until the defect decreases sufficiently
//!
//! Progress is reported as [`newton::SolverEvent`]s; the default observer
//! writes them through `tracing`.

pub mod error;
pub mod linalg;
pub mod newton;
pub mod problem;
pub mod problems;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use error::{NewtonError, Result};
pub use newton::{LineSearchStrategy, Newton, NewtonConfig, NewtonResult};
pub use problem::{FnProblem, NonlinearProblem};
