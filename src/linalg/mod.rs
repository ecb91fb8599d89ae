//! Linear algebra seams consumed by the Newton driver.
//!
//! The driver never looks inside a Jacobian or a linear solver. It needs
//! exactly three things:
//!
//! - a way to zero a Jacobian before reassembly ([`SetZero`])
//! - a residual norm that is identical on every cooperating process ([`Norm`])
//! - a linear solver that accepts a requested reduction and reports whether
//!   it got there ([`LinearSolver`])
//!
//! Dense reference implementations live in [`dense`], [`direct`] and
//! [`bicgstab`]. Distributed or sparse backends implement the same traits.

pub mod bicgstab;
pub mod dense;
pub mod direct;

pub use bicgstab::BiCgStab;
pub use dense::DenseMatrix;
pub use direct::DenseLu;

use crate::error::Result;

/// Storage that can be reset to zero before being refilled.
pub trait SetZero {
    /// Set every stored entry to zero, keeping the allocation.
    fn set_zero(&mut self);
}

/// Scalar norm of a residual-typed vector.
///
/// For distributed vectors the implementation must perform the global
/// reduction so that every process sees the same value.
pub trait Norm {
    fn norm(&self, v: &[f64]) -> f64;
}

/// Outcome of a single linear solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSolverResult {
    /// Whether the requested reduction was reached.
    pub converged: bool,
    /// Iterations spent (1 for direct solvers).
    pub iterations: usize,
    /// Achieved reduction of the linear residual.
    pub reduction: f64,
}

/// A linear solver for systems `A z = r` with Jacobian storage `M`.
pub trait LinearSolver<M>: Norm {
    /// Solve `a * z = r` to a relative residual of at most `reduction`.
    ///
    /// `z` holds the initial guess on entry (the driver passes zero).
    /// Non-convergence is reported through the returned result, not as an
    /// error; errors are reserved for malformed input.
    fn solve(&mut self, a: &M, z: &mut [f64], r: &[f64], reduction: f64) -> Result<LinearSolverResult>;
}

impl SetZero for Vec<f64> {
    fn set_zero(&mut self) {
        self.fill(0.0);
    }
}

/// Euclidean norm.
pub fn two_norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Inner product of two equally sized vectors.
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

/// `y += alpha * x`
pub fn axpy(y: &mut [f64], alpha: f64, x: &[f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_helpers() {
        let x = [3.0, 4.0];
        assert_relative_eq!(two_norm(&x), 5.0);
        assert_relative_eq!(dot(&x, &[1.0, -1.0]), -1.0);

        let mut y = vec![1.0, 1.0];
        axpy(&mut y, -0.5, &x);
        assert_relative_eq!(y[0], -0.5);
        assert_relative_eq!(y[1], -1.0);

        y.set_zero();
        assert_eq!(y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_norm_propagates_non_finite() {
        assert!(two_norm(&[1.0, f64::NAN]).is_nan());
        assert!(two_norm(&[f64::INFINITY, 0.0]).is_infinite());
    }
}
