//! BiCGSTAB iterative solver with Jacobi preconditioning.
//!
//! Honours the requested reduction exactly: iteration stops as soon as
//! `||r - A z|| <= reduction * ||r - A z0||`, so the Newton driver's
//! adaptive tolerance translates directly into saved iterations.

use tracing::trace;

use crate::error::{NewtonError, Result};

use super::{axpy, dot, two_norm, DenseMatrix, LinearSolver, LinearSolverResult, Norm};

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 500;

/// Breakdown threshold for the BiCG recurrences.
const BREAKDOWN: f64 = 1e-300;

/// Jacobi-preconditioned BiCGSTAB for dense nonsymmetric systems.
#[derive(Debug, Clone)]
pub struct BiCgStab {
    /// Maximum iterations per solve
    pub max_iterations: usize,
}

impl Default for BiCgStab {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl BiCgStab {
    /// Create a solver with the given iteration budget.
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Norm for BiCgStab {
    fn norm(&self, v: &[f64]) -> f64 {
        two_norm(v)
    }
}

impl LinearSolver<DenseMatrix> for BiCgStab {
    fn solve(&mut self, a: &DenseMatrix, z: &mut [f64], b: &[f64], reduction: f64) -> Result<LinearSolverResult> {
        let n = a.size();
        if b.len() != n {
            return Err(NewtonError::dimension_mismatch(n, b.len()));
        }
        if z.len() != n {
            return Err(NewtonError::dimension_mismatch(n, z.len()));
        }

        // Jacobi preconditioner, identity where the diagonal vanishes
        let inv_diag: Vec<f64> = (0..n)
            .map(|i| {
                let d = a.get(i, i);
                if d != 0.0 {
                    1.0 / d
                } else {
                    1.0
                }
            })
            .collect();
        let precondition = |v: &[f64], out: &mut [f64]| {
            for ((o, vi), di) in out.iter_mut().zip(v).zip(&inv_diag) {
                *o = vi * di;
            }
        };

        let mut r = vec![0.0; n];
        a.residual(z, b, &mut r);
        let r0_norm = two_norm(&r);
        if r0_norm == 0.0 {
            return Ok(LinearSolverResult {
                converged: true,
                iterations: 0,
                reduction: 0.0,
            });
        }
        let target = reduction * r0_norm;

        let r_hat = r.clone();
        let mut p = vec![0.0; n];
        let mut v = vec![0.0; n];
        let mut p_hat = vec![0.0; n];
        let mut s_hat = vec![0.0; n];
        let mut t = vec![0.0; n];
        let (mut rho, mut alpha, mut omega): (f64, f64, f64) = (1.0, 1.0, 1.0);
        let mut res_norm = r0_norm;

        for iter in 1..=self.max_iterations {
            let rho_next = dot(&r_hat, &r);
            if rho_next.abs() < BREAKDOWN || omega.abs() < BREAKDOWN {
                trace!(iter, "bicgstab breakdown");
                return Ok(LinearSolverResult {
                    converged: false,
                    iterations: iter,
                    reduction: res_norm / r0_norm,
                });
            }

            let beta = (rho_next / rho) * (alpha / omega);
            rho = rho_next;
            for i in 0..n {
                p[i] = r[i] + beta * (p[i] - omega * v[i]);
            }

            precondition(&p, &mut p_hat);
            a.mul_vec(&p_hat, &mut v);
            let denom = dot(&r_hat, &v);
            if denom.abs() < BREAKDOWN {
                return Ok(LinearSolverResult {
                    converged: false,
                    iterations: iter,
                    reduction: res_norm / r0_norm,
                });
            }
            alpha = rho / denom;

            // s overwrites r
            axpy(&mut r, -alpha, &v);
            axpy(z, alpha, &p_hat);
            res_norm = two_norm(&r);
            if res_norm <= target {
                return Ok(LinearSolverResult {
                    converged: true,
                    iterations: iter,
                    reduction: res_norm / r0_norm,
                });
            }

            precondition(&r, &mut s_hat);
            a.mul_vec(&s_hat, &mut t);
            let tt = dot(&t, &t);
            omega = if tt > 0.0 { dot(&t, &r) / tt } else { 0.0 };

            axpy(z, omega, &s_hat);
            axpy(&mut r, -omega, &t);
            res_norm = two_norm(&r);
            if res_norm <= target {
                return Ok(LinearSolverResult {
                    converged: true,
                    iterations: iter,
                    reduction: res_norm / r0_norm,
                });
            }
        }

        Ok(LinearSolverResult {
            converged: false,
            iterations: self.max_iterations,
            reduction: res_norm / r0_norm,
        })
    }
}
