//! Mock problems and scripted linear solvers shared by the unit tests.

use std::cell::Cell;

use crate::error::Result;
use crate::linalg::{DenseLu, DenseMatrix, LinearSolver, LinearSolverResult, Norm};
use crate::problem::{FnProblem, NonlinearProblem};

/// One unknown: `F(u) = f(u)`, `J(u) = df(u)`.
pub fn scalar_problem<F, D>(
    f: F,
    df: D,
) -> FnProblem<impl Fn(&[f64], &mut [f64]), impl Fn(&[f64], &mut DenseMatrix)>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    FnProblem::new(
        1,
        move |u: &[f64], r: &mut [f64]| r[0] = f(u[0]),
        move |u: &[f64], a: &mut DenseMatrix| a.set(0, 0, df(u[0])),
    )
}

/// Counts residual and Jacobian evaluations of the wrapped problem.
pub struct Counting<P> {
    inner: P,
    residuals: Cell<usize>,
    jacobians: Cell<usize>,
}

impl<P> Counting<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            residuals: Cell::new(0),
            jacobians: Cell::new(0),
        }
    }

    pub fn residuals(&self) -> usize {
        self.residuals.get()
    }

    pub fn jacobians(&self) -> usize {
        self.jacobians.get()
    }
}

impl<P: NonlinearProblem> NonlinearProblem for Counting<P> {
    type Jacobian = P::Jacobian;
    type Error = P::Error;

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn new_jacobian(&self) -> P::Jacobian {
        self.inner.new_jacobian()
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) -> std::result::Result<(), P::Error> {
        self.residuals.set(self.residuals.get() + 1);
        self.inner.residual(u, r)
    }

    fn jacobian(&self, u: &[f64], a: &mut P::Jacobian) -> std::result::Result<(), P::Error> {
        self.jacobians.set(self.jacobians.get() + 1);
        self.inner.jacobian(u, a)
    }
}

/// Dense LU that misbehaves on chosen calls (numbered from 1).
#[derive(Debug, Default)]
pub struct Scripted {
    inner: DenseLu,
    calls: usize,
    /// Return the negated correction
    pub reverse_on: Vec<usize>,
    /// Report non-convergence
    pub diverge_on: Vec<usize>,
}

impl Scripted {
    pub fn reversing(calls: &[usize]) -> Self {
        Self {
            reverse_on: calls.to_vec(),
            ..Self::default()
        }
    }

    pub fn diverging(calls: &[usize]) -> Self {
        Self {
            diverge_on: calls.to_vec(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Norm for Scripted {
    fn norm(&self, v: &[f64]) -> f64 {
        self.inner.norm(v)
    }
}

impl LinearSolver<DenseMatrix> for Scripted {
    fn solve(&mut self, a: &DenseMatrix, z: &mut [f64], r: &[f64], reduction: f64) -> Result<LinearSolverResult> {
        self.calls += 1;
        let mut result = self.inner.solve(a, z, r, reduction)?;
        if self.reverse_on.contains(&self.calls) {
            z.iter_mut().for_each(|zi| *zi = -*zi);
        }
        if self.diverge_on.contains(&self.calls) {
            result.converged = false;
            result.iterations = 7;
        }
        Ok(result)
    }
}

/// `F(u) = u - 1` whose Jacobian assembly always fails.
pub struct BrokenJacobian;

impl NonlinearProblem for BrokenJacobian {
    type Jacobian = DenseMatrix;
    type Error = std::io::Error;

    fn size(&self) -> usize {
        1
    }

    fn new_jacobian(&self) -> DenseMatrix {
        DenseMatrix::new(1)
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) -> std::io::Result<()> {
        r[0] = u[0] - 1.0;
        Ok(())
    }

    fn jacobian(&self, _u: &[f64], _a: &mut DenseMatrix) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "element integration failed"))
    }
}
