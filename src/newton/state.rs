//! Mutable state shared by the driver and its policies during one solve.

use std::time::Duration;

use super::result::SolveStatistics;

/// Everything one solve knows about its progress.
///
/// Created by the driver after the initial defect evaluation and mutated
/// in place by every policy. Never shared between solves; only the
/// Jacobian may outlive it (see [`SolverState::into_jacobian`]).
#[derive(Debug)]
pub struct SolverState<'a, M> {
    /// Current approximate solution
    pub iterate: &'a mut [f64],
    /// Last Newton correction, `J z = r`
    pub correction: Vec<f64>,
    /// Residual at `iterate`
    pub residual: Vec<f64>,
    /// Current linearization
    pub jacobian: M,
    /// Norm of `residual`
    pub defect: f64,
    /// Defect at the initial guess, set once per solve
    pub first_defect: f64,
    /// Defect at the start of the current iteration
    pub prev_defect: f64,
    /// Completed (globalized) Newton steps
    pub iterations: usize,
    /// `defect / first_defect` after the last completed step
    pub reduction: f64,
    /// Geometric mean reduction per step
    pub conv_rate: f64,
    /// Jacobian rebuilt during the current iteration
    pub reassembled: bool,
    /// Rebuild the Jacobian next iteration regardless of the threshold
    pub force_reassembly: bool,
    /// Reduction requested from the linear solver this iteration
    pub linear_reduction: f64,
    /// Cumulative time spent assembling the Jacobian
    pub assembler_time: Duration,
    /// Cumulative time spent in the linear solver
    pub linear_solver_time: Duration,
    /// Cumulative linear solver iterations
    pub linear_solver_iterations: usize,
}

impl<'a, M> SolverState<'a, M> {
    /// Start a solve from an evaluated initial guess.
    pub fn new(iterate: &'a mut [f64], residual: Vec<f64>, jacobian: M, defect: f64) -> Self {
        let n = iterate.len();
        Self {
            iterate,
            correction: vec![0.0; n],
            residual,
            jacobian,
            defect,
            first_defect: defect,
            prev_defect: defect,
            iterations: 0,
            reduction: 1.0,
            conv_rate: 1.0,
            reassembled: false,
            force_reassembly: false,
            linear_reduction: 0.0,
            assembler_time: Duration::ZERO,
            linear_solver_time: Duration::ZERO,
            linear_solver_iterations: 0,
        }
    }

    /// `iterate -= lambda * correction`
    pub fn apply_correction(&mut self, lambda: f64) {
        for (u, z) in self.iterate.iter_mut().zip(&self.correction) {
            *u -= lambda * z;
        }
    }

    /// Reset the iterate to a snapshot taken earlier in this iteration.
    pub fn restore(&mut self, snapshot: &[f64]) {
        self.iterate.copy_from_slice(snapshot);
    }

    /// Book a globalized step: reduction, iteration count, rate, in that order.
    pub fn complete_iteration(&mut self) {
        self.reduction = if self.first_defect > 0.0 {
            self.defect / self.first_defect
        } else {
            0.0
        };
        self.iterations += 1;
        self.conv_rate = self.reduction.powf(1.0 / self.iterations as f64);
    }

    /// Counters and timings accumulated so far.
    pub fn statistics(&self, elapsed: Duration) -> SolveStatistics {
        SolveStatistics {
            iterations: self.iterations,
            elapsed,
            assembler_time: self.assembler_time,
            linear_solver_time: self.linear_solver_time,
            linear_solver_iterations: self.linear_solver_iterations,
        }
    }

    /// Release the Jacobian so it can be kept for the next solve.
    pub fn into_jacobian(self) -> M {
        self.jacobian
    }
}
