//! Snapshot of a completed solve.

use std::time::Duration;

/// Counters and timings of one solve attempt.
///
/// Phase timings include time spent in a phase that failed, so a failed
/// solve still accounts for every second it used.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolveStatistics {
    /// Completed Newton steps
    pub iterations: usize,
    /// Wall time of the whole solve
    pub elapsed: Duration,
    /// Cumulative Jacobian assembly time
    pub assembler_time: Duration,
    /// Cumulative linear solver time
    pub linear_solver_time: Duration,
    /// Cumulative linear solver iterations
    pub linear_solver_iterations: usize,
}

/// Final status of a converged solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonResult {
    first_defect: f64,
    defect: f64,
    reduction: f64,
    conv_rate: f64,
    statistics: SolveStatistics,
}

impl NewtonResult {
    pub(crate) fn new(
        first_defect: f64,
        defect: f64,
        reduction: f64,
        conv_rate: f64,
        statistics: SolveStatistics,
    ) -> Self {
        Self {
            first_defect,
            defect,
            reduction,
            conv_rate,
            statistics,
        }
    }

    /// Defect at the initial guess.
    pub fn first_defect(&self) -> f64 {
        self.first_defect
    }

    /// Defect at the solution.
    pub fn defect(&self) -> f64 {
        self.defect
    }

    /// `defect / first_defect` (1.0 when no step was taken).
    pub fn reduction(&self) -> f64 {
        self.reduction
    }

    /// `reduction^(1 / iterations)` (1.0 when no step was taken).
    pub fn conv_rate(&self) -> f64 {
        self.conv_rate
    }

    /// Completed Newton steps.
    pub fn iterations(&self) -> usize {
        self.statistics.iterations
    }

    /// Wall time of the solve.
    pub fn elapsed(&self) -> Duration {
        self.statistics.elapsed
    }

    /// Cumulative Jacobian assembly time.
    pub fn assembler_time(&self) -> Duration {
        self.statistics.assembler_time
    }

    /// Cumulative linear solver time.
    pub fn linear_solver_time(&self) -> Duration {
        self.statistics.linear_solver_time
    }

    /// Cumulative linear solver iterations.
    pub fn linear_solver_iterations(&self) -> usize {
        self.statistics.linear_solver_iterations
    }

    /// All counters and timings.
    pub fn statistics(&self) -> &SolveStatistics {
        &self.statistics
    }
}
