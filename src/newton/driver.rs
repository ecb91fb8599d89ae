//! The Newton driver.

use std::time::Instant;

use crate::error::{NewtonError, Result};
use crate::linalg::LinearSolver;
use crate::problem::NonlinearProblem;

use super::config::NewtonConfig;
use super::defect::DefectEvaluator;
use super::event::{Reporter, SolverEvent, SolverObserver};
use super::line_search::{GlobalizationPolicy, LineSearch, StepOutcome};
use super::prepare::{AdaptivePreparation, StepPreparationPolicy};
use super::report::TracingReporter;
use super::result::{NewtonResult, SolveStatistics};
use super::state::SolverState;
use super::terminate::{DefectTermination, TerminationPolicy};
use super::MAX_VERBOSITY;

/// Damped inexact Newton solver for `F(u) = 0`.
///
/// # Example
///
/// ```
/// use damped_newton::linalg::{DenseLu, DenseMatrix};
/// use damped_newton::newton::{Newton, NewtonConfig};
/// use damped_newton::problem::FnProblem;
///
/// // u^2 = 2
/// let problem = FnProblem::new(
///     1,
///     |u: &[f64], r: &mut [f64]| r[0] = u[0] * u[0] - 2.0,
///     |u: &[f64], a: &mut DenseMatrix| a.set(0, 0, 2.0 * u[0]),
/// );
/// let mut newton = Newton::with_config(problem, DenseLu::new(), NewtonConfig::new().with_verbosity(0));
///
/// let mut u = vec![1.0];
/// let result = newton.apply(&mut u).unwrap();
/// assert!((u[0] - 2f64.sqrt()).abs() < 1e-8);
/// assert!(result.reduction() < 1e-8);
/// ```
pub struct Newton<P, S, O = TracingReporter>
where
    P: NonlinearProblem,
{
    problem: P,
    solver: S,
    observer: O,
    config: NewtonConfig,
    /// Only the coordinating process reports progress
    coordinator: bool,
    /// Linearization kept between solves
    jacobian: Option<P::Jacobian>,
    result: Option<NewtonResult>,
    statistics: Option<SolveStatistics>,
}

impl<P, S> Newton<P, S, TracingReporter>
where
    P: NonlinearProblem,
    S: LinearSolver<P::Jacobian>,
{
    /// Create a solver with the default configuration.
    pub fn new(problem: P, solver: S) -> Self {
        Self::with_config(problem, solver, NewtonConfig::default())
    }

    /// Create a solver with a custom configuration.
    pub fn with_config(problem: P, solver: S, config: NewtonConfig) -> Self {
        Self {
            problem,
            solver,
            observer: TracingReporter::new(),
            config,
            coordinator: true,
            jacobian: None,
            result: None,
            statistics: None,
        }
    }
}

impl<P, S, O> Newton<P, S, O>
where
    P: NonlinearProblem,
    S: LinearSolver<P::Jacobian>,
    O: SolverObserver,
{
    /// Replace the progress observer.
    pub fn with_observer<T: SolverObserver>(self, observer: T) -> Newton<P, S, T> {
        Newton {
            problem: self.problem,
            solver: self.solver,
            observer,
            config: self.config,
            coordinator: self.coordinator,
            jacobian: self.jacobian,
            result: self.result,
            statistics: self.statistics,
        }
    }

    /// Mark this process as (non-)coordinator.
    pub fn with_coordinator(mut self, coordinator: bool) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Solve in place, starting from the values in `u`.
    ///
    /// On success `u` holds the solution. On failure it holds the last
    /// accepted iterate.
    pub fn apply(&mut self, u: &mut [f64]) -> Result<NewtonResult> {
        self.result = None;
        self.statistics = None;
        self.config.validate()?;
        let size = self.problem.size();
        if u.len() != size {
            return Err(NewtonError::dimension_mismatch(size, u.len()));
        }

        let start = Instant::now();

        let termination = DefectTermination::from_config(&self.config);
        let preparation = AdaptivePreparation::from_config(&self.config);
        let line_search = LineSearch::from_config(&self.config);
        let mut reporter = Reporter::new(&mut self.observer, effective_verbosity(&self.config, self.coordinator));

        let mut residual = vec![0.0; size];
        let initial = DefectEvaluator::new(&self.problem, &self.solver)
            .evaluate(u, &mut residual)
            .and_then(|defect| defect.finite(0));
        let defect = match initial {
            Ok(defect) => defect,
            Err(err) => {
                self.statistics = Some(SolveStatistics {
                    elapsed: start.elapsed(),
                    ..SolveStatistics::default()
                });
                return Err(err);
            }
        };
        reporter.emit(SolverEvent::InitialDefect { defect });

        // A fresh matrix holds no linearization yet
        let (jacobian, fresh) = match self.jacobian.take() {
            Some(jacobian) => (jacobian, false),
            None => (self.problem.new_jacobian(), true),
        };
        let mut state = SolverState::new(u, residual, jacobian, defect);
        state.force_reassembly = fresh;

        let outcome = iterate(
            &self.problem,
            &mut self.solver,
            &termination,
            &preparation,
            &line_search,
            &mut state,
            &mut reporter,
        );

        let statistics = state.statistics(start.elapsed());
        self.statistics = Some(statistics);
        // Keep only a matrix that was actually assembled
        let keep = self.config.keep_matrix && !state.force_reassembly;
        if let Err(err) = outcome {
            if keep {
                self.jacobian = Some(state.into_jacobian());
            }
            return Err(err);
        }

        reporter.emit(SolverEvent::Converged {
            iterations: state.iterations,
            reduction: state.reduction,
            elapsed: statistics.elapsed,
        });
        let result = NewtonResult::new(
            state.first_defect,
            state.defect,
            state.reduction,
            state.conv_rate,
            statistics,
        );

        if keep {
            self.jacobian = Some(state.into_jacobian());
        }
        self.result = Some(result);
        Ok(result)
    }

    /// Solve starting from `u0` and return the solution.
    pub fn solve(&mut self, mut u0: Vec<f64>) -> Result<(Vec<f64>, NewtonResult)> {
        let result = self.apply(&mut u0)?;
        Ok((u0, result))
    }

    /// Result of the last solve, if it converged.
    pub fn result(&self) -> Result<&NewtonResult> {
        self.result.as_ref().ok_or(NewtonError::ResultUnavailable)
    }

    /// Counters and timings of the last attempt, converged or not.
    pub fn last_statistics(&self) -> Option<SolveStatistics> {
        self.statistics
    }

    /// Set the verbosity (clamped to the highest level).
    pub fn set_verbosity_level(&mut self, level: u8) {
        self.config.verbosity = level.min(MAX_VERBOSITY);
    }

    /// Verbosity in effect; always 0 off the coordinator.
    pub fn verbosity_level(&self) -> u8 {
        effective_verbosity(&self.config, self.coordinator)
    }

    pub fn set_coordinator(&mut self, coordinator: bool) {
        self.coordinator = coordinator;
    }

    pub fn is_coordinator(&self) -> bool {
        self.coordinator
    }

    pub fn keep_matrix(&self) -> bool {
        self.config.keep_matrix
    }

    /// Keep the Jacobian between solves. Turning this off releases it.
    pub fn set_keep_matrix(&mut self, keep: bool) {
        self.config.keep_matrix = keep;
        if !keep {
            self.jacobian = None;
        }
    }

    /// Release a kept Jacobian; the next solve assembles a fresh one.
    pub fn discard_matrix(&mut self) {
        self.jacobian = None;
    }

    pub fn has_matrix(&self) -> bool {
        self.jacobian.is_some()
    }

    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: NewtonConfig) {
        if !config.keep_matrix {
            self.jacobian = None;
        }
        self.config = config;
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

fn effective_verbosity(config: &NewtonConfig, coordinator: bool) -> u8 {
    if coordinator {
        config.verbosity
    } else {
        0
    }
}

/// The Newton loop proper. Phase timings are booked before any error
/// of that phase is propagated.
fn iterate<P, S>(
    problem: &P,
    solver: &mut S,
    termination: &impl TerminationPolicy,
    preparation: &impl StepPreparationPolicy,
    globalization: &impl GlobalizationPolicy,
    state: &mut SolverState<'_, P::Jacobian>,
    reporter: &mut Reporter<'_>,
) -> Result<()>
where
    P: NonlinearProblem,
    S: LinearSolver<P::Jacobian>,
{
    while !termination.terminate(state)? {
        reporter.emit(SolverEvent::IterationStarted {
            iteration: state.iterations + 1,
        });

        let timer = Instant::now();
        let prepared = preparation.prepare(problem, state, reporter);
        let elapsed = timer.elapsed();
        state.assembler_time += elapsed;
        prepared?;
        reporter.emit(SolverEvent::Assembled { elapsed });

        reporter.emit(SolverEvent::LinearSolveStarted);
        state.correction.fill(0.0);
        let timer = Instant::now();
        let solved = solver.solve(
            &state.jacobian,
            &mut state.correction,
            &state.residual,
            state.linear_reduction,
        );
        let elapsed = timer.elapsed();
        state.linear_solver_time += elapsed;
        let solved = solved?;
        state.linear_solver_iterations += solved.iterations;
        reporter.emit(SolverEvent::LinearSolved {
            iterations: solved.iterations,
            reduction: solved.reduction,
            elapsed,
        });
        if !solved.converged {
            return Err(NewtonError::linear_solver(
                solved.iterations,
                state.iterations,
                state.defect,
            ));
        }

        let evaluator = DefectEvaluator::new(problem, &*solver);
        if let StepOutcome::Failed { reason, trials } = globalization.globalize(&evaluator, state, reporter)? {
            if state.reassembled {
                return Err(NewtonError::line_search(reason, trials, state.iterations, state.defect));
            }
            reporter.emit(SolverEvent::LineSearchRetry);
            state.force_reassembly = true;
            continue;
        }

        state.complete_iteration();
        reporter.emit(SolverEvent::IterationCompleted {
            iteration: state.iterations,
            defect: state.defect,
            step_reduction: state.defect / state.prev_defect,
            total_reduction: state.reduction,
        });
    }
    Ok(())
}
