//! Progress events emitted by the driver and its policies.
//!
//! The iteration itself never prints. It emits [`SolverEvent`]s through a
//! [`Reporter`], which drops events above the configured verbosity and
//! forwards the rest to a [`SolverObserver`].

use std::time::Duration;

/// Something that happened during a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverEvent {
    /// Defect at the initial guess.
    InitialDefect { defect: f64 },

    /// A Newton iteration begins (also emitted for a retried iteration).
    IterationStarted { iteration: usize },

    /// The Jacobian is being rebuilt.
    Reassembling { forced: bool },

    /// Time spent preparing the step.
    Assembled { elapsed: Duration },

    /// Reduction requested from the linear solver.
    LinearReduction { requested: f64 },

    /// The linear solver is about to run.
    LinearSolveStarted,

    /// The linear solver returned.
    LinearSolved {
        iterations: usize,
        reduction: f64,
        elapsed: Duration,
    },

    /// Backtracking begins.
    LineSearchStarted,

    /// Trying a damping factor.
    LineSearchTrial { lambda: f64 },

    /// The defect at this damping factor was NaN or infinite.
    LineSearchNonFinite { lambda: f64 },

    /// A damping factor was accepted.
    LineSearchAccepted { lambda: f64 },

    /// The damping schedule ran out.
    LineSearchExhausted { trials: usize },

    /// The line search failed and the iteration is retried with a fresh Jacobian.
    LineSearchRetry,

    /// A Newton step was globalized.
    IterationCompleted {
        iteration: usize,
        defect: f64,
        step_reduction: f64,
        total_reduction: f64,
    },

    /// The solve converged.
    Converged {
        iterations: usize,
        reduction: f64,
        elapsed: Duration,
    },
}

impl SolverEvent {
    /// Lowest verbosity level at which this event is reported.
    pub fn verbosity(&self) -> u8 {
        match self {
            Self::Converged { .. } => 1,
            Self::InitialDefect { .. } | Self::IterationCompleted { .. } => 2,
            Self::IterationStarted { .. }
            | Self::Reassembling { .. }
            | Self::Assembled { .. }
            | Self::LinearReduction { .. }
            | Self::LineSearchRetry => 3,
            Self::LinearSolveStarted
            | Self::LinearSolved { .. }
            | Self::LineSearchStarted
            | Self::LineSearchTrial { .. }
            | Self::LineSearchNonFinite { .. }
            | Self::LineSearchAccepted { .. }
            | Self::LineSearchExhausted { .. } => 4,
        }
    }
}

/// Consumer of solver events.
pub trait SolverObserver {
    fn observe(&mut self, event: &SolverEvent);
}

/// Discards every event.
impl SolverObserver for () {
    fn observe(&mut self, _event: &SolverEvent) {}
}

/// Records every event, mostly useful in tests.
impl SolverObserver for Vec<SolverEvent> {
    fn observe(&mut self, event: &SolverEvent) {
        self.push(*event);
    }
}

impl<T: SolverObserver + ?Sized> SolverObserver for &mut T {
    fn observe(&mut self, event: &SolverEvent) {
        (**self).observe(event);
    }
}

/// Verbosity filter in front of an observer.
pub struct Reporter<'a> {
    observer: &'a mut dyn SolverObserver,
    verbosity: u8,
}

impl<'a> Reporter<'a> {
    pub fn new(observer: &'a mut dyn SolverObserver, verbosity: u8) -> Self {
        Self {
            observer,
            verbosity,
        }
    }

    /// Effective verbosity.
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Forward `event` if the verbosity allows it.
    pub fn emit(&mut self, event: SolverEvent) {
        if event.verbosity() <= self.verbosity {
            self.observer.observe(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_filters_by_verbosity() {
        let mut log: Vec<SolverEvent> = Vec::new();
        {
            let mut reporter = Reporter::new(&mut log, 2);
            reporter.emit(SolverEvent::InitialDefect { defect: 1.0 });
            reporter.emit(SolverEvent::LineSearchTrial { lambda: 0.5 });
            reporter.emit(SolverEvent::Reassembling { forced: false });
            reporter.emit(SolverEvent::Converged {
                iterations: 1,
                reduction: 1e-9,
                elapsed: Duration::ZERO,
            });
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], SolverEvent::InitialDefect { defect: 1.0 });
        assert!(matches!(log[1], SolverEvent::Converged { .. }));
    }

    #[test]
    fn test_silent_reporter() {
        let mut log: Vec<SolverEvent> = Vec::new();
        let mut reporter = Reporter::new(&mut log, 0);
        reporter.emit(SolverEvent::Converged {
            iterations: 3,
            reduction: 1e-9,
            elapsed: Duration::ZERO,
        });
        drop(reporter);
        assert!(log.is_empty());
    }
}
