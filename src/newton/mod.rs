//! Damped inexact Newton iteration.
//!
//! The driver ([`Newton`]) runs the classic loop and delegates every
//! decision to a policy:
//!
//! ```text
//!   evaluate F(u0)
//!   while !terminate:
//!       prepare      reassemble J?  linear tolerance?
//!       solve        J z = F(u)     (inexact)
//!       globalize    u -= lambda z  (line search)
//! ```
//!
//! A line search that fails on a stale Jacobian is retried once with a
//! freshly assembled one before the failure is reported.

mod config;
mod defect;
mod driver;
mod event;
mod line_search;
mod prepare;
mod report;
mod result;
mod state;
mod terminate;

pub use config::NewtonConfig;
pub use defect::{Defect, DefectEvaluator};
pub use driver::Newton;
pub use event::{Reporter, SolverEvent, SolverObserver};
pub use line_search::{GlobalizationPolicy, LineSearch, LineSearchStrategy, StepOutcome};
pub use prepare::{AdaptivePreparation, StepPreparationPolicy};
pub use report::TracingReporter;
pub use result::{NewtonResult, SolveStatistics};
pub use state::SolverState;
pub use terminate::{DefectTermination, TerminationPolicy};

/// Default verbosity (summary line on convergence).
pub const DEFAULT_VERBOSITY: u8 = 1;

/// Highest meaningful verbosity.
pub const MAX_VERBOSITY: u8 = 4;

/// Default relative defect reduction.
pub const DEFAULT_REDUCTION: f64 = 1e-8;

/// Default absolute defect limit.
pub const DEFAULT_ABSOLUTE_LIMIT: f64 = 1e-12;

/// Default Newton iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 40;

/// Default upper bound on the requested linear reduction.
pub const DEFAULT_MIN_LINEAR_REDUCTION: f64 = 1e-3;

/// Default reassembly threshold (always reassemble).
pub const DEFAULT_REASSEMBLE_THRESHOLD: f64 = 0.0;

/// Default damping trials per line search.
pub const DEFAULT_LINE_SEARCH_MAX_ITERATIONS: usize = 10;

/// Default line search damping factor.
pub const DEFAULT_DAMPING_FACTOR: f64 = 0.5;
