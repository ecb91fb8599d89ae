//! Newton - damped Newton solver for model problems
//!
//! # Usage
//!
//! ```bash
//! newton bratu --size 100 --lambda 3.0 --verbosity 2
//! newton --solver bicgstab --strategy backtrackAcceptBest linear --size 200
//! RUST_LOG=trace newton diode --stages 3 --v-in 30
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use damped_newton::linalg::{BiCgStab, DenseLu, DenseMatrix, LinearSolver};
use damped_newton::problems::{Bratu1d, DiodeClipper, DiodeParams, LinearSystem};
use damped_newton::{LineSearchStrategy, Newton, NewtonConfig, NonlinearProblem, Result};

/// Damped inexact Newton solver for model problems
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    problem: ProblemArgs,

    /// Solver configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Linear solver
    #[arg(long, value_enum, default_value_t = SolverKind::Lu, global = true)]
    solver: SolverKind,

    /// Progress output, 0 (silent) to 4 (line search trials)
    #[arg(short, long, global = true)]
    verbosity: Option<u8>,

    /// Line search strategy (none, backtrackRequireDecrease, backtrackAcceptBest)
    #[arg(long, global = true)]
    strategy: Option<LineSearchStrategy>,

    /// Newton iteration budget
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Relative defect reduction to reach
    #[arg(long, global = true)]
    reduction: Option<f64>,

    /// Absolute defect limit
    #[arg(long, global = true)]
    absolute_limit: Option<f64>,

    /// Reassemble the Jacobian when defect / previous defect exceeds this
    #[arg(long, global = true)]
    reassemble_threshold: Option<f64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long, global = true)]
    dump_config: bool,

    /// Print the solution vector
    #[arg(long, global = true)]
    print_solution: bool,
}

#[derive(Subcommand, Debug)]
enum ProblemArgs {
    /// 1D Laplacian with unit load (one Newton step)
    Linear {
        #[arg(short = 'n', long, default_value_t = 50)]
        size: usize,
    },
    /// Bratu equation -u'' = lambda e^u
    Bratu {
        #[arg(short = 'n', long, default_value_t = 100)]
        size: usize,
        #[arg(short, long, default_value_t = 1.0)]
        lambda: f64,
    },
    /// Resistor ladder clamped by diodes
    Diode {
        #[arg(short = 'n', long, default_value_t = 1)]
        stages: usize,
        /// Source voltage (V)
        #[arg(long, default_value_t = 9.0)]
        v_in: f64,
        /// Series resistance (ohms)
        #[arg(short, long, default_value_t = 1e3)]
        resistance: f64,
        /// Use germanium diodes
        #[arg(long)]
        germanium: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SolverKind {
    /// Dense LU
    Lu,
    /// Jacobi-preconditioned BiCGSTAB
    Bicgstab,
}

impl Args {
    fn newton_config(&self) -> Result<NewtonConfig> {
        let mut config = match &self.config {
            Some(path) => NewtonConfig::from_file(path)?,
            None => NewtonConfig::default(),
        };
        if let Some(verbosity) = self.verbosity {
            config = config.with_verbosity(verbosity);
        }
        if let Some(strategy) = self.strategy {
            config = config.with_line_search_strategy(strategy);
        }
        if let Some(max_iterations) = self.max_iterations {
            config = config.with_max_iterations(max_iterations);
        }
        if let Some(reduction) = self.reduction {
            config = config.with_reduction(reduction);
        }
        if let Some(absolute_limit) = self.absolute_limit {
            config = config.with_absolute_limit(absolute_limit);
        }
        if let Some(threshold) = self.reassemble_threshold {
            config = config.with_reassemble_threshold(threshold);
        }
        config.validate()?;
        Ok(config)
    }
}

fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 | 2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

fn run<P, S>(problem: P, solver: S, config: NewtonConfig, print_solution: bool) -> Result<()>
where
    P: NonlinearProblem<Jacobian = DenseMatrix>,
    S: LinearSolver<DenseMatrix>,
{
    let size = problem.size();
    let mut newton = Newton::with_config(problem, solver, config);
    let (u, result) = newton.solve(vec![0.0; size])?;

    info!(
        iterations = result.iterations(),
        linear_iterations = result.linear_solver_iterations(),
        "solved in {:.4}s (assembly {:.4}s, linear solver {:.4}s)",
        result.elapsed().as_secs_f64(),
        result.assembler_time().as_secs_f64(),
        result.linear_solver_time().as_secs_f64()
    );
    println!("iterations:        {}", result.iterations());
    println!("first defect:      {:.6e}", result.first_defect());
    println!("defect:            {:.6e}", result.defect());
    println!("reduction:         {:.6e}", result.reduction());
    println!("convergence rate:  {:.6e}", result.conv_rate());
    if print_solution {
        for (i, ui) in u.iter().enumerate() {
            println!("{i:6} {ui:.12e}");
        }
    }
    Ok(())
}

fn solve_with<P>(problem: P, kind: SolverKind, config: NewtonConfig, print_solution: bool) -> Result<()>
where
    P: NonlinearProblem<Jacobian = DenseMatrix>,
{
    match kind {
        SolverKind::Lu => run(problem, DenseLu::new(), config, print_solution),
        SolverKind::Bicgstab => run(problem, BiCgStab::default(), config, print_solution),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.newton_config()?;

    if args.dump_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(config.verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let outcome = match args.problem {
        ProblemArgs::Linear { size } => {
            solve_with(LinearSystem::laplacian(size), args.solver, config, args.print_solution)
        }
        ProblemArgs::Bratu { size, lambda } => {
            solve_with(Bratu1d::new(size, lambda)?, args.solver, config, args.print_solution)
        }
        ProblemArgs::Diode {
            stages,
            v_in,
            resistance,
            germanium,
        } => {
            let diode = if germanium {
                DiodeParams::germanium()
            } else {
                DiodeParams::default()
            };
            let problem = DiodeClipper::new(stages, v_in, resistance)?.with_diode(diode);
            solve_with(problem, args.solver, config, args.print_solution)
        }
    };

    if let Err(err) = &outcome {
        error!("{err}");
    }
    outcome
}
