use crate::linear_solvers::LinearSolverError;
use thiserror::Error;

/// First-order classification of an iterate (§ termination classifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterateStatus {
    #[default]
    NotOptimal,
    FeasibleKktPoint,
    FeasibleFjPoint,
    InfeasibleStationaryPoint,
    Unbounded,
}

impl std::fmt::Display for IterateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            IterateStatus::NotOptimal => "not optimal",
            IterateStatus::FeasibleKktPoint => "feasible KKT point",
            IterateStatus::FeasibleFjPoint => "feasible FJ point",
            IterateStatus::InfeasibleStationaryPoint => "infeasible stationary point",
            IterateStatus::Unbounded => "unbounded",
        };
        write!(f, "{name}")
    }
}

/// Outcome of a complete `solve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    FeasibleKktPoint,
    FeasibleFjPoint,
    InfeasibleStationaryPoint,
    Unbounded,
    IterationLimit,
    UserRequestedStop,
    /// The solver stopped without a first-order certificate (e.g. after an
    /// unrecoverable subproblem failure); the best iterate is still returned.
    NotOptimal,
}

impl OptimizationStatus {
    /// Process exit code for CLI wrappers.
    pub fn exit_code(&self) -> i32 {
        match self {
            OptimizationStatus::FeasibleKktPoint => 0,
            OptimizationStatus::FeasibleFjPoint => 1,
            OptimizationStatus::InfeasibleStationaryPoint => 2,
            OptimizationStatus::Unbounded => 3,
            OptimizationStatus::IterationLimit => 4,
            OptimizationStatus::UserRequestedStop => 5,
            OptimizationStatus::NotOptimal => 16,
        }
    }

    pub fn from_iterate_status(status: IterateStatus) -> Self {
        match status {
            IterateStatus::FeasibleKktPoint => OptimizationStatus::FeasibleKktPoint,
            IterateStatus::FeasibleFjPoint => OptimizationStatus::FeasibleFjPoint,
            IterateStatus::InfeasibleStationaryPoint => {
                OptimizationStatus::InfeasibleStationaryPoint
            }
            IterateStatus::Unbounded => OptimizationStatus::Unbounded,
            IterateStatus::NotOptimal => OptimizationStatus::NotOptimal,
        }
    }
}

impl std::fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Typed errors crossing the solver boundary.
#[derive(Error, Debug)]
pub enum OptimizationError {
    /// Unknown strategy name or inconsistent ingredient combination.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Ill-posed problem data (e.g. infinities where finite values are required).
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
    /// The inertia correction diverged (δ exceeded its failure threshold).
    #[error("unstable regularization: the inertia correction diverged")]
    UnstableRegularization,
    #[error("linear solver failure: {0}")]
    LinearSolver(#[from] LinearSolverError),
    /// The local subproblem is unbounded below.
    #[error("the subproblem is unbounded")]
    UnboundedSubproblem,
    /// Backtracking reached the minimum step length without acceptance.
    #[error("step length below its minimum without an acceptable iterate")]
    StepLengthBelowMinimum,
    /// The trust-region radius shrank below its minimum without acceptance.
    #[error("trust-region radius below its minimum without an acceptable iterate")]
    TrustRegionBelowMinimum,
    #[error("subproblem solver failure: {0}")]
    SubproblemSolver(String),
}
