//! Direct symmetric indefinite linear solvers.
//!
//! The solver core talks to a factorization backend only through the
//! [`LinearSolver`] trait: symbolic analysis once per sparsity pattern,
//! numerical factorization per regularization retry, triangular solves, and
//! inertia reporting.  MA27/MA57/MUMPS-style wrappers can be swapped in by
//! implementing the trait and registering a name in the factory below.

mod ldl;

pub use ldl::InertiaLdl;

use crate::algebra::{FloatT, SymmetricMatrix};
use crate::optimization::OptimizationError;
use thiserror::Error;

/// Inertia (#positive, #negative, #zero eigenvalues) of a factorized
/// symmetric matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inertia {
    pub positive: usize,
    pub negative: usize,
    pub zero: usize,
}

impl Inertia {
    pub fn new(positive: usize, negative: usize, zero: usize) -> Self {
        Self {
            positive,
            negative,
            zero,
        }
    }
}

impl std::fmt::Display for Inertia {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.positive, self.negative, self.zero)
    }
}

/// Errors reported by a linear solver backend.
#[derive(Error, Debug)]
pub enum LinearSolverError {
    /// The backend ran out of preallocated workspace.  Recoverable: grow the
    /// workspace with `initialize_memory` and retry the same call.
    #[error("insufficient workspace: {required} entries required")]
    InsufficientWorkspace { required: usize },
    /// The matrix was singular at solve time.
    #[error("matrix is singular")]
    SingularMatrix,
    #[error("symbolic analysis has not been performed")]
    MissingSymbolicAnalysis,
    #[error("fill-reducing ordering failed: {0}")]
    OrderingFailure(String),
}

/// Direct solver contract for the sparse symmetric indefinite systems
/// assembled by the subproblem methods.
pub trait LinearSolver<T: FloatT> {
    /// Size the internal workspace for systems of dimension `n + m` with
    /// `nnz` structural nonzeros and `regularization_size` tail entries.
    fn initialize_memory(
        &mut self,
        number_variables: usize,
        number_constraints: usize,
        number_nonzeros: usize,
        regularization_size: usize,
    );

    /// Analyze the sparsity pattern.  Performed once per pattern; numerical
    /// factorizations between two analyses must present the same pattern.
    fn do_symbolic_analysis(&mut self, matrix: &SymmetricMatrix<T>)
        -> Result<(), LinearSolverError>;

    /// Factorize the matrix numerically (structural entries + tail).
    fn do_numerical_factorization(
        &mut self,
        matrix: &SymmetricMatrix<T>,
    ) -> Result<(), LinearSolverError>;

    /// Solve the factorized system for the given right-hand side.
    fn solve_indefinite_system(
        &mut self,
        matrix: &SymmetricMatrix<T>,
        rhs: &[T],
        solution: &mut [T],
    ) -> Result<(), LinearSolverError>;

    /// Inertia of the last factorized matrix.
    fn get_inertia(&self) -> Inertia;

    /// True if the last factorization detected a (numerically) singular matrix.
    fn matrix_is_singular(&self) -> bool;

    /// Numerical rank of the last factorized matrix.
    fn rank(&self) -> usize;
}

type LinearSolverConstructor<T> = fn() -> Box<dyn LinearSolver<T>>;

fn linear_solver_constructor<T: FloatT>(
    name: &str,
) -> Option<LinearSolverConstructor<T>> {
    // fixed lookup table: external MA27/MA57-style wrappers register here
    match name {
        "ldl" => Some(|| Box::<InertiaLdl<T>>::default()),
        _ => None,
    }
}

/// Instantiate a linear solver backend by its option name.
pub fn create_linear_solver<T: FloatT>(
    name: &str,
) -> Result<Box<dyn LinearSolver<T>>, OptimizationError> {
    linear_solver_constructor(name)
        .map(|ctor| ctor())
        .ok_or_else(|| OptimizationError::InvalidConfiguration(format!("unknown linear solver: {name}")))
}
