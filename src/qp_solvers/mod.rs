//! QP/LP subproblem solvers.
//!
//! The SQP method hands its local model to a [`QpSolver`]; BQPD- or
//! HiGHS-style active-set wrappers implement the same contract.  The
//! returned multipliers are *new values* (active-set convention); the
//! calling method converts them to displacements.

mod primal_dual;

pub use primal_dual::PrimalDualQpSolver;

use crate::algebra::{FloatT, SparseVector, SymmetricMatrix};
use crate::optimization::{Direction, OptimizationError, WarmstartInformation};

pub trait QpSolver<T: FloatT> {
    /// Solve
    ///
    /// ```text
    ///   minimize gᵀd + ½dᵀHd   subject to   cl ≤ Jd ≤ cu,   lb ≤ d ≤ ub
    /// ```
    ///
    /// writing the primal solution, the new multiplier values and the
    /// subproblem status into `direction`.
    #[allow(clippy::too_many_arguments)]
    fn solve_qp(
        &mut self,
        number_variables: usize,
        number_constraints: usize,
        variables_lower_bounds: &[T],
        variables_upper_bounds: &[T],
        constraints_lower_bounds: &[T],
        constraints_upper_bounds: &[T],
        linear_objective: &SparseVector<T>,
        constraint_jacobian: &[SparseVector<T>],
        hessian: &SymmetricMatrix<T>,
        initial_point: &[T],
        direction: &mut Direction<T>,
        warmstart_information: &WarmstartInformation,
    ) -> Result<(), OptimizationError>;
}

/// Instantiate a QP solver backend by its option name.
pub fn create_qp_solver<T: FloatT>(
    name: &str,
    linear_solver_name: &str,
    tolerance: T,
) -> Result<Box<dyn QpSolver<T>>, OptimizationError> {
    match name {
        "primal_dual" => Ok(Box::new(PrimalDualQpSolver::new(
            linear_solver_name,
            tolerance,
        )?)),
        _ => Err(OptimizationError::InvalidConfiguration(format!(
            "unknown QP solver: {name}"
        ))),
    }
}
