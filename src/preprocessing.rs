//! Preprocessing routines shared by the subproblem methods.

use crate::algebra::{FloatT, SymmetricMatrix, VectorMath};
use crate::ingredients::regularization::factorize_with_retry;
use crate::linear_solvers::LinearSolver;
use crate::model::Model;
use crate::optimization::{Iterate, OptimizationError};
use crate::statistics::Statistics;

/// Least-squares approximation of the constraint multipliers: solve one
/// augmented system with an identity Hessian,
///
/// ```text
///   [ I  Jᵀ ] [ t ]   [ ∇f − z_L − z_U ]
///   [ J  0  ] [ y ] = [       0        ]
/// ```
///
/// and keep y unless its ∞-norm exceeds `multiplier_max_norm` (a printed
/// notice records the discard).
pub fn compute_least_square_multipliers<T: FloatT>(
    model: &dyn Model<T>,
    linear_solver: &mut dyn LinearSolver<T>,
    iterate: &mut Iterate<T>,
    multiplier_max_norm: T,
    statistics: &Statistics,
) -> Result<(), OptimizationError> {
    let number_variables = model.number_variables();
    let number_constraints = model.number_constraints();
    let dimension = number_variables + number_constraints;

    iterate.evaluate_objective_gradient(model);
    iterate.evaluate_constraint_jacobian(model);

    // assemble the augmented matrix
    let number_nonzeros = number_variables + model.number_jacobian_nonzeros();
    let mut matrix = SymmetricMatrix::new(dimension, number_nonzeros);
    for variable_index in 0..number_variables {
        matrix.insert(variable_index, variable_index, T::one());
    }
    for (constraint_index, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
        for (variable_index, derivative) in row.iter() {
            matrix.insert(
                variable_index,
                number_variables + constraint_index,
                derivative,
            );
        }
    }

    // right-hand side: ∇f − z_L − z_U on top, zeros below
    let mut rhs = vec![T::zero(); dimension];
    for (variable_index, derivative) in iterate.evaluations.objective_gradient.iter() {
        rhs[variable_index] += derivative;
    }
    for variable_index in 0..number_variables {
        rhs[variable_index] -= iterate.multipliers.lower_bounds[variable_index]
            + iterate.multipliers.upper_bounds[variable_index];
    }

    linear_solver.do_symbolic_analysis(&matrix)?;
    factorize_with_retry(linear_solver, &matrix)?;
    if linear_solver.matrix_is_singular() {
        statistics.notice("least-squares multiplier system is singular, keeping zero multipliers");
        return Ok(());
    }

    let mut solution = vec![T::zero(); dimension];
    linear_solver.solve_indefinite_system(&matrix, &rhs, &mut solution)?;

    // if the least-squares multipliers are too large, discard them
    let multipliers = &solution[number_variables..];
    if multipliers.norm_inf() <= multiplier_max_norm {
        iterate.multipliers.constraints[..number_constraints].copy_from_slice(multipliers);
    } else {
        statistics.notice("discarding over-large least-squares multipliers");
    }
    Ok(())
}
