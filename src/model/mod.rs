//! Problem callbacks.
//!
//! A [`Model`] supplies evaluations, derivatives, bounds and sparsity for
//!
//! ```text
//!   minimize f(x)   subject to   c_L ≤ c(x) ≤ c_U,   x_L ≤ x ≤ x_U
//! ```
//!
//! and is read-only from the solver's perspective.  The
//! [`EqualityConstrainedModel`] adapter rewrites general inequalities into
//! equalities with slack variables, which the interior-point method requires.

mod equality_constrained;
mod infbounds;

pub use equality_constrained::EqualityConstrainedModel;
pub use infbounds::*;

use crate::algebra::{FloatT, Norm, SparseVector, SymmetricMatrix};

/// Evaluation callbacks and structure of a nonlinear program.
pub trait Model<T: FloatT> {
    fn number_variables(&self) -> usize;
    fn number_constraints(&self) -> usize;

    fn evaluate_objective(&self, x: &[T]) -> T;
    fn evaluate_objective_gradient(&self, x: &[T], gradient: &mut SparseVector<T>);
    fn evaluate_constraints(&self, x: &[T], constraints: &mut [T]);
    /// Write the constraint Jacobian as one sparse row per constraint.
    fn evaluate_constraint_jacobian(&self, x: &[T], jacobian: &mut [SparseVector<T>]);
    /// Write the upper triangle of the Lagrangian Hessian
    /// `∇²L(x, σ, y) = σ·∇²f − Σ yⱼ·∇²cⱼ` in a fixed sparsity pattern
    /// (consistent with the gradient convention `∇ₓL = σ∇f − Jᵀy − z`).
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[T],
        objective_multiplier: T,
        multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    );

    fn variable_lower_bound(&self, variable_index: usize) -> T;
    fn variable_upper_bound(&self, variable_index: usize) -> T;
    fn constraint_lower_bound(&self, constraint_index: usize) -> T;
    fn constraint_upper_bound(&self, constraint_index: usize) -> T;

    fn initial_primal_point(&self, x: &mut [T]);
    fn initial_dual_point(&self, multipliers: &mut [T]) {
        multipliers.iter_mut().for_each(|y| *y = T::zero());
    }

    fn number_objective_gradient_nonzeros(&self) -> usize;
    fn number_jacobian_nonzeros(&self) -> usize;
    fn number_hessian_nonzeros(&self) -> usize;

    /// Constraint → slack variable mapping, nonempty only for models that
    /// were reformulated with slacks.
    fn get_slacks(&self) -> Vec<(usize, usize)> {
        Vec::new()
    }

    /// Indices of the constraints that are linear in x.  Purely structural
    /// information; the core treats it as advisory.
    fn get_linear_constraints(&self) -> Vec<usize> {
        Vec::new()
    }

    // ---------------------------------
    // derived structure (default implementations scan the bounds)
    // ---------------------------------

    fn get_lower_bounded_variables(&self) -> Vec<usize> {
        (0..self.number_variables())
            .filter(|&i| is_finite_bound(self.variable_lower_bound(i)))
            .collect()
    }

    fn get_upper_bounded_variables(&self) -> Vec<usize> {
        (0..self.number_variables())
            .filter(|&i| is_finite_bound(self.variable_upper_bound(i)))
            .collect()
    }

    fn get_single_lower_bounded_variables(&self) -> Vec<usize> {
        (0..self.number_variables())
            .filter(|&i| {
                is_finite_bound(self.variable_lower_bound(i))
                    && !is_finite_bound(self.variable_upper_bound(i))
            })
            .collect()
    }

    fn get_single_upper_bounded_variables(&self) -> Vec<usize> {
        (0..self.number_variables())
            .filter(|&i| {
                !is_finite_bound(self.variable_lower_bound(i))
                    && is_finite_bound(self.variable_upper_bound(i))
            })
            .collect()
    }

    fn get_equality_constraints(&self) -> Vec<usize> {
        (0..self.number_constraints())
            .filter(|&j| self.constraint_lower_bound(j) == self.constraint_upper_bound(j))
            .collect()
    }

    fn get_inequality_constraints(&self) -> Vec<usize> {
        (0..self.number_constraints())
            .filter(|&j| self.constraint_lower_bound(j) != self.constraint_upper_bound(j))
            .collect()
    }

    fn is_constrained(&self) -> bool {
        self.number_constraints() > 0
    }

    // ---------------------------------
    // constraint violation
    // ---------------------------------

    /// ‖max(0, c_L − c, c − c_U)‖ in the given norm.
    fn constraint_violation(&self, constraints: &[T], norm: Norm) -> T {
        norm.of((0..self.number_constraints()).map(|j| {
            constraint_residual(
                constraints[j],
                self.constraint_lower_bound(j),
                self.constraint_upper_bound(j),
            )
        }))
    }

    /// Violation of the linearized constraints c + α·Jd.
    fn linearized_constraint_violation(
        &self,
        primal_direction: &[T],
        constraints: &[T],
        constraint_jacobian: &[SparseVector<T>],
        step_length: T,
        norm: Norm,
    ) -> T {
        norm.of((0..self.number_constraints()).map(|j| {
            let linearized =
                constraints[j] + step_length * constraint_jacobian[j].dot_dense(primal_direction);
            constraint_residual(
                linearized,
                self.constraint_lower_bound(j),
                self.constraint_upper_bound(j),
            )
        }))
    }
}

/// Componentwise bound violation max(0, lb − v, v − ub).
pub fn constraint_residual<T: FloatT>(value: T, lower_bound: T, upper_bound: T) -> T {
    T::max(T::zero(), T::max(lower_bound - value, value - upper_bound))
}
