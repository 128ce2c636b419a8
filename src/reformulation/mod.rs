//! Problem views.
//!
//! An [`OptimizationProblem`] is a thin, read-only reformulation layer over a
//! [`Model`](crate::model::Model): the *optimality* view passes through with
//! σ = 1, while the *ℓ₁-relaxed* view augments the variable space with
//! elastic variables and supports σ ∈ [0, 1].  Subproblem methods and the
//! relaxation drivers only ever talk to this trait.

mod l1_relaxed;
mod optimality;

pub use l1_relaxed::{ElasticVariables, L1RelaxedProblem};
pub use optimality::OptimalityProblem;

use crate::algebra::{FloatT, Norm, SparseVector, SymmetricMatrix};
use crate::model::Model;
use crate::optimization::{Iterate, LagrangianGradient, Multipliers, ObjectiveMeasure};

pub trait OptimizationProblem<T: FloatT> {
    fn model(&self) -> &dyn Model<T>;
    fn number_variables(&self) -> usize;
    fn number_constraints(&self) -> usize;
    fn get_objective_multiplier(&self) -> T;

    /// σ·∇f plus any reformulation terms (elastic coefficients).
    fn evaluate_objective_gradient(&self, iterate: &mut Iterate<T>, gradient: &mut SparseVector<T>);
    /// Constraint values including any reformulation terms.
    fn evaluate_constraints(&self, iterate: &mut Iterate<T>, constraints: &mut [T]);
    fn evaluate_constraint_jacobian(
        &self,
        iterate: &mut Iterate<T>,
        jacobian: &mut [SparseVector<T>],
    );
    /// Lagrangian Hessian of the underlying model under this view's σ.
    fn evaluate_model_lagrangian_hessian(
        &self,
        x: &[T],
        multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    );

    /// Writes the split Lagrangian gradient: `objective_contribution = ∇f`
    /// (σ-free, combined at norm time) and
    /// `constraints_contribution = −Σ yⱼ∇cⱼ − z_L − z_U`.
    /// Entries for constraints with zero multiplier are skipped.
    fn evaluate_lagrangian_gradient(
        &self,
        gradient: &mut LagrangianGradient<T>,
        iterate: &mut Iterate<T>,
        multipliers: &Multipliers<T>,
    );

    fn variable_lower_bound(&self, variable_index: usize) -> T;
    fn variable_upper_bound(&self, variable_index: usize) -> T;
    fn constraint_lower_bound(&self, constraint_index: usize) -> T;
    fn constraint_upper_bound(&self, constraint_index: usize) -> T;

    fn get_lower_bounded_variables(&self) -> &[usize];
    fn get_upper_bounded_variables(&self) -> &[usize];
    fn get_single_lower_bounded_variables(&self) -> &[usize];
    fn get_single_upper_bounded_variables(&self) -> &[usize];
    fn get_equality_constraints(&self) -> &[usize];
    fn get_inequality_constraints(&self) -> &[usize];

    /// ‖σ·(objective part) + (constraints part)‖; the ℓ₁ view measures only
    /// the constraints part.
    fn stationarity_error(
        &self,
        gradient: &LagrangianGradient<T>,
        objective_multiplier: T,
        norm: Norm,
    ) -> T {
        gradient.norm(objective_multiplier, norm)
    }

    /// Complementarity error with an optional shift (μ for the central
    /// complementarity of the barrier update, 0 for termination).
    fn complementarity_error(
        &self,
        primals: &[T],
        constraints: &[T],
        multipliers: &Multipliers<T>,
        shift: T,
        norm: Norm,
    ) -> T;

    // ---------------------------------
    // progress measures and predicted reductions
    // ---------------------------------

    fn set_infeasibility_measure(&self, iterate: &mut Iterate<T>, norm: Norm);
    fn set_objective_measure(&self, iterate: &mut Iterate<T>);

    /// `‖c(x)‖ − ‖c(x) + α·Jd‖` in the progress norm.
    fn compute_predicted_infeasibility_reduction(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
        norm: Norm,
    ) -> T;

    /// `α·(−σ·gᵀd) − α²/2·dᵀHd` as a σ-affine measure.
    fn compute_predicted_objective_reduction(
        &self,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
        quadratic_term: T,
    ) -> ObjectiveMeasure<T>;

    fn number_objective_gradient_nonzeros(&self) -> usize;
    fn number_jacobian_nonzeros(&self) -> usize;
    fn number_hessian_nonzeros(&self) -> usize;
}

/// Shared piece of both views: bound-complementarity contribution of one
/// variable, both sides accumulated.
pub(crate) fn variable_complementarity<T: FloatT>(
    primal: T,
    lower_bound: T,
    upper_bound: T,
    lower_multiplier: T,
    upper_multiplier: T,
    shift: T,
) -> T {
    let mut result = T::zero();
    if lower_multiplier > T::zero() {
        result += lower_multiplier * (primal - lower_bound) - shift;
    }
    if upper_multiplier < T::zero() {
        result += upper_multiplier * (primal - upper_bound) - shift;
    }
    result
}
