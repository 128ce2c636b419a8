//! Inequality-handling methods: produce a primal-dual direction from the
//! current iterate, either through an external QP solver (SQP) or through a
//! primal-dual interior-point iteration on the barrier subproblem.

pub mod interior_point;
mod qp;

pub use interior_point::InteriorPointMethod;
pub use qp::QpMethod;

use crate::algebra::FloatT;
use crate::ingredients::hessian_models::HessianModel;
use crate::optimization::{
    Direction, Iterate, Multipliers, OptimizationError, WarmstartInformation,
};
use crate::reformulation::{L1RelaxedProblem, OptimizationProblem};
use crate::settings::Settings;
use crate::statistics::Statistics;

pub trait InequalityHandlingMethod<T: FloatT> {
    /// Validate the problem shape and size the internal workspace.  Called
    /// once with the largest problem view this method will see.
    fn initialize(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        hessian_model: &HessianModel<T>,
    ) -> Result<(), OptimizationError>;

    fn initialize_statistics(&self, statistics: &mut Statistics);

    /// Prepare the initial iterate (interior push, slack seeding,
    /// least-squares multipliers).
    fn generate_initial_iterate(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    ) -> Result<(), OptimizationError>;

    /// Compute a direction from the current iterate.  `current_multipliers`
    /// selects the dual stream (standard or feasibility).
    #[allow(clippy::too_many_arguments)]
    fn solve(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem<T>,
        current_iterate: &mut Iterate<T>,
        current_multipliers: &Multipliers<T>,
        direction: &mut Direction<T>,
        hessian_model: &mut HessianModel<T>,
        trust_region_radius: T,
        warmstart_information: &mut WarmstartInformation,
    ) -> Result<(), OptimizationError>;

    /// dᵀHd of the last local model; used by second-order predicted
    /// reductions.
    fn hessian_quadratic_product(&self, primal_direction: &[T]) -> T;

    /// Write the auxiliary progress measure (barrier terms or 0).
    fn set_auxiliary_measure(&self, problem: &dyn OptimizationProblem<T>, iterate: &mut Iterate<T>);

    /// Predicted reduction of the auxiliary measure along `primal_direction`.
    fn compute_predicted_auxiliary_reduction(
        &self,
        problem: &dyn OptimizationProblem<T>,
        iterate: &Iterate<T>,
        primal_direction: &[T],
        step_length: T,
    ) -> T;

    /// Entering the feasibility (restoration) problem.
    fn initialize_feasibility_problem(
        &mut self,
        problem: &L1RelaxedProblem<T>,
        iterate: &mut Iterate<T>,
    );

    /// Recompute the elastic variables and their duals at the current point.
    fn set_elastic_variable_values(
        &self,
        problem: &L1RelaxedProblem<T>,
        iterate: &mut Iterate<T>,
    );

    /// Leaving the feasibility problem: restore the pre-switch state.
    fn exit_feasibility_problem(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    );

    /// Hook applied to every trial iterate before the acceptance test
    /// (bound-multiplier reset for the interior-point method).
    fn postprocess_iterate(
        &self,
        problem: &dyn OptimizationProblem<T>,
        primals: &mut [T],
        multipliers: &mut Multipliers<T>,
    );

    /// True when the subproblem was redefined (barrier update, mode switch);
    /// the globalization strategy resets and the auxiliary measure is
    /// recomputed.
    fn subproblem_definition_changed(&self) -> bool;
    fn clear_subproblem_definition_changed(&mut self);
}

/// Instantiate an inequality-handling method from the settings.
pub fn create_inequality_handling_method<T: FloatT>(
    settings: &Settings<T>,
) -> Result<Box<dyn InequalityHandlingMethod<T>>, OptimizationError> {
    match settings.inequality_handling_method.as_str() {
        "QP" => Ok(Box::new(QpMethod::new(settings)?)),
        "IPM" => Ok(Box::new(InteriorPointMethod::new(settings)?)),
        name => Err(OptimizationError::InvalidConfiguration(format!(
            "unknown inequality handling method: {name}"
        ))),
    }
}
