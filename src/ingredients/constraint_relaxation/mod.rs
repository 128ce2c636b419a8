//! Constraint-relaxation strategies: the top-level drivers that call the
//! inequality-handling method, fall back to a feasibility (restoration)
//! subproblem on failure, and compute the primal-dual residuals feeding the
//! termination classifier.

mod feasibility_restoration;
mod l1_relaxation;

pub use feasibility_restoration::FeasibilityRestoration;
pub use l1_relaxation::L1Relaxation;

use crate::algebra::{FloatT, Norm};
use crate::callbacks::UserCallbacks;
use crate::ingredients::inequality_handling::InequalityHandlingMethod;
use crate::model::Model;
use crate::optimization::{
    Direction, Iterate, IterateStatus, Multipliers, OptimizationError, ProgressMeasures,
    WarmstartInformation,
};
use crate::reformulation::OptimizationProblem;
use crate::settings::Settings;
use crate::statistics::Statistics;

pub trait ConstraintRelaxationStrategy<T: FloatT> {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        iterate: &mut Iterate<T>,
    ) -> Result<(), OptimizationError>;

    /// Compute a direction, switching to the feasibility problem internally
    /// when the optimality subproblem fails.
    fn compute_feasible_direction(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate<T>,
        direction: &mut Direction<T>,
        trust_region_radius: T,
        warmstart_information: &mut WarmstartInformation,
    ) -> Result<(), OptimizationError>;

    fn solving_feasibility_problem(&self) -> bool;

    /// Acceptance test of a trial iterate: postprocess, compute progress
    /// measures and predicted reductions, ask the globalization strategy.
    #[allow(clippy::too_many_arguments)]
    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate<T>,
        trial_iterate: &mut Iterate<T>,
        direction: &Direction<T>,
        step_length: T,
        user_callbacks: &mut dyn UserCallbacks<T>,
    ) -> Result<bool, OptimizationError>;

    /// Requested by the solver loop when a mechanism exhausted its radius or
    /// step length.  Returns false when no feasibility fallback exists (the
    /// problem is unconstrained, restoration is already active, or the
    /// driver has no restoration phase).
    fn switch_to_feasibility_mode(
        &mut self,
        statistics: &mut Statistics,
        iterate: &mut Iterate<T>,
    ) -> bool;

    /// Residual computation and first-order classification; sets
    /// `iterate.status`.
    fn check_termination(&mut self, iterate: &mut Iterate<T>) -> IterateStatus;

    fn set_statistics(&self, statistics: &mut Statistics, iterate: &Iterate<T>);

    /// Largest variable space any of this driver's problem views exposes.
    fn maximum_number_variables(&self) -> usize;
    fn number_constraints(&self) -> usize;
}

/// State and routines shared by the concrete drivers.
pub(crate) struct RelaxationCommon<T> {
    pub progress_norm: Norm,
    pub residual_norm: Norm,
    pub residual_scaling_threshold: T,
    pub tight_tolerance: T,
    pub loose_tolerance: T,
    pub loose_tolerance_consecutive_iteration_threshold: u32,
    pub loose_tolerance_consecutive_iterations: u32,
    pub unbounded_objective_threshold: T,
    /// line-search mechanisms use first-order predicted reductions
    pub first_order_predicted_reduction: bool,
}

impl<T: FloatT> RelaxationCommon<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            progress_norm: settings.progress_norm(),
            residual_norm: settings.residual_norm(),
            residual_scaling_threshold: settings.residual_scaling_threshold,
            tight_tolerance: settings.tolerance,
            loose_tolerance: settings.loose_tolerance,
            loose_tolerance_consecutive_iteration_threshold: settings
                .loose_tolerance_consecutive_iteration_threshold,
            loose_tolerance_consecutive_iterations: 0,
            unbounded_objective_threshold: settings.unbounded_objective_threshold,
            first_order_predicted_reduction: settings.globalization_mechanism == "LS",
        }
    }

    /// All three progress measures of an iterate under a problem view.
    pub fn evaluate_progress_measures(
        &self,
        method: &dyn InequalityHandlingMethod<T>,
        problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        problem.set_infeasibility_measure(iterate, self.progress_norm);
        problem.set_objective_measure(iterate);
        method.set_auxiliary_measure(problem, iterate);
    }

    /// The (infeasibility, objective(σ), auxiliary) predicted reductions of
    /// a direction at a given step length.
    pub fn compute_predicted_reductions(
        &self,
        method: &dyn InequalityHandlingMethod<T>,
        problem: &dyn OptimizationProblem<T>,
        current_iterate: &Iterate<T>,
        direction: &Direction<T>,
        step_length: T,
    ) -> ProgressMeasures<T> {
        let quadratic_term = if self.first_order_predicted_reduction {
            T::zero()
        } else {
            method.hessian_quadratic_product(&direction.primals[..direction.number_variables])
        };
        ProgressMeasures {
            infeasibility: problem.compute_predicted_infeasibility_reduction(
                current_iterate,
                &direction.primals[..direction.number_variables],
                step_length,
                self.progress_norm,
            ),
            objective: problem.compute_predicted_objective_reduction(
                current_iterate,
                &direction.primals[..direction.number_variables],
                step_length,
                quadratic_term,
            ),
            auxiliary: method.compute_predicted_auxiliary_reduction(
                problem,
                current_iterate,
                &direction.primals[..direction.number_variables],
                step_length,
            ),
        }
    }

    /// Compute both residual streams from a single set of evaluations.
    pub fn compute_primal_dual_residuals(
        &self,
        model: &dyn Model<T>,
        optimality_problem: &dyn OptimizationProblem<T>,
        feasibility_problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    ) {
        iterate.evaluate_objective_gradient(model);
        iterate.evaluate_constraints(model);
        iterate.evaluate_constraint_jacobian(model);

        // stationarity: KKT with the standard multipliers and the current σ,
        // feasibility with the feasibility multipliers and σ = 0
        let multipliers = iterate.multipliers.clone();
        let mut gradient = std::mem::take(&mut iterate.residuals.lagrangian_gradient);
        optimality_problem.evaluate_lagrangian_gradient(&mut gradient, iterate, &multipliers);
        iterate.residuals.lagrangian_gradient = gradient;
        iterate.residuals.stationarity = optimality_problem.stationarity_error(
            &iterate.residuals.lagrangian_gradient,
            iterate.objective_multiplier,
            self.residual_norm,
        );

        let feasibility_multipliers = iterate.feasibility_multipliers.clone();
        let mut gradient = std::mem::take(&mut iterate.feasibility_residuals.lagrangian_gradient);
        feasibility_problem.evaluate_lagrangian_gradient(
            &mut gradient,
            iterate,
            &feasibility_multipliers,
        );
        iterate.feasibility_residuals.lagrangian_gradient = gradient;
        iterate.feasibility_residuals.stationarity = feasibility_problem.stationarity_error(
            &iterate.feasibility_residuals.lagrangian_gradient,
            T::zero(),
            self.residual_norm,
        );

        // constraint violation of the original problem
        iterate.primal_feasibility =
            model.constraint_violation(&iterate.evaluations.constraints, self.residual_norm);

        // complementarity errors (unshifted)
        iterate.residuals.complementarity = optimality_problem.complementarity_error(
            &iterate.primals,
            &iterate.evaluations.constraints,
            &iterate.multipliers,
            T::zero(),
            self.residual_norm,
        );
        iterate.feasibility_residuals.complementarity = feasibility_problem.complementarity_error(
            &iterate.primals,
            &iterate.evaluations.constraints,
            &iterate.feasibility_multipliers,
            T::zero(),
            self.residual_norm,
        );

        // scaling factors
        iterate.residuals.stationarity_scaling =
            self.compute_stationarity_scaling(model, &iterate.multipliers);
        iterate.residuals.complementarity_scaling =
            self.compute_complementarity_scaling(model, &iterate.multipliers);
        iterate.feasibility_residuals.stationarity_scaling =
            self.compute_stationarity_scaling(model, &iterate.feasibility_multipliers);
        iterate.feasibility_residuals.complementarity_scaling =
            self.compute_complementarity_scaling(model, &iterate.feasibility_multipliers);
    }

    fn compute_stationarity_scaling(&self, model: &dyn Model<T>, multipliers: &Multipliers<T>) -> T {
        let total_size = model.get_lower_bounded_variables().len()
            + model.get_upper_bounded_variables().len()
            + model.number_constraints();
        if total_size == 0 {
            return T::one();
        }
        let scaling_factor =
            self.residual_scaling_threshold * T::from_usize(total_size).unwrap_or_else(T::one);
        let multiplier_norm = multipliers.norm_one();
        T::max(T::one(), multiplier_norm / scaling_factor)
    }

    fn compute_complementarity_scaling(
        &self,
        model: &dyn Model<T>,
        multipliers: &Multipliers<T>,
    ) -> T {
        let total_size = model.get_lower_bounded_variables().len()
            + model.get_upper_bounded_variables().len();
        if total_size == 0 {
            return T::one();
        }
        let scaling_factor =
            self.residual_scaling_threshold * T::from_usize(total_size).unwrap_or_else(T::one);
        let number_variables = model.number_variables();
        let bound_multiplier_norm: T = multipliers.lower_bounds[..number_variables]
            .iter()
            .chain(multipliers.upper_bounds[..number_variables].iter())
            .fold(T::zero(), |acc, z| acc + z.abs());
        T::max(T::one(), bound_multiplier_norm / scaling_factor)
    }

    /// First-order classification at a given tolerance.
    fn check_first_order_convergence(
        &self,
        model: &dyn Model<T>,
        iterate: &Iterate<T>,
        tolerance: T,
    ) -> IterateStatus {
        let residuals = &iterate.residuals;
        let stationarity =
            residuals.stationarity / residuals.stationarity_scaling <= tolerance;
        let primal_feasibility = iterate.primal_feasibility <= tolerance;
        let complementarity =
            residuals.complementarity / residuals.complementarity_scaling <= tolerance;

        let feasibility_residuals = &iterate.feasibility_residuals;
        let feasibility_stationarity = feasibility_residuals.stationarity
            / feasibility_residuals.stationarity_scaling
            <= tolerance;
        let feasibility_complementarity = feasibility_residuals.complementarity
            / feasibility_residuals.complementarity_scaling
            <= tolerance;
        let no_trivial_feasibility_duals = iterate
            .feasibility_multipliers
            .not_all_zero(model.number_variables(), tolerance);
        let no_trivial_duals = iterate
            .multipliers
            .not_all_zero(model.number_variables(), tolerance);

        if stationarity && primal_feasibility && complementarity {
            if iterate.objective_multiplier > T::zero() {
                return IterateStatus::FeasibleKktPoint;
            } else if no_trivial_duals {
                return IterateStatus::FeasibleFjPoint;
            }
        }
        if model.is_constrained()
            && feasibility_stationarity
            && !primal_feasibility
            && feasibility_complementarity
            && no_trivial_feasibility_duals
        {
            return IterateStatus::InfeasibleStationaryPoint;
        }
        IterateStatus::NotOptimal
    }

    /// Shared termination: unboundedness, then the tight tolerance, then the
    /// loose tolerance held over several consecutive iterations.
    pub fn check_termination(
        &mut self,
        model: &dyn Model<T>,
        optimality_problem: &dyn OptimizationProblem<T>,
        feasibility_problem: &dyn OptimizationProblem<T>,
        iterate: &mut Iterate<T>,
    ) -> IterateStatus {
        if iterate.is_objective_computed
            && iterate.evaluations.objective < self.unbounded_objective_threshold
        {
            iterate.status = IterateStatus::Unbounded;
            return iterate.status;
        }

        self.compute_primal_dual_residuals(model, optimality_problem, feasibility_problem, iterate);

        let status_tight =
            self.check_first_order_convergence(model, iterate, self.tight_tolerance);
        if status_tight != IterateStatus::NotOptimal
            || self.loose_tolerance <= self.tight_tolerance
        {
            iterate.status = status_tight;
            return iterate.status;
        }

        // a strictly looser tolerance must hold for several consecutive
        // iterations before it terminates the solver
        let status_loose =
            self.check_first_order_convergence(model, iterate, self.loose_tolerance);
        if status_loose != IterateStatus::NotOptimal {
            self.loose_tolerance_consecutive_iterations += 1;
            if self.loose_tolerance_consecutive_iterations
                >= self.loose_tolerance_consecutive_iteration_threshold
            {
                iterate.status = status_loose;
                return iterate.status;
            }
        } else {
            self.loose_tolerance_consecutive_iterations = 0;
        }
        iterate.status = IterateStatus::NotOptimal;
        iterate.status
    }

    pub fn set_statistics(
        &self,
        statistics: &mut Statistics,
        model: &dyn Model<T>,
        iterate: &Iterate<T>,
    ) {
        if iterate.is_objective_computed {
            statistics.set_float("objective", iterate.evaluations.objective);
        }
        if model.is_constrained() {
            statistics.set_float("primal feas", iterate.primal_feasibility);
        }
        statistics.set_float("stationarity", iterate.residuals.stationarity);
        statistics.set_float("complementarity", iterate.residuals.complementarity);
    }
}

/// Registers the residual columns every driver reports.
pub(crate) fn initialize_common_statistics(statistics: &mut Statistics) {
    statistics.add_column("objective", Statistics::DOUBLE_WIDTH, 10);
    statistics.add_column("primal feas", Statistics::DOUBLE_WIDTH, 12);
    statistics.add_column("stationarity", Statistics::DOUBLE_WIDTH, 14);
    statistics.add_column("complementarity", Statistics::DOUBLE_WIDTH + 2, 16);
    statistics.add_column("status", Statistics::STRING_WIDTH, 100);
}

/// Instantiate a constraint-relaxation strategy over a model.
pub fn create_constraint_relaxation_strategy<'a, T: FloatT>(
    model: &'a dyn Model<T>,
    settings: &Settings<T>,
) -> Result<Box<dyn ConstraintRelaxationStrategy<T> + 'a>, OptimizationError> {
    match settings.constraint_relaxation_strategy.as_str() {
        "feasibility_restoration" => Ok(Box::new(FeasibilityRestoration::new(model, settings)?)),
        "l1_relaxation" => Ok(Box::new(L1Relaxation::new(model, settings)?)),
        name => Err(OptimizationError::InvalidConfiguration(format!(
            "unknown constraint relaxation strategy: {name}"
        ))),
    }
}
