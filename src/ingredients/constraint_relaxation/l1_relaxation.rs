use super::{
    initialize_common_statistics, ConstraintRelaxationStrategy, RelaxationCommon,
};
use crate::algebra::{AsFloatT, FloatT};
use crate::callbacks::UserCallbacks;
use crate::ingredients::globalization_strategies::{
    create_globalization_strategy, GlobalizationStrategy,
};
use crate::ingredients::hessian_models::{create_hessian_model, HessianModel};
use crate::ingredients::inequality_handling::{
    create_inequality_handling_method, InequalityHandlingMethod,
};
use crate::model::Model;
use crate::optimization::{
    Direction, Iterate, IterateStatus, OptimizationError, SubproblemStatus, WarmstartInformation,
};
use crate::reformulation::{L1RelaxedProblem, OptimalityProblem, OptimizationProblem};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// ℓ₁ relaxation driver: a single ℓ₁-penalized problem
///
/// ```text
///   minimize σ·f(x) + ρ·Σ(p + n)   s.t.  relaxed constraints
/// ```
///
/// is used throughout.  The objective multiplier σ is steered downward
/// (Byrd-Nocedal-Waltz style) whenever the relaxed direction fails to
/// reduce the linearized infeasibility by a fraction of what pure
/// restoration could achieve.
pub struct L1Relaxation<'a, T: FloatT> {
    model: &'a dyn Model<T>,
    optimality_problem: OptimalityProblem<'a, T>,
    relaxed_problem: L1RelaxedProblem<'a, T>,
    feasibility_problem: L1RelaxedProblem<'a, T>,
    method: Box<dyn InequalityHandlingMethod<T>>,
    globalization_strategy: Box<dyn GlobalizationStrategy<T>>,
    hessian_model: HessianModel<T>,
    common: RelaxationCommon<T>,
    penalty_parameter: T,
    smallest_penalty_parameter: T,
    decrease_factor: T,
    epsilon1: T,
    epsilon2: T,
}

impl<'a, T: FloatT> L1Relaxation<'a, T> {
    pub fn new(model: &'a dyn Model<T>, settings: &Settings<T>) -> Result<Self, OptimizationError> {
        let rho = settings.l1_constraint_violation_coefficient;
        Ok(Self {
            model,
            optimality_problem: OptimalityProblem::new(model),
            relaxed_problem: L1RelaxedProblem::new(
                model,
                settings.l1_relaxation_initial_parameter,
                rho,
            ),
            feasibility_problem: L1RelaxedProblem::new(model, T::zero(), rho),
            method: create_inequality_handling_method(settings)?,
            globalization_strategy: create_globalization_strategy(settings)?,
            hessian_model: create_hessian_model(&settings.hessian_model)?,
            common: RelaxationCommon::new(settings),
            penalty_parameter: settings.l1_relaxation_initial_parameter,
            smallest_penalty_parameter: (1e-10).as_T(),
            decrease_factor: settings.l1_relaxation_decrease_factor,
            epsilon1: settings.l1_relaxation_epsilon1,
            epsilon2: settings.l1_relaxation_epsilon2,
        })
    }

    /// Linearized infeasibility reduction achieved by a direction.
    fn linearized_reduction(&self, current_iterate: &Iterate<T>, direction: &Direction<T>) -> T {
        let current = self.model.constraint_violation(
            &current_iterate.evaluations.constraints,
            self.common.progress_norm,
        );
        let linearized = self.model.linearized_constraint_violation(
            &direction.primals[..direction.number_variables],
            &current_iterate.evaluations.constraints,
            &current_iterate.evaluations.constraint_jacobian,
            T::one(),
            self.common.progress_norm,
        );
        current - linearized
    }

    fn solve_relaxed_subproblem(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate<T>,
        direction: &mut Direction<T>,
        trust_region_radius: T,
        warmstart_information: &mut WarmstartInformation,
    ) -> Result<(), OptimizationError> {
        let multipliers = current_iterate.multipliers.clone();
        self.method.solve(
            statistics,
            &self.relaxed_problem,
            current_iterate,
            &multipliers,
            direction,
            &mut self.hessian_model,
            trust_region_radius,
            warmstart_information,
        )
    }
}

impl<T: FloatT> ConstraintRelaxationStrategy<T> for L1Relaxation<'_, T> {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        iterate: &mut Iterate<T>,
    ) -> Result<(), OptimizationError> {
        initialize_common_statistics(statistics);
        self.method.initialize_statistics(statistics);

        self.method
            .initialize(&self.relaxed_problem, &self.hessian_model)?;
        self.method
            .generate_initial_iterate(statistics, &self.relaxed_problem, iterate)?;
        // seed the elastics so the relaxed constraints hold at the start
        self.method
            .set_elastic_variable_values(&self.relaxed_problem, iterate);

        self.common.evaluate_progress_measures(
            self.method.as_ref(),
            &self.relaxed_problem,
            iterate,
        );
        iterate.objective_multiplier = self.penalty_parameter;
        self.globalization_strategy.initialize(statistics, iterate);
        Ok(())
    }

    fn compute_feasible_direction(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate<T>,
        direction: &mut Direction<T>,
        trust_region_radius: T,
        warmstart_information: &mut WarmstartInformation,
    ) -> Result<(), OptimizationError> {
        self.solve_relaxed_subproblem(
            statistics,
            current_iterate,
            direction,
            trust_region_radius,
            warmstart_information,
        )?;
        if direction.status != SubproblemStatus::Optimal
            || self.penalty_parameter == T::zero()
            || !self.model.is_constrained()
        {
            return Ok(());
        }

        // steering: if the relaxed direction barely reduces the linearized
        // infeasibility, compare against what pure restoration achieves and
        // decrease σ until a fraction of that ideal reduction is reached
        current_iterate.evaluate_constraints(self.model);
        current_iterate.evaluate_constraint_jacobian(self.model);
        let current_infeasibility = self.model.constraint_violation(
            &current_iterate.evaluations.constraints,
            self.common.progress_norm,
        );
        if current_infeasibility <= self.common.tight_tolerance {
            return Ok(());
        }
        let achieved = self.linearized_reduction(current_iterate, direction);
        if achieved >= self.epsilon1 * current_infeasibility {
            return Ok(());
        }

        // ideal reduction under σ = 0
        let mut restoration_direction = Direction::new(
            self.maximum_number_variables(),
            self.model.number_constraints(),
        );
        let feasibility_multipliers = current_iterate.feasibility_multipliers.clone();
        warmstart_information.set_whole_problem_changed();
        self.method.solve(
            statistics,
            &self.feasibility_problem,
            current_iterate,
            &feasibility_multipliers,
            &mut restoration_direction,
            &mut self.hessian_model,
            trust_region_radius,
            warmstart_information,
        )?;
        let ideal_reduction =
            self.linearized_reduction(current_iterate, &restoration_direction);

        while self.linearized_reduction(current_iterate, direction)
            < self.epsilon2 * ideal_reduction
            && self.penalty_parameter > self.smallest_penalty_parameter
        {
            self.penalty_parameter /= self.decrease_factor;
            statistics.notice("decreasing the penalty objective multiplier");
            self.relaxed_problem
                .set_objective_multiplier(self.penalty_parameter);
            warmstart_information.set_whole_problem_changed();
            self.solve_relaxed_subproblem(
                statistics,
                current_iterate,
                direction,
                trust_region_radius,
                warmstart_information,
            )?;
            if direction.status != SubproblemStatus::Optimal {
                return Ok(());
            }
        }
        Ok(())
    }

    fn solving_feasibility_problem(&self) -> bool {
        false
    }

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate<T>,
        trial_iterate: &mut Iterate<T>,
        direction: &Direction<T>,
        step_length: T,
        user_callbacks: &mut dyn UserCallbacks<T>,
    ) -> Result<bool, OptimizationError> {
        {
            let mut multipliers = std::mem::take(&mut trial_iterate.multipliers);
            self.method.postprocess_iterate(
                &self.relaxed_problem,
                &mut trial_iterate.primals,
                &mut multipliers,
            );
            trial_iterate.multipliers = multipliers;
        }
        trial_iterate.objective_multiplier = self.penalty_parameter;

        if self.method.subproblem_definition_changed() {
            self.globalization_strategy.reset();
            self.method
                .set_auxiliary_measure(&self.relaxed_problem, current_iterate);
            self.globalization_strategy
                .register_current_progress(&current_iterate.progress);
            self.method.clear_subproblem_definition_changed();
        }

        self.common.evaluate_progress_measures(
            self.method.as_ref(),
            &self.relaxed_problem,
            trial_iterate,
        );

        let accept = if direction.norm == T::zero() {
            statistics.set_string("status", "accepted (0 primal step)");
            trial_iterate.evaluate_objective(self.model);
            true
        } else {
            let predicted_reduction = self.common.compute_predicted_reductions(
                self.method.as_ref(),
                &self.relaxed_problem,
                current_iterate,
                direction,
                step_length,
            );
            self.globalization_strategy.is_iterate_acceptable(
                statistics,
                &current_iterate.progress,
                &trial_iterate.progress,
                &predicted_reduction,
                self.penalty_parameter,
            )
        };

        if accept {
            user_callbacks.notify_acceptable_iterate(
                &trial_iterate.primals,
                &trial_iterate.multipliers,
                trial_iterate.objective_multiplier,
            );
        }
        Ok(accept)
    }

    fn switch_to_feasibility_mode(
        &mut self,
        _statistics: &mut Statistics,
        _iterate: &mut Iterate<T>,
    ) -> bool {
        // the ℓ₁ relaxation has no separate restoration phase; σ steering is
        // its only fallback
        false
    }

    fn check_termination(&mut self, iterate: &mut Iterate<T>) -> IterateStatus {
        self.common.check_termination(
            self.model,
            &self.optimality_problem,
            &self.feasibility_problem,
            iterate,
        )
    }

    fn set_statistics(&self, statistics: &mut Statistics, iterate: &Iterate<T>) {
        self.common.set_statistics(statistics, self.model, iterate);
    }

    fn maximum_number_variables(&self) -> usize {
        self.relaxed_problem.number_variables()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }
}
