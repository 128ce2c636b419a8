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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Optimality,
    Feasibility,
}

/// Feasibility restoration driver: attempt the optimality subproblem; on an
/// infeasible subproblem (or a restoration request from the globalization
/// strategy) switch to the ℓ₁ feasibility problem with σ = 0, and return to
/// optimality once the constraint violation has sufficiently decreased.
pub struct FeasibilityRestoration<'a, T: FloatT> {
    model: &'a dyn Model<T>,
    optimality_problem: OptimalityProblem<'a, T>,
    feasibility_problem: L1RelaxedProblem<'a, T>,
    method: Box<dyn InequalityHandlingMethod<T>>,
    globalization_strategy: Box<dyn GlobalizationStrategy<T>>,
    hessian_model: HessianModel<T>,
    common: RelaxationCommon<T>,
    mode: Mode,
    /// model constraint violation when restoration was entered
    reference_infeasibility: T,
    infeasibility_reduction_target: T,
}

impl<'a, T: FloatT> FeasibilityRestoration<'a, T> {
    pub fn new(model: &'a dyn Model<T>, settings: &Settings<T>) -> Result<Self, OptimizationError> {
        Ok(Self {
            model,
            optimality_problem: OptimalityProblem::new(model),
            feasibility_problem: L1RelaxedProblem::new(
                model,
                T::zero(),
                settings.l1_constraint_violation_coefficient,
            ),
            method: create_inequality_handling_method(settings)?,
            globalization_strategy: create_globalization_strategy(settings)?,
            hessian_model: create_hessian_model(&settings.hessian_model)?,
            common: RelaxationCommon::new(settings),
            mode: Mode::Optimality,
            reference_infeasibility: T::infinity(),
            infeasibility_reduction_target: (0.1).as_T(),
        })
    }

    fn current_problem(&self) -> &dyn OptimizationProblem<T> {
        match self.mode {
            Mode::Optimality => &self.optimality_problem,
            Mode::Feasibility => &self.feasibility_problem,
        }
    }

    fn switch_to_feasibility_problem(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate<T>,
    ) {
        statistics.notice("switching to the feasibility problem");
        self.mode = Mode::Feasibility;
        self.reference_infeasibility = current_iterate.primal_feasibility;

        self.method
            .initialize_feasibility_problem(&self.feasibility_problem, current_iterate);

        // the progress measures now live in the relaxed geometry
        self.globalization_strategy.reset();
        self.common.evaluate_progress_measures(
            self.method.as_ref(),
            &self.feasibility_problem,
            current_iterate,
        );
        self.globalization_strategy
            .register_current_progress(&current_iterate.progress);
        self.method.clear_subproblem_definition_changed();
    }

    fn switch_to_optimality_problem(
        &mut self,
        statistics: &mut Statistics,
        trial_iterate: &mut Iterate<T>,
    ) {
        statistics.notice("infeasibility sufficiently reduced, back to the optimality problem");
        self.mode = Mode::Optimality;
        self.method
            .exit_feasibility_problem(&self.optimality_problem, trial_iterate);
        trial_iterate.set_number_variables(self.optimality_problem.number_variables());
        trial_iterate.objective_multiplier = T::one();

        self.globalization_strategy.reset();
        self.common.evaluate_progress_measures(
            self.method.as_ref(),
            &self.optimality_problem,
            trial_iterate,
        );
        self.globalization_strategy
            .register_current_progress(&trial_iterate.progress);
        self.method.clear_subproblem_definition_changed();
    }

    /// Return-to-optimality test on the model constraint violation of an
    /// accepted restoration iterate.
    fn infeasibility_sufficiently_reduced(&mut self, trial_iterate: &mut Iterate<T>) -> bool {
        trial_iterate.evaluate_constraints(self.model);
        let trial_infeasibility = self.model.constraint_violation(
            &trial_iterate.evaluations.constraints,
            self.common.progress_norm,
        );
        trial_infeasibility
            <= T::max(
                self.common.tight_tolerance,
                self.infeasibility_reduction_target * self.reference_infeasibility,
            )
    }
}

impl<T: FloatT> ConstraintRelaxationStrategy<T> for FeasibilityRestoration<'_, T> {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        iterate: &mut Iterate<T>,
    ) -> Result<(), OptimizationError> {
        initialize_common_statistics(statistics);
        self.method.initialize_statistics(statistics);

        // size the method for the largest view it will see
        self.method
            .initialize(&self.feasibility_problem, &self.hessian_model)?;
        self.method
            .generate_initial_iterate(statistics, &self.optimality_problem, iterate)?;

        self.common.evaluate_progress_measures(
            self.method.as_ref(),
            &self.optimality_problem,
            iterate,
        );
        iterate.objective_multiplier = T::one();
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
        // a Waechter-style strategy may request restoration outright
        if self.mode == Mode::Optimality
            && self.globalization_strategy.restoration_recommended()
            && self.model.is_constrained()
        {
            self.switch_to_feasibility_problem(statistics, current_iterate);
            warmstart_information.set_whole_problem_changed();
        }

        if self.mode == Mode::Optimality {
            let multipliers = current_iterate.multipliers.clone();
            self.method.solve(
                statistics,
                &self.optimality_problem,
                current_iterate,
                &multipliers,
                direction,
                &mut self.hessian_model,
                trust_region_radius,
                warmstart_information,
            )?;
            if direction.status != SubproblemStatus::Infeasible {
                return Ok(());
            }
            // infeasible subproblem: relax the constraints and retry
            if !self.model.is_constrained() {
                return Err(OptimizationError::SubproblemSolver(
                    "the subproblem of an unconstrained problem is infeasible".to_string(),
                ));
            }
            self.switch_to_feasibility_problem(statistics, current_iterate);
            warmstart_information.set_whole_problem_changed();
        }

        let feasibility_multipliers = current_iterate.feasibility_multipliers.clone();
        self.method.solve(
            statistics,
            &self.feasibility_problem,
            current_iterate,
            &feasibility_multipliers,
            direction,
            &mut self.hessian_model,
            trust_region_radius,
            warmstart_information,
        )?;
        if direction.status == SubproblemStatus::Infeasible {
            // the relaxed problem is always feasible: this is fatal
            return Err(OptimizationError::SubproblemSolver(
                "the restoration subproblem is infeasible".to_string(),
            ));
        }
        Ok(())
    }

    fn solving_feasibility_problem(&self) -> bool {
        self.mode == Mode::Feasibility
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
        let solving_feasibility = self.mode == Mode::Feasibility;

        // postprocess the trial duals of the active stream
        {
            let problem = self.current_problem();
            if solving_feasibility {
                let mut multipliers = std::mem::take(&mut trial_iterate.feasibility_multipliers);
                self.method
                    .postprocess_iterate(problem, &mut trial_iterate.primals, &mut multipliers);
                trial_iterate.feasibility_multipliers = multipliers;
            } else {
                let mut multipliers = std::mem::take(&mut trial_iterate.multipliers);
                self.method
                    .postprocess_iterate(problem, &mut trial_iterate.primals, &mut multipliers);
                trial_iterate.multipliers = multipliers;
            }
        }
        trial_iterate.objective_multiplier = self.current_problem().get_objective_multiplier();

        // a redefined subproblem resets the strategy and the auxiliary
        // measure of the current iterate
        if self.method.subproblem_definition_changed() {
            self.globalization_strategy.reset();
            let problem = self.current_problem();
            self.method.set_auxiliary_measure(problem, current_iterate);
            self.globalization_strategy
                .register_current_progress(&current_iterate.progress);
            self.method.clear_subproblem_definition_changed();
        }

        {
            let problem = self.current_problem();
            self.common
                .evaluate_progress_measures(self.method.as_ref(), problem, trial_iterate);
        }

        let accept = if direction.norm == T::zero() {
            statistics.set_string("status", "accepted (0 primal step)");
            trial_iterate.evaluate_objective(self.model);
            true
        } else {
            let (predicted_reduction, objective_multiplier) = {
                let problem = self.current_problem();
                (
                    self.common.compute_predicted_reductions(
                        self.method.as_ref(),
                        problem,
                        current_iterate,
                        direction,
                        step_length,
                    ),
                    problem.get_objective_multiplier(),
                )
            };
            self.globalization_strategy.is_iterate_acceptable(
                statistics,
                &current_iterate.progress,
                &trial_iterate.progress,
                &predicted_reduction,
                objective_multiplier,
            )
        };

        if accept {
            user_callbacks.notify_acceptable_iterate(
                &trial_iterate.primals,
                &trial_iterate.multipliers,
                trial_iterate.objective_multiplier,
            );
            if solving_feasibility && self.infeasibility_sufficiently_reduced(trial_iterate) {
                self.switch_to_optimality_problem(statistics, trial_iterate);
            }
        }
        Ok(accept)
    }

    fn switch_to_feasibility_mode(
        &mut self,
        statistics: &mut Statistics,
        iterate: &mut Iterate<T>,
    ) -> bool {
        if self.mode == Mode::Feasibility || !self.model.is_constrained() {
            return false;
        }
        self.switch_to_feasibility_problem(statistics, iterate);
        true
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
        self.feasibility_problem.number_variables()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }
}
