//! Top-level controller: ingredient construction, the outer iteration loop,
//! termination and result assembly.

use crate::algebra::FloatT;
use crate::callbacks::{NoUserCallbacks, UserCallbacks};
use crate::ingredients::constraint_relaxation::create_constraint_relaxation_strategy;
use crate::ingredients::globalization_mechanisms::create_globalization_mechanism;
use crate::model::{EqualityConstrainedModel, Model};
use crate::optimization::{
    Iterate, IterateStatus, Multipliers, OptimizationError, OptimizationStatus,
};
use crate::settings::Settings;
use crate::statistics::Statistics;
use std::time::Instant;

/// Final state of a `solve` call: the last accepted iterate in the original
/// model's variable space, with its residuals and counters.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T = f64> {
    pub status: OptimizationStatus,
    pub iterate_status: IterateStatus,
    pub primals: Vec<T>,
    pub objective: T,
    pub multipliers: Multipliers<T>,
    pub objective_multiplier: T,
    pub primal_feasibility: T,
    pub stationarity: T,
    pub complementarity: T,
    pub iteration_count: u32,
    pub solve_time: f64,
}

pub struct Solver<T: FloatT> {
    settings: Settings<T>,
}

impl<T: FloatT> Solver<T> {
    pub fn new(settings: Settings<T>) -> Result<Self, OptimizationError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &Settings<T> {
        &self.settings
    }

    pub fn solve(&self, model: &dyn Model<T>) -> Result<OptimizationResult<T>, OptimizationError> {
        self.solve_with_callbacks(model, &mut NoUserCallbacks)
    }

    pub fn solve_with_callbacks(
        &self,
        model: &dyn Model<T>,
        user_callbacks: &mut dyn UserCallbacks<T>,
    ) -> Result<OptimizationResult<T>, OptimizationError> {
        validate_problem(model)?;
        let start_time = Instant::now();

        // the interior-point method works on the equality-constrained
        // reformulation with slacks
        let equality_model;
        let solver_model: &dyn Model<T> = if self.settings.inequality_handling_method == "IPM" {
            equality_model = EqualityConstrainedModel::new(model);
            &equality_model
        } else {
            model
        };

        let mut constraint_relaxation_strategy =
            create_constraint_relaxation_strategy(solver_model, &self.settings)?;
        let mut globalization_mechanism = create_globalization_mechanism(&self.settings)?;

        let mut statistics = Statistics::new(self.settings.verbose);
        statistics.add_column("iter", Statistics::INT_WIDTH, 0);
        statistics.add_column("step norm", Statistics::DOUBLE_WIDTH, 20);
        globalization_mechanism.initialize_statistics(&mut statistics);

        // initial iterate from the model's starting point
        let mut current_iterate = Iterate::new(
            solver_model.number_variables(),
            solver_model.number_constraints(),
        );
        solver_model.initial_primal_point(&mut current_iterate.primals);
        solver_model.initial_dual_point(&mut current_iterate.multipliers.constraints);
        current_iterate.invalidate_evaluations();
        constraint_relaxation_strategy.initialize(&mut statistics, &mut current_iterate)?;

        // the starting point may already satisfy the termination criteria
        let mut iterate_status =
            constraint_relaxation_strategy.check_termination(&mut current_iterate);
        statistics.start_new_line();
        statistics.set_integer("iter", 0);
        constraint_relaxation_strategy.set_statistics(&mut statistics, &current_iterate);
        statistics.print_current_line();

        let mut iteration: u32 = 0;
        let mut optimization_status = OptimizationStatus::NotOptimal;
        while iterate_status == IterateStatus::NotOptimal {
            if user_callbacks.user_requested_stop() {
                optimization_status = OptimizationStatus::UserRequestedStop;
                break;
            }
            if iteration >= self.settings.max_iterations {
                optimization_status = OptimizationStatus::IterationLimit;
                break;
            }
            iteration += 1;
            statistics.start_new_line();
            statistics.set_integer("iter", iteration as usize);

            match globalization_mechanism.compute_acceptable_iterate(
                &mut statistics,
                constraint_relaxation_strategy.as_mut(),
                &mut current_iterate,
                user_callbacks,
            ) {
                Ok(trial_iterate) => {
                    current_iterate = trial_iterate;
                }
                Err(
                    error @ (OptimizationError::InvalidConfiguration(_)
                    | OptimizationError::InvalidProblem(_)),
                ) => return Err(error),
                Err(
                    error @ (OptimizationError::StepLengthBelowMinimum
                    | OptimizationError::TrustRegionBelowMinimum),
                ) => {
                    // exhausted mechanism: fall back to the feasibility
                    // problem if the driver has one, otherwise give up
                    if constraint_relaxation_strategy
                        .switch_to_feasibility_mode(&mut statistics, &mut current_iterate)
                    {
                        continue;
                    }
                    statistics.notice(&format!("stopping: {error}"));
                    break;
                }
                Err(error) => {
                    // fatal for this call: keep the best iterate, report
                    // NOT_OPTIMAL
                    statistics.notice(&format!("stopping: {error}"));
                    break;
                }
            }

            iterate_status = constraint_relaxation_strategy.check_termination(&mut current_iterate);
            constraint_relaxation_strategy.set_statistics(&mut statistics, &current_iterate);
            statistics.print_current_line();
        }

        if iterate_status != IterateStatus::NotOptimal {
            optimization_status = OptimizationStatus::from_iterate_status(iterate_status);
        }
        statistics.print_summary(&format!(
            "status: {optimization_status} after {iteration} iterations"
        ));

        current_iterate.evaluate_objective(solver_model);
        let number_original_variables = model.number_variables();
        let mut multipliers = Multipliers::new(number_original_variables, model.number_constraints());
        multipliers
            .constraints
            .copy_from_slice(&current_iterate.multipliers.constraints[..model.number_constraints()]);
        multipliers
            .lower_bounds
            .copy_from_slice(&current_iterate.multipliers.lower_bounds[..number_original_variables]);
        multipliers
            .upper_bounds
            .copy_from_slice(&current_iterate.multipliers.upper_bounds[..number_original_variables]);

        Ok(OptimizationResult {
            status: optimization_status,
            iterate_status,
            primals: current_iterate.primals[..number_original_variables].to_vec(),
            objective: current_iterate.evaluations.objective,
            multipliers,
            objective_multiplier: current_iterate.objective_multiplier,
            primal_feasibility: current_iterate.primal_feasibility,
            stationarity: current_iterate.residuals.stationarity,
            complementarity: current_iterate.residuals.complementarity,
            iteration_count: iteration,
            solve_time: start_time.elapsed().as_secs_f64(),
        })
    }
}

fn validate_problem<T: FloatT>(model: &dyn Model<T>) -> Result<(), OptimizationError> {
    for i in 0..model.number_variables() {
        if model.variable_lower_bound(i) > model.variable_upper_bound(i) {
            return Err(OptimizationError::InvalidProblem(format!(
                "variable {i} has inconsistent bounds"
            )));
        }
    }
    for j in 0..model.number_constraints() {
        if model.constraint_lower_bound(j) > model.constraint_upper_bound(j) {
            return Err(OptimizationError::InvalidProblem(format!(
                "constraint {j} has inconsistent bounds"
            )));
        }
    }
    Ok(())
}
