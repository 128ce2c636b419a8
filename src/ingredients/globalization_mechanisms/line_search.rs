use super::{assemble_trial_iterate, GlobalizationMechanism};
use crate::algebra::FloatT;
use crate::callbacks::UserCallbacks;
use crate::ingredients::constraint_relaxation::ConstraintRelaxationStrategy;
use crate::optimization::{
    Direction, Iterate, OptimizationError, SubproblemStatus, WarmstartInformation,
};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// Backtracking line search: the direction is computed once per outer
/// iteration; the primal step length shrinks geometrically on rejection.
pub struct BacktrackingLineSearch<T> {
    backtracking_ratio: T,
    minimum_step_length: T,
    warmstart_information: WarmstartInformation,
}

impl<T: FloatT> BacktrackingLineSearch<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            backtracking_ratio: settings.ls_backtracking_ratio,
            minimum_step_length: settings.ls_min_step_length,
            warmstart_information: WarmstartInformation::whole_problem_changed(),
        }
    }
}

impl<T: FloatT> GlobalizationMechanism<T> for BacktrackingLineSearch<T> {
    fn initialize_statistics(&self, statistics: &mut Statistics) {
        statistics.add_column("step length", Statistics::DOUBLE_WIDTH, 30);
    }

    fn compute_acceptable_iterate(
        &mut self,
        statistics: &mut Statistics,
        constraint_relaxation_strategy: &mut dyn ConstraintRelaxationStrategy<T>,
        current_iterate: &mut Iterate<T>,
        user_callbacks: &mut dyn UserCallbacks<T>,
    ) -> Result<Iterate<T>, OptimizationError> {
        let mut direction = Direction::new(
            constraint_relaxation_strategy.maximum_number_variables(),
            constraint_relaxation_strategy.number_constraints(),
        );
        self.warmstart_information.set_whole_problem_changed();
        constraint_relaxation_strategy.compute_feasible_direction(
            statistics,
            current_iterate,
            &mut direction,
            T::infinity(),
            &mut self.warmstart_information,
        )?;
        if direction.status == SubproblemStatus::UnboundedProblem {
            return Err(OptimizationError::UnboundedSubproblem);
        }
        if direction.status != SubproblemStatus::Optimal {
            return Err(OptimizationError::SubproblemSolver(
                "the subproblem solver did not return a direction".to_string(),
            ));
        }

        // primal step length starts from the fraction-to-boundary length;
        // the bound duals take their full fraction-to-boundary step
        let mut step_length = direction.primal_dual_step_length;
        let bound_dual_step_length = direction.bound_dual_step_length;

        loop {
            statistics.set_float("step length", step_length);
            let mut trial_iterate = assemble_trial_iterate(
                current_iterate,
                &direction,
                step_length,
                step_length,
                bound_dual_step_length,
                constraint_relaxation_strategy.solving_feasibility_problem(),
            );

            let accepted = constraint_relaxation_strategy.is_iterate_acceptable(
                statistics,
                current_iterate,
                &mut trial_iterate,
                &direction,
                step_length,
                user_callbacks,
            )?;
            if accepted {
                statistics.set_float("step norm", step_length * direction.norm);
                return Ok(trial_iterate);
            }

            step_length *= self.backtracking_ratio;
            if step_length < self.minimum_step_length {
                return Err(OptimizationError::StepLengthBelowMinimum);
            }
        }
    }
}
