use super::{assemble_trial_iterate, GlobalizationMechanism};
use crate::algebra::{AsFloatT, FloatT};
use crate::callbacks::UserCallbacks;
use crate::ingredients::constraint_relaxation::ConstraintRelaxationStrategy;
use crate::optimization::{
    Direction, Iterate, OptimizationError, SubproblemStatus, WarmstartInformation,
};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// Trust-region mechanism: full steps within a radius that contracts on
/// rejection (forcing a re-solve, since the displacement bounds changed) and
/// expands after strongly successful steps.
pub struct TrustRegion<T> {
    radius: T,
    increase_factor: T,
    decrease_factor: T,
    minimum_radius: T,
    maximum_radius: T,
    expansion_ratio_threshold: T,
    warmstart_information: WarmstartInformation,
}

impl<T: FloatT> TrustRegion<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            radius: settings.tr_radius,
            increase_factor: settings.tr_increase_factor,
            decrease_factor: settings.tr_decrease_factor,
            minimum_radius: settings.tr_min_radius,
            maximum_radius: settings.tr_max_radius,
            expansion_ratio_threshold: settings.tr_expansion_ratio_threshold,
            warmstart_information: WarmstartInformation::whole_problem_changed(),
        }
    }
}

impl<T: FloatT> GlobalizationMechanism<T> for TrustRegion<T> {
    fn initialize_statistics(&self, statistics: &mut Statistics) {
        statistics.add_column("radius", Statistics::DOUBLE_WIDTH, 30);
    }

    fn compute_acceptable_iterate(
        &mut self,
        statistics: &mut Statistics,
        constraint_relaxation_strategy: &mut dyn ConstraintRelaxationStrategy<T>,
        current_iterate: &mut Iterate<T>,
        user_callbacks: &mut dyn UserCallbacks<T>,
    ) -> Result<Iterate<T>, OptimizationError> {
        let half: T = (0.5).as_T();
        let mut direction = Direction::new(
            constraint_relaxation_strategy.maximum_number_variables(),
            constraint_relaxation_strategy.number_constraints(),
        );
        self.warmstart_information.set_whole_problem_changed();

        loop {
            statistics.set_float("radius", self.radius);
            constraint_relaxation_strategy.compute_feasible_direction(
                statistics,
                current_iterate,
                &mut direction,
                self.radius,
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

            // full primal and dual step within the region
            let mut trial_iterate = assemble_trial_iterate(
                current_iterate,
                &direction,
                T::one(),
                T::one(),
                T::one(),
                constraint_relaxation_strategy.solving_feasibility_problem(),
            );

            let accepted = constraint_relaxation_strategy.is_iterate_acceptable(
                statistics,
                current_iterate,
                &mut trial_iterate,
                &direction,
                T::one(),
                user_callbacks,
            )?;
            if accepted {
                statistics.set_float("step norm", direction.norm);
                // grow the region after a strongly successful step
                let actual_reduction = current_iterate.progress.objective.value(
                    current_iterate.objective_multiplier,
                ) + current_iterate.progress.infeasibility
                    - trial_iterate
                        .progress
                        .objective
                        .value(trial_iterate.objective_multiplier)
                    - trial_iterate.progress.infeasibility;
                let predicted = direction.subproblem_objective;
                let strongly_successful = predicted < T::zero()
                    && actual_reduction >= self.expansion_ratio_threshold * (-predicted);
                if strongly_successful {
                    self.radius = T::min(
                        self.maximum_radius,
                        T::max(self.radius, self.increase_factor * direction.norm),
                    );
                } else {
                    self.radius = T::min(self.maximum_radius, T::max(self.radius, direction.norm));
                }
                return Ok(trial_iterate);
            }

            // shrink towards the rejected step and re-solve
            self.radius = T::min(
                self.radius / self.decrease_factor,
                half * direction.norm,
            );
            if self.radius < self.minimum_radius {
                return Err(OptimizationError::TrustRegionBelowMinimum);
            }
            self.warmstart_information = WarmstartInformation::only_variable_bounds_changed();
        }
    }
}
