use super::{ArmijoCondition, GlobalizationStrategy};
use crate::algebra::FloatT;
use crate::optimization::{Iterate, ProgressMeasures};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// ℓ₁ merit function `M(x; σ) = σ·f(x) + aux(x) + h(x)`.
///
/// Acceptance is a plain Armijo test on the merit.  A non-positive predicted
/// reduction only emits a warning: penalty management belongs to the
/// constraint-relaxation strategy.
pub struct L1MeritStrategy<T: FloatT> {
    armijo: ArmijoCondition<T>,
    smallest_known_infeasibility: T,
}

impl<T: FloatT> L1MeritStrategy<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            armijo: ArmijoCondition::new(settings),
            smallest_known_infeasibility: T::infinity(),
        }
    }

    fn merit_value(progress: &ProgressMeasures<T>, objective_multiplier: T) -> T {
        progress.objective.value(objective_multiplier) + progress.auxiliary + progress.infeasibility
    }
}

impl<T: FloatT> GlobalizationStrategy<T> for L1MeritStrategy<T> {
    fn initialize(&mut self, statistics: &mut Statistics, initial_iterate: &Iterate<T>) {
        statistics.add_column("penalty param.", Statistics::DOUBLE_WIDTH, 70);
        self.smallest_known_infeasibility = initial_iterate.progress.infeasibility;
    }

    fn reset(&mut self) {}

    fn register_current_progress(&mut self, _current_progress: &ProgressMeasures<T>) {}

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
        predicted_reduction: &ProgressMeasures<T>,
        objective_multiplier: T,
    ) -> bool {
        statistics.set_float("penalty param.", objective_multiplier);

        // all three predicted contributions; should be positive for a
        // descent direction of the merit function
        let constrained_predicted_reduction = predicted_reduction
            .objective
            .value(objective_multiplier)
            + predicted_reduction.auxiliary
            + predicted_reduction.infeasibility;
        if constrained_predicted_reduction <= T::zero() {
            statistics.notice(
                "the direction is not a descent direction for the merit function; \
                 the penalty parameter should decrease",
            );
        }

        let current_merit = Self::merit_value(current_progress, objective_multiplier);
        let trial_merit = Self::merit_value(trial_progress, objective_multiplier);
        let actual_reduction = current_merit - trial_merit;

        let accept = self.armijo.sufficient_decrease(
            constrained_predicted_reduction,
            actual_reduction,
            current_merit,
        );
        if accept {
            self.smallest_known_infeasibility = T::min(
                self.smallest_known_infeasibility,
                trial_progress.infeasibility,
            );
            statistics.set_string("status", "accepted (Armijo)");
        } else {
            statistics.set_string("status", "rejected (Armijo)");
        }
        accept
    }

    fn is_infeasibility_sufficiently_reduced(
        &self,
        _current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
    ) -> bool {
        trial_progress.infeasibility < self.smallest_known_infeasibility
    }
}
