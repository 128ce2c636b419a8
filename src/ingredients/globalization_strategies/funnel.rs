use super::{
    switching_condition, unconstrained_merit, ArmijoCondition, GlobalizationStrategy,
};
use crate::algebra::FloatT;
use crate::optimization::{Iterate, ProgressMeasures};
use crate::settings::Settings;
use crate::statistics::Statistics;

/// Funnel strategy: a single upper bound τ on infeasibility replaces the
/// filter store.  Trials must stay within κ·τ; h-type acceptances shrink
/// the funnel.
pub struct FunnelStrategy<T: FloatT> {
    width: T,
    initial_width: T,
    kappa: T,
    gamma: T,
    delta: T,
    switching_exponent: T,
    upper_bound_factor: T,
    initial_upper_bound: T,
    armijo: ArmijoCondition<T>,
}

impl<T: FloatT> FunnelStrategy<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            width: settings.filter_ubd,
            initial_width: settings.filter_ubd,
            kappa: settings.funnel_kappa,
            gamma: settings.funnel_gamma,
            delta: settings.filter_delta,
            switching_exponent: settings.filter_switching_exponent,
            upper_bound_factor: settings.filter_fact,
            initial_upper_bound: settings.filter_ubd,
            armijo: ArmijoCondition::new(settings),
        }
    }

    fn set_initial_width(&mut self, infeasibility: T) {
        self.width = T::max(
            self.initial_upper_bound,
            self.upper_bound_factor * infeasibility,
        );
        self.initial_width = self.width;
    }

    /// τ ← max((1−γ)·τ, h' + γ·(τ − h'))
    fn shrink(&mut self, trial_infeasibility: T) {
        let contracted = (T::one() - self.gamma) * self.width;
        let interpolated =
            trial_infeasibility + self.gamma * (self.width - trial_infeasibility);
        self.width = T::max(contracted, interpolated);
    }
}

impl<T: FloatT> GlobalizationStrategy<T> for FunnelStrategy<T> {
    fn initialize(&mut self, statistics: &mut Statistics, initial_iterate: &Iterate<T>) {
        statistics.add_column("funnel width", Statistics::DOUBLE_WIDTH, 70);
        self.set_initial_width(initial_iterate.progress.infeasibility);
    }

    fn reset(&mut self) {
        self.width = self.initial_width;
    }

    fn register_current_progress(&mut self, current_progress: &ProgressMeasures<T>) {
        self.set_initial_width(current_progress.infeasibility);
    }

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
        predicted_reduction: &ProgressMeasures<T>,
        objective_multiplier: T,
    ) -> bool {
        statistics.set_float("funnel width", self.width);

        // feasibility problem: Armijo on the infeasibility objective
        if objective_multiplier == T::zero() {
            let actual_reduction = current_progress.objective.value(T::zero())
                - trial_progress.objective.value(T::zero());
            let accept = self.armijo.sufficient_decrease(
                predicted_reduction.objective.value(T::zero()),
                actual_reduction,
                current_progress.objective.value(T::zero()),
            );
            statistics.set_string(
                "status",
                if accept {
                    "accepted (h-type Armijo)"
                } else {
                    "rejected (h-type Armijo)"
                },
            );
            return accept;
        }

        if trial_progress.infeasibility > self.kappa * self.width {
            statistics.set_string("status", "rejected (funnel bound)");
            return false;
        }

        let current_merit = unconstrained_merit(current_progress);
        let trial_merit = unconstrained_merit(trial_progress);
        let merit_predicted_reduction =
            predicted_reduction.objective.value(T::one()) + predicted_reduction.auxiliary;

        let (accept, scenario) = if switching_condition(
            merit_predicted_reduction,
            current_progress.infeasibility,
            self.delta,
            self.switching_exponent,
        ) && self.armijo.sufficient_decrease(
            merit_predicted_reduction,
            current_merit - trial_merit,
            current_merit,
        ) {
            (true, "f-type Armijo")
        } else if trial_progress.infeasibility
            <= (T::one() - self.gamma) * current_progress.infeasibility
        {
            // h-type: the funnel contracts
            self.shrink(trial_progress.infeasibility);
            (true, "h-type")
        } else {
            (false, "insufficient progress")
        };

        statistics.set_string(
            "status",
            &format!("{} ({scenario})", if accept { "accepted" } else { "rejected" }),
        );
        accept
    }

    fn is_infeasibility_sufficiently_reduced(
        &self,
        _current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
    ) -> bool {
        trial_progress.infeasibility <= self.kappa * self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsBuilder;

    #[test]
    fn test_funnel_shrinks_on_h_type_acceptance() {
        let settings = SettingsBuilder::<f64>::default()
            .funnel_gamma(0.1)
            .build()
            .unwrap();
        let mut funnel = FunnelStrategy::new(&settings);
        funnel.width = 1.0;
        funnel.shrink(0.2);
        // max(0.9, 0.2 + 0.1*0.8) = 0.9
        assert!((funnel.width - 0.9).abs() < 1e-15);

        funnel.width = 1.0;
        funnel.shrink(0.95);
        // max(0.9, 0.95 + 0.1*0.05) = 0.955
        assert!((funnel.width - 0.955).abs() < 1e-15);
    }
}
