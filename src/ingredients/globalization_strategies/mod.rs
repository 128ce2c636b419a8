//! Globalization strategies: decide whether a trial iterate is acceptable
//! given the current and trial progress measures and a predicted reduction.

mod filter;
mod funnel;
mod l1_merit;

pub use filter::{Filter, FilterEntry, FletcherFilterStrategy, WaechterFilterStrategy};
pub use funnel::FunnelStrategy;
pub use l1_merit::L1MeritStrategy;

use crate::algebra::{roundoff_protected, FloatT};
use crate::optimization::{Iterate, OptimizationError, ProgressMeasures};
use crate::settings::Settings;
use crate::statistics::Statistics;

pub trait GlobalizationStrategy<T: FloatT> {
    fn initialize(&mut self, statistics: &mut Statistics, initial_iterate: &Iterate<T>);

    /// Forget accumulated history (filter entries, funnel width); called
    /// whenever the subproblem is redefined.
    fn reset(&mut self);

    /// Re-anchor the strategy on the current progress after a reset.
    fn register_current_progress(&mut self, current_progress: &ProgressMeasures<T>);

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
        predicted_reduction: &ProgressMeasures<T>,
        objective_multiplier: T,
    ) -> bool;

    /// Used by the restoration driver to decide when to switch back to the
    /// optimality problem.
    fn is_infeasibility_sufficiently_reduced(
        &self,
        current_progress: &ProgressMeasures<T>,
        trial_progress: &ProgressMeasures<T>,
    ) -> bool;

    /// Waechter-style restoration trigger; other strategies never request it.
    fn restoration_recommended(&self) -> bool {
        false
    }
}

/// Shared Armijo test with optional roundoff compensation.
pub(crate) struct ArmijoCondition<T> {
    pub decrease_fraction: T,
    pub protect_against_roundoff: bool,
}

impl<T: FloatT> ArmijoCondition<T> {
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            decrease_fraction: settings.armijo_decrease_fraction,
            protect_against_roundoff: settings.protect_actual_reduction_against_roundoff,
        }
    }

    pub fn sufficient_decrease(&self, predicted_reduction: T, actual_reduction: T, reference: T) -> bool {
        let actual = if self.protect_against_roundoff {
            roundoff_protected(actual_reduction, reference)
        } else {
            actual_reduction
        };
        actual >= self.decrease_fraction * predicted_reduction
    }
}

/// Unconstrained merit of filter-type strategies: objective at σ = 1 plus
/// the auxiliary measure, infeasibility ignored.
pub(crate) fn unconstrained_merit<T: FloatT>(progress: &ProgressMeasures<T>) -> T {
    progress.objective.value(T::one()) + progress.auxiliary
}

/// f-type/h-type switching condition `Δφ_pred ≥ δ·h^{s_φ}`.
pub(crate) fn switching_condition<T: FloatT>(
    predicted_reduction: T,
    current_infeasibility: T,
    delta: T,
    exponent: T,
) -> bool {
    predicted_reduction > delta * current_infeasibility.powf(exponent)
}

/// Instantiate a globalization strategy from the settings.
pub fn create_globalization_strategy<T: FloatT>(
    settings: &Settings<T>,
) -> Result<Box<dyn GlobalizationStrategy<T>>, OptimizationError> {
    match settings.globalization_strategy.as_str() {
        "fletcher_filter" => Ok(Box::new(FletcherFilterStrategy::new(settings))),
        "waechter_filter" => Ok(Box::new(WaechterFilterStrategy::new(settings))),
        "funnel" => Ok(Box::new(FunnelStrategy::new(settings))),
        "l1_merit" => Ok(Box::new(L1MeritStrategy::new(settings))),
        name => Err(OptimizationError::InvalidConfiguration(format!(
            "unknown globalization strategy: {name}"
        ))),
    }
}
